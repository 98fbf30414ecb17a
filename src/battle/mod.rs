//! Battle step sequencing for Axis & Allies style combat
//!
//! A battle round is a list of named steps: AA fire, bombardment, first
//! strike and general fire (each split into fire, select and notify),
//! casualty removal, submerging and retreats. `steps` builds that list from a
//! read-only `BattleState`; `executor` runs it.
//!
//! Key rules:
//! - Killed units keep firing until the next removal step
//! - Evaders (subs) may submerge or withdraw instead of fighting
//! - First strike units may sneak attack and deny return fire
//! - Under restricted casualties transports are chosen last

pub mod battle_end;
pub mod casualties;
pub mod executor;
pub mod firing_group;
pub mod first_strike;
pub mod retreat;
pub mod snapshot;
pub mod splitter;
pub mod state;
pub mod steps;
pub mod strings;
pub mod unit;

// Re-exports for convenient access
pub use battle_end::{check_general_battle_end, BattleStatus, WhoWon};
pub use casualties::{select_main_battle_casualties, CasualtyDetails, SelectCasualtiesContext};
pub use executor::{
    run_battle, run_round, AutoBattleActions, BattleActions, DiceRoller, RandomDiceRoller,
    StepEvent, StepEventLog, StepExecutor,
};
pub use firing_group::{group_by_suicide_on_hit, FiringGroup};
pub use first_strike::{defensive_order, offensive_order, FirstStrikeOrder};
pub use retreat::{AttackerWithdraw, SubsRetreat};
pub use snapshot::{BattleSnapshot, TerritorySpec, UnitSpec};
pub use splitter::{split_aa, split_bombardment, FiringGroupSplitter, FiringKind};
pub use state::{BattleState, BattleStateBuilder, GamePlayer, TechAdvances, Territory, UnitFilter};
pub use steps::{BattleStep, BattleSteps, FirePhase, FireStage, StepDetails};
pub use unit::{Unit, UnitAttachment, UnitType};
