//! Game rule options and battle runner defaults
//!
//! Map makers toggle the combat rules through named boolean options. The
//! sequencer only ever reads them, so they are collected in one serde struct
//! that can be loaded from the `[options]` table of a TOML file.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};

/// Named boolean rule switches read by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOption {
    SubmersibleSubs,
    Ww2V2,
    TransportCasualtiesRestricted,
    PartialAmphibiousRetreat,
    DefendingSubsSneakAttack,
    SubRetreatBeforeBattle,
    AttackerRetreatPlanes,
    AlliedAirIndependent,
    SubmarinesDefendingMaySubmergeOrRetreat,
    DefendingSuicideAndMunitionUnitsDoNotFire,
    EditMode,
}

impl GameOption {
    pub const ALL: [GameOption; 11] = [
        GameOption::SubmersibleSubs,
        GameOption::Ww2V2,
        GameOption::TransportCasualtiesRestricted,
        GameOption::PartialAmphibiousRetreat,
        GameOption::DefendingSubsSneakAttack,
        GameOption::SubRetreatBeforeBattle,
        GameOption::AttackerRetreatPlanes,
        GameOption::AlliedAirIndependent,
        GameOption::SubmarinesDefendingMaySubmergeOrRetreat,
        GameOption::DefendingSuicideAndMunitionUnitsDoNotFire,
        GameOption::EditMode,
    ];

    /// Property name used by game files
    pub fn name(self) -> &'static str {
        match self {
            GameOption::SubmersibleSubs => "Submersible Subs",
            GameOption::Ww2V2 => "WW2V2",
            GameOption::TransportCasualtiesRestricted => "Transport Casualties Restricted",
            GameOption::PartialAmphibiousRetreat => "Partial Amphibious Retreat",
            GameOption::DefendingSubsSneakAttack => "Defending Subs Sneak Attack",
            GameOption::SubRetreatBeforeBattle => "Sub Retreat Before Battle",
            GameOption::AttackerRetreatPlanes => "Attacker Retreat Planes",
            GameOption::AlliedAirIndependent => "Allied Air Independent",
            GameOption::SubmarinesDefendingMaySubmergeOrRetreat => {
                "Submarines Defending May Submerge Or Retreat"
            }
            GameOption::DefendingSuicideAndMunitionUnitsDoNotFire => {
                "Defending Suicide and Munition Units Do Not Fire"
            }
            GameOption::EditMode => "Edit Mode",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.name().eq_ignore_ascii_case(name))
    }
}

/// Rule options for one battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Evading units submerge in place instead of withdrawing to a territory
    pub submersible_subs: bool,

    /// Revised rules: first strike units always fire in their own phase
    pub ww2v2: bool,

    /// Transports may only be taken as casualties once every other unit is gone
    pub transport_casualties_restricted: bool,

    /// Attackers that did not land amphibiously may still retreat
    pub partial_amphibious_retreat: bool,

    /// Defending first strike units get a sneak attack too
    pub defending_subs_sneak_attack: bool,

    /// Evaders decide to submerge or withdraw before any dice are rolled
    pub sub_retreat_before_battle: bool,

    /// Attacking air may retreat out of an amphibious assault
    pub attacker_retreat_planes: bool,

    /// Allied air on offense fires alongside the attacker's own units
    pub allied_air_independent: bool,

    /// Defending evaders may submerge even without submersible subs
    pub submarines_defending_may_submerge_or_retreat: bool,

    /// Defending suicide units (munitions) sit out the defensive fire
    pub defending_suicide_and_munition_units_do_not_fire: bool,

    /// Edit mode lifts the restricted transport casualty rule
    pub edit_mode: bool,

    /// Dice sides used for every roll
    ///
    /// Classic maps use a d6. Powers above this value always hit.
    pub dice_sides: u32,

    /// Round limit for land battles (0 = fight until one side is gone)
    pub land_battle_rounds: u32,

    /// Round limit for sea battles (0 = fight until one side is gone)
    pub sea_battle_rounds: u32,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            submersible_subs: false,
            ww2v2: false,
            transport_casualties_restricted: false,
            partial_amphibious_retreat: false,
            defending_subs_sneak_attack: false,
            sub_retreat_before_battle: false,
            attacker_retreat_planes: false,
            allied_air_independent: true,
            submarines_defending_may_submerge_or_retreat: false,
            defending_suicide_and_munition_units_do_not_fire: false,
            edit_mode: false,
            dice_sides: config().dice_sides,
            land_battle_rounds: 0,
            sea_battle_rounds: 0,
        }
    }
}

impl GameOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an option by its named constant
    pub fn get(&self, option: GameOption) -> bool {
        match option {
            GameOption::SubmersibleSubs => self.submersible_subs,
            GameOption::Ww2V2 => self.ww2v2,
            GameOption::TransportCasualtiesRestricted => self.transport_casualties_restricted,
            GameOption::PartialAmphibiousRetreat => self.partial_amphibious_retreat,
            GameOption::DefendingSubsSneakAttack => self.defending_subs_sneak_attack,
            GameOption::SubRetreatBeforeBattle => self.sub_retreat_before_battle,
            GameOption::AttackerRetreatPlanes => self.attacker_retreat_planes,
            GameOption::AlliedAirIndependent => self.allied_air_independent,
            GameOption::SubmarinesDefendingMaySubmergeOrRetreat => {
                self.submarines_defending_may_submerge_or_retreat
            }
            GameOption::DefendingSuicideAndMunitionUnitsDoNotFire => {
                self.defending_suicide_and_munition_units_do_not_fire
            }
            GameOption::EditMode => self.edit_mode,
        }
    }

    pub fn set(&mut self, option: GameOption, value: bool) {
        let slot = match option {
            GameOption::SubmersibleSubs => &mut self.submersible_subs,
            GameOption::Ww2V2 => &mut self.ww2v2,
            GameOption::TransportCasualtiesRestricted => &mut self.transport_casualties_restricted,
            GameOption::PartialAmphibiousRetreat => &mut self.partial_amphibious_retreat,
            GameOption::DefendingSubsSneakAttack => &mut self.defending_subs_sneak_attack,
            GameOption::SubRetreatBeforeBattle => &mut self.sub_retreat_before_battle,
            GameOption::AttackerRetreatPlanes => &mut self.attacker_retreat_planes,
            GameOption::AlliedAirIndependent => &mut self.allied_air_independent,
            GameOption::SubmarinesDefendingMaySubmergeOrRetreat => {
                &mut self.submarines_defending_may_submerge_or_retreat
            }
            GameOption::DefendingSuicideAndMunitionUnitsDoNotFire => {
                &mut self.defending_suicide_and_munition_units_do_not_fire
            }
            GameOption::EditMode => &mut self.edit_mode,
        };
        *slot = value;
    }

    /// Builder-style toggle, handy when assembling battles in code
    pub fn with(mut self, option: GameOption, value: bool) -> Self {
        self.set(option, value);
        self
    }

    /// Defender first strike units may sneak attack under either rule
    pub fn defending_sneak_attack_allowed(&self) -> bool {
        self.ww2v2 || self.defending_subs_sneak_attack
    }

    /// Evaders on defense may submerge
    pub fn defending_may_submerge(&self) -> bool {
        self.submersible_subs || self.submarines_defending_may_submerge_or_retreat
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.dice_sides == 0 {
            return Err("dice_sides must be at least 1".into());
        }
        if self.dice_sides > config().max_dice_sides {
            return Err(format!(
                "dice_sides ({}) should be <= {}",
                self.dice_sides,
                config().max_dice_sides
            ));
        }
        Ok(())
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: GameOptions = toml::from_str(content)?;
        options.validate().map_err(BattleError::InvalidOption)?;
        Ok(options)
    }

    /// Load options from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Defaults for running battles outside a full game
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Dice sides when a battle file does not say otherwise
    pub dice_sides: u32,

    /// Largest die accepted by option validation
    ///
    /// Maps with a d12 or d20 exist; anything above 120 is a typo.
    pub max_dice_sides: u32,

    /// Safety cap on rounds when neither side can be eliminated
    ///
    /// Battles with a round limit of 0 still stop here so a stalemate
    /// that the end check misses cannot spin forever.
    pub max_unbounded_rounds: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dice_sides: 6,
            max_dice_sides: 120,
            max_unbounded_rounds: 100,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.dice_sides == 0 || self.dice_sides > self.max_dice_sides {
            return Err(format!(
                "dice_sides ({}) should be between 1 and {}",
                self.dice_sides, self.max_dice_sides
            ));
        }
        if self.max_unbounded_rounds == 0 {
            return Err("max_unbounded_rounds must be positive".into());
        }
        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

static CONFIG: OnceLock<RunnerConfig> = OnceLock::new();

pub fn config() -> &'static RunnerConfig {
    CONFIG.get_or_init(RunnerConfig::default)
}

pub fn set_config(config: RunnerConfig) -> std::result::Result<(), RunnerConfig> {
    CONFIG.set(config)
}
