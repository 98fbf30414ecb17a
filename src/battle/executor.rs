//! Step execution
//!
//! Runs the commands produced by the sequencer against a mutable
//! `BattleState`. Player decisions (casualty choice, submerge, retreat) go
//! through `BattleActions`; dice go through `DiceRoller` so tests can script
//! them.

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::battle::battle_end::{check_general_battle_end, BattleStatus, WhoWon};
use crate::battle::casualties::{
    select_main_battle_casualties, CasualtyDetails, SelectCasualtiesContext,
};
use crate::battle::firing_group::FiringGroup;
use crate::battle::retreat::{
    execute_defensive_subs_retreat, execute_offensive_general_retreat,
    execute_offensive_subs_retreat,
};
use crate::battle::state::BattleState;
use crate::battle::steps::{
    attacker_air_transports, evaders_safe_from_air, BattleStep, BattleSteps, FirePhase,
    FireStage, StepDetails,
};
use crate::battle::unit::Unit;
use crate::core::config::config;
use crate::core::error::{BattleError, Result};
use crate::core::types::{Round, Side, UnitId};

/// Source of dice rolls
pub trait DiceRoller {
    /// Roll `count` dice, each landing on `1..=sides`
    fn roll(&mut self, count: u32, sides: u32) -> Vec<u32>;
}

/// Seeded dice; the same seed replays the same battle
#[derive(Debug, Clone)]
pub struct RandomDiceRoller {
    rng: ChaCha8Rng,
}

impl RandomDiceRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DiceRoller for RandomDiceRoller {
    fn roll(&mut self, count: u32, sides: u32) -> Vec<u32> {
        let sides = sides.max(1);
        (0..count).map(|_| self.rng.gen_range(1..=sides)).collect()
    }
}

/// Decisions a player (or AI) makes during a battle
pub trait BattleActions {
    /// Choose casualties among `candidates` for `hits` hits
    fn select_casualties(
        &mut self,
        ctx: &SelectCasualtiesContext<'_>,
        candidates: &[Unit],
        hits: u32,
    ) -> CasualtyDetails;

    fn query_submerge(&mut self, state: &BattleState, side: Side, message: &str) -> bool;

    /// Pick a destination by name, or `None` to stay
    fn query_retreat_territory(
        &mut self,
        state: &BattleState,
        side: Side,
        candidates: &[String],
        message: &str,
    ) -> Option<String>;

    fn notify_casualties(&mut self, _hit_side: Side, _details: &CasualtyDetails) {}

    fn battle_ended(&mut self, _state: &BattleState, _who_won: WhoWon) {}
}

/// Headless policy: soak hits with spare hit points, then lose the weakest units
#[derive(Debug, Clone, Default)]
pub struct AutoBattleActions {
    pub submerge: bool,
    pub retreat: bool,
}

impl BattleActions for AutoBattleActions {
    fn select_casualties(
        &mut self,
        ctx: &SelectCasualtiesContext<'_>,
        candidates: &[Unit],
        hits: u32,
    ) -> CasualtyDetails {
        let side = ctx.hit_side();
        let mut order: Vec<&Unit> = candidates.iter().collect();
        order.sort_by_key(|unit| (unit.power(side), unit.rolls(side)));

        let mut remaining = hits;
        let mut damaged = Vec::new();
        for unit in &order {
            let spare = unit.remaining_hit_points().saturating_sub(1).min(remaining);
            damaged.extend((0..spare).map(|_| (*unit).clone()));
            remaining -= spare;
        }
        // Every spare hit point is used up, so a killed unit takes its damage with it
        let killed: Vec<Unit> = order
            .into_iter()
            .take(remaining as usize)
            .cloned()
            .collect();
        damaged.retain(|unit| !killed.contains(unit));
        CasualtyDetails::new(killed, damaged, false)
    }

    fn query_submerge(&mut self, _state: &BattleState, _side: Side, _message: &str) -> bool {
        self.submerge
    }

    fn query_retreat_territory(
        &mut self,
        _state: &BattleState,
        _side: Side,
        candidates: &[String],
        _message: &str,
    ) -> Option<String> {
        if self.retreat {
            candidates.first().cloned()
        } else {
            None
        }
    }
}

/// Log entry for one executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub round: Round,
    pub step: String,
    pub description: String,
}

/// Everything that happened while running a battle
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepEventLog {
    pub events: Vec<StepEvent>,
}

impl StepEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: Round, step: &str, description: String) {
        self.events.push(StepEvent {
            round,
            step: step.to_string(),
            description,
        });
    }
}

/// A fire step waiting for its select and notify steps
#[derive(Debug, Clone)]
struct PendingFire {
    group: FiringGroup,
    hits: u32,
    casualties: Option<CasualtyDetails>,
}

type FireKey = (Side, FirePhase, String);

pub struct StepExecutor<R: DiceRoller, A: BattleActions> {
    roller: R,
    actions: A,
    pending: AHashMap<FireKey, PendingFire>,
    pub log: StepEventLog,
}

impl<R: DiceRoller, A: BattleActions> StepExecutor<R, A> {
    pub fn new(roller: R, actions: A) -> Self {
        Self {
            roller,
            actions,
            pending: AHashMap::new(),
            log: StepEventLog::new(),
        }
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn into_parts(self) -> (R, A, StepEventLog) {
        (self.roller, self.actions, self.log)
    }

    /// Run one step. Steps of an ended battle are skipped.
    pub fn execute(&mut self, state: &mut BattleState, details: &StepDetails) -> Result<()> {
        if state.over {
            debug!(step = %details.name, "battle over, step skipped");
            return Ok(());
        }
        let description = match &details.step {
            BattleStep::Fire {
                side,
                phase,
                group,
                stage,
            } => {
                let key = (*side, *phase, group.clone());
                match stage {
                    FireStage::Fire => self.fire(state, key)?,
                    FireStage::SelectCasualties => self.select(state, &key, &details.name)?,
                    FireStage::NotifyCasualties => self.notify(state, &key, &details.name)?,
                }
            }
            BattleStep::RemoveBombardmentCasualties
            | BattleStep::RemoveSneakAttackCasualties => {
                let removed = state.remove_casualties();
                format!("{} units removed", removed.len())
            }
            BattleStep::RemoveCasualties => {
                let removed = state.remove_casualties();
                self.pending.clear();
                match check_general_battle_end(state) {
                    BattleStatus::Ended(who_won) => {
                        state.end_battle(who_won);
                        info!(round = state.round, winner = who_won.label(), "battle ended");
                        self.actions.battle_ended(state, who_won);
                        format!("{} units removed, {} wins", removed.len(), who_won.label())
                    }
                    BattleStatus::Continue => format!("{} units removed", removed.len()),
                }
            }
            BattleStep::LandParatroopers => {
                let transports = attacker_air_transports(state);
                let landed = state.land_paratroopers(&transports);
                format!("{} paratroopers landed", landed)
            }
            BattleStep::RemoveUnescortedTransports => {
                let removed = remove_unescorted_transports(state);
                format!("{} unescorted transports lost", removed)
            }
            BattleStep::SubmergeSubsVsAirOnly => {
                let mut count = 0;
                for side in [Side::Offense, Side::Defense] {
                    let ids = evaders_safe_from_air(state, side);
                    count += ids.len();
                    state.submerge_units(side, &ids);
                }
                format!("{} units submerged", count)
            }
            BattleStep::SubsRetreat { side, .. } => {
                let moved = match side {
                    Side::Offense => execute_offensive_subs_retreat(state, &mut self.actions),
                    Side::Defense => execute_defensive_subs_retreat(state, &mut self.actions),
                };
                retreat_description(moved)
            }
            BattleStep::AttackerWithdraw => {
                retreat_description(execute_offensive_general_retreat(state, &mut self.actions))
            }
        };

        debug!(step = %details.name, %description, "step executed");
        self.log.push(state.round, &details.name, description);
        Ok(())
    }

    fn fire(&mut self, state: &BattleState, key: FireKey) -> Result<String> {
        let (side, phase, name) = &key;
        let Some(group) = phase
            .groups(state, *side)
            .into_iter()
            .find(|group| group.display_name == *name)
        else {
            // Every unit of the group died or left since the step list was built
            warn!(group = %name, side = side.label(), "firing group no longer present");
            self.pending.insert(
                key.clone(),
                PendingFire {
                    group: FiringGroup {
                        display_name: name.clone(),
                        firing_units: Vec::new(),
                        target_units: Vec::new(),
                        suicide_on_hit: false,
                    },
                    hits: 0,
                    casualties: None,
                },
            );
            return Ok("no units left to fire".to_string());
        };

        let sides = state.options.dice_sides;
        let mut hits = 0;
        let mut dice = 0;
        for unit in &group.firing_units {
            let (power, rolls) = match phase {
                FirePhase::Aa => {
                    let attacks = unit.attachment().max_aa_attacks;
                    let targets = group.target_units.len() as u32;
                    let rolls = if attacks > 0 {
                        targets.min(attacks as u32)
                    } else {
                        targets
                    };
                    (unit.aa_power(*side), rolls)
                }
                _ => (unit.power(*side), unit.rolls(*side)),
            };
            if power == 0 || rolls == 0 {
                continue;
            }
            let rolled = self.roller.roll(rolls, sides);
            dice += rolled.len();
            hits += rolled.iter().filter(|die| **die <= power).count() as u32;
        }

        let description = format!("{} dice, {} hits", dice, hits);
        info!(group = %name, side = side.label(), dice, hits, "fire");
        self.pending.insert(
            key,
            PendingFire {
                group,
                hits,
                casualties: None,
            },
        );
        Ok(description)
    }

    fn select(&mut self, state: &BattleState, key: &FireKey, step: &str) -> Result<String> {
        let Self {
            pending, actions, ..
        } = self;
        let fire = pending
            .get_mut(key)
            .ok_or_else(|| BattleError::StepOutOfOrder(step.to_string()))?;

        let details = if fire.hits == 0 || fire.group.target_units.is_empty() {
            CasualtyDetails::default()
        } else {
            let ctx = SelectCasualtiesContext {
                state,
                firing_side: key.0,
                group: &fire.group,
                hits: fire.hits,
            };
            select_main_battle_casualties(&ctx, |ctx, candidates, hits| {
                actions.select_casualties(ctx, candidates, hits)
            })
        };

        let description = format!(
            "{} killed, {} damaged",
            details.killed.len(),
            details.damaged.len()
        );
        fire.casualties = Some(details);
        Ok(description)
    }

    fn notify(&mut self, state: &mut BattleState, key: &FireKey, step: &str) -> Result<String> {
        let fire = self
            .pending
            .remove(key)
            .ok_or_else(|| BattleError::StepOutOfOrder(step.to_string()))?;
        let details = fire
            .casualties
            .ok_or_else(|| BattleError::StepOutOfOrder(step.to_string()))?;

        let hit_side = key.0.opposite();
        let targets = fire.group.target_ids();
        let killed: Vec<UnitId> = details
            .killed_ids()
            .into_iter()
            .filter(|id| targets.contains(id))
            .collect();
        if killed.len() != details.killed.len() {
            warn!(step, "casualties outside the firing group's targets ignored");
        }
        self.actions.notify_casualties(hit_side, &details);
        state.mark_casualties(hit_side, &killed);
        state.apply_damage(hit_side, &details.damaged_ids());

        if fire.group.is_suicide_on_hit() && fire.hits > 0 {
            // One firing unit dies per hit, in firing order
            let mut spent = fire.group.firing_ids();
            spent.truncate(fire.hits as usize);
            state.mark_casualties(key.0, &spent);
        }
        Ok(format!("{} marked as casualties", killed.len()))
    }
}

fn retreat_description(moved: bool) -> String {
    if moved {
        "units left the battle".to_string()
    } else {
        "no retreat".to_string()
    }
}

/// Sea transports left without escort against armed enemies are lost.
/// Attackers that can still retreat keep theirs.
fn remove_unescorted_transports(state: &mut BattleState) -> usize {
    if !state.options.transport_casualties_restricted {
        return 0;
    }
    let mut removed = 0;
    for side in [Side::Offense, Side::Defense] {
        if side == Side::Offense && !state.attacker_retreat_territories.is_empty() {
            continue;
        }
        let units = state.alive(side);
        let transports: Vec<UnitId> = units
            .iter()
            .filter(|unit| unit.is_non_combat_transport())
            .map(|unit| unit.id)
            .collect();
        if transports.is_empty() || transports.len() != units.len() {
            continue;
        }
        let enemy = side.opposite();
        if !state.alive(enemy).iter().any(|unit| unit.has_power(enemy)) {
            continue;
        }
        info!(side = side.label(), count = transports.len(), "unescorted transports lost");
        removed += state.kill_units(side, &transports).len();
    }
    removed
}

/// Execute one round of steps. Returns once the round is done or the battle ends.
pub fn run_round<R: DiceRoller, A: BattleActions>(
    state: &mut BattleState,
    executor: &mut StepExecutor<R, A>,
) -> Result<()> {
    let steps = BattleSteps::new(state).step_details();
    info!(round = state.round, steps = steps.len(), "round started");
    for details in &steps {
        if state.over {
            break;
        }
        executor.execute(state, details)?;
    }
    Ok(())
}

/// Fight rounds until the battle ends
pub fn run_battle<R: DiceRoller, A: BattleActions>(
    state: &mut BattleState,
    executor: &mut StepExecutor<R, A>,
) -> Result<WhoWon> {
    let cap = config().max_unbounded_rounds;
    loop {
        run_round(state, executor)?;
        if state.over {
            break;
        }
        if state.round >= cap {
            warn!(round = state.round, "round cap reached, calling a draw");
            state.end_battle(WhoWon::Draw);
            break;
        }
        state.advance_round();
    }
    Ok(state.outcome.unwrap_or(WhoWon::Draw))
}
