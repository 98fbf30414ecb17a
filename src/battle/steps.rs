//! Battle step sequencer
//!
//! Builds the ordered list of steps for one round from a `BattleState`
//! snapshot. Each rule below looks at the state and contributes zero or more
//! steps; rules run in a fixed order. Nothing here mutates the state, so the
//! same snapshot always produces the same list.

use serde::Serialize;
use tracing::debug;

use crate::battle::first_strike::{defensive_order, offensive_order, FirstStrikeOrder};
use crate::battle::firing_group::FiringGroup;
use crate::battle::retreat::{
    attacker_withdraw_name, defensive_subs_retreat, offensive_general_retreat,
    offensive_subs_retreat,
};
use crate::battle::splitter::{split_aa, split_bombardment, FiringGroupSplitter, FiringKind};
use crate::battle::state::BattleState;
use crate::battle::strings::{
    aa_fire_name, fire_name, notify_casualties_name, select_casualties_name, FIRST_STRIKE_UNITS,
    LAND_PARATROOPS, REMOVE_BOMBARDMENT_CASUALTIES, REMOVE_CASUALTIES,
    REMOVE_SNEAK_ATTACK_CASUALTIES, REMOVE_UNESCORTED_TRANSPORTS, SUBMERGE_SUBS_VS_AIR_ONLY,
    UNITS,
};
use crate::battle::unit::Unit;
use crate::core::types::{Side, UnitId};

/// Which splitter produced a fire group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirePhase {
    Aa,
    Bombard,
    FirstStrike,
    General,
}

impl FirePhase {
    /// Recompute this phase's firing groups for `side`
    pub fn groups(self, state: &BattleState, side: Side) -> Vec<FiringGroup> {
        match self {
            FirePhase::Aa => split_aa(state, side),
            FirePhase::Bombard => split_bombardment(state),
            FirePhase::FirstStrike => {
                FiringGroupSplitter::new(side, FiringKind::FirstStrike, FIRST_STRIKE_UNITS)
                    .split(state)
            }
            FirePhase::General => {
                FiringGroupSplitter::new(side, FiringKind::Normal, UNITS).split(state)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FireStage {
    Fire,
    SelectCasualties,
    NotifyCasualties,
}

/// One executable step. Variants carry data only; the executor gives them meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BattleStep {
    /// `side` is the side that fires
    Fire {
        side: Side,
        phase: FirePhase,
        group: String,
        stage: FireStage,
    },
    RemoveBombardmentCasualties,
    LandParatroopers,
    SubsRetreat {
        side: Side,
        before_battle: bool,
    },
    RemoveUnescortedTransports,
    SubmergeSubsVsAirOnly,
    RemoveSneakAttackCasualties,
    RemoveCasualties,
    AttackerWithdraw,
}

/// Display name paired with the command that runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDetails {
    pub name: String,
    pub step: BattleStep,
}

impl StepDetails {
    fn new(name: impl Into<String>, step: BattleStep) -> Self {
        Self {
            name: name.into(),
            step,
        }
    }
}

type StepRule = fn(&BattleState, &mut Vec<StepDetails>);

/// Rules in the order their steps appear
const RULES: &[(&str, StepRule)] = &[
    ("aa", aa_steps),
    ("bombard", bombard_steps),
    ("paratroopers", paratrooper_steps),
    ("retreat before battle", retreat_before_battle_steps),
    ("unescorted transports", unescorted_transport_steps),
    ("submerge vs air", submerge_vs_air_steps),
    ("first strike", early_first_strike_steps),
    ("sneak attack casualties", sneak_attack_casualty_steps),
    ("general fire", general_fire_steps),
    ("remove casualties", remove_casualty_steps),
    ("retreat", retreat_steps),
];

pub struct BattleSteps<'a> {
    state: &'a BattleState,
}

impl<'a> BattleSteps<'a> {
    pub fn new(state: &'a BattleState) -> Self {
        Self { state }
    }

    /// Step display names in execution order
    pub fn get(&self) -> Vec<String> {
        self.step_details()
            .into_iter()
            .map(|details| details.name)
            .collect()
    }

    pub fn step_details(&self) -> Vec<StepDetails> {
        let mut steps = Vec::new();
        for (rule, apply) in RULES {
            let before = steps.len();
            apply(self.state, &mut steps);
            if steps.len() > before {
                debug!(rule, added = steps.len() - before, "battle steps");
            }
        }
        steps
    }
}

/// Fire, select and notify steps for each group
fn push_fire_triples(
    state: &BattleState,
    side: Side,
    phase: FirePhase,
    groups: &[FiringGroup],
    steps: &mut Vec<StepDetails>,
) {
    let firing = &state.player(side).name;
    let hit = &state.player(side.opposite()).name;
    for group in groups {
        let name = &group.display_name;
        let fire = match phase {
            FirePhase::Aa => aa_fire_name(firing, name),
            _ => fire_name(firing, name),
        };
        let step = |stage| BattleStep::Fire {
            side,
            phase,
            group: name.clone(),
            stage,
        };
        steps.push(StepDetails::new(fire, step(FireStage::Fire)));
        steps.push(StepDetails::new(
            select_casualties_name(hit, name),
            step(FireStage::SelectCasualties),
        ));
        steps.push(StepDetails::new(
            notify_casualties_name(hit, name),
            step(FireStage::NotifyCasualties),
        ));
    }
}

fn aa_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    for side in [Side::Offense, Side::Defense] {
        let groups = split_aa(state, side);
        push_fire_triples(state, side, FirePhase::Aa, &groups, steps);
    }
}

fn bombard_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    if !state.is_first_round()
        || state.bombarding_units.is_empty()
        || state.battle_site.is_water
    {
        return;
    }
    let groups = split_bombardment(state);
    push_fire_triples(state, Side::Offense, FirePhase::Bombard, &groups, steps);
    steps.push(StepDetails::new(
        REMOVE_BOMBARDMENT_CASUALTIES,
        BattleStep::RemoveBombardmentCasualties,
    ));
}

/// Air transports on the battle site that belong to the attacker
pub fn attacker_air_transports(state: &BattleState) -> Vec<UnitId> {
    state
        .battle_site
        .units
        .iter()
        .filter(|unit| unit.owner == state.attacker.name && unit.is_air_transport())
        .map(|unit| unit.id)
        .collect()
}

fn paratrooper_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    // Cheap checks first, the site's units are only read when they pass
    if !state.is_first_round() || state.battle_site.is_water || !state.attacker.tech.paratroopers
    {
        return;
    }
    let transports = attacker_air_transports(state);
    let has_cargo = state
        .dependent_units
        .iter()
        .any(|unit| unit.transported_by.is_some_and(|t| transports.contains(&t)));
    if has_cargo {
        steps.push(StepDetails::new(LAND_PARATROOPS, BattleStep::LandParatroopers));
    }
}

fn push_subs_retreat(
    state: &BattleState,
    side: Side,
    before_battle: bool,
    steps: &mut Vec<StepDetails>,
) {
    let kind = match side {
        Side::Offense => offensive_subs_retreat(state),
        Side::Defense => defensive_subs_retreat(state),
    };
    if let Some(kind) = kind {
        steps.push(StepDetails::new(
            kind.step_name(&state.player(side).name),
            BattleStep::SubsRetreat {
                side,
                before_battle,
            },
        ));
    }
}

fn retreat_before_battle_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    if !state.options.sub_retreat_before_battle {
        return;
    }
    push_subs_retreat(state, Side::Offense, true, steps);
    push_subs_retreat(state, Side::Defense, true, steps);
}

fn unescorted_transport_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    if !state.options.transport_casualties_restricted || !state.battle_site.is_water {
        return;
    }
    let any_transport = state
        .attacking_units
        .iter()
        .chain(&state.defending_units)
        .any(Unit::is_sea_transport);
    if any_transport {
        steps.push(StepDetails::new(
            REMOVE_UNESCORTED_TRANSPORTS,
            BattleStep::RemoveUnescortedTransports,
        ));
    }
}

/// Evaders of `side` that every enemy is unable to shoot, when the enemy is all air
pub fn evaders_safe_from_air(state: &BattleState, side: Side) -> Vec<UnitId> {
    let enemies = state.alive(side.opposite());
    if enemies.is_empty() || !enemies.iter().all(Unit::is_air) {
        return Vec::new();
    }
    state
        .alive(side)
        .iter()
        .filter(|unit| unit.can_evade())
        .filter(|unit| enemies.iter().all(|enemy| !enemy.can_target(unit)))
        .map(|unit| unit.id)
        .collect()
}

fn submerge_vs_air_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    let applies = [Side::Offense, Side::Defense]
        .into_iter()
        .any(|side| !evaders_safe_from_air(state, side).is_empty());
    if applies {
        steps.push(StepDetails::new(
            SUBMERGE_SUBS_VS_AIR_ONLY,
            BattleStep::SubmergeSubsVsAirOnly,
        ));
    }
}

fn first_strike_orders(state: &BattleState) -> [(Side, FirstStrikeOrder); 2] {
    [
        (Side::Offense, offensive_order(state)),
        (Side::Defense, defensive_order(state)),
    ]
}

fn push_first_strike(state: &BattleState, side: Side, steps: &mut Vec<StepDetails>) {
    let groups = FirePhase::FirstStrike.groups(state, side);
    push_fire_triples(state, side, FirePhase::FirstStrike, &groups, steps);
}

/// Whether `side`'s first strike units fire before the sneak attack removal.
/// Under WW2V2 an attacker without a sneak attack still fires ahead of everyone.
fn first_strike_fires_early(state: &BattleState, side: Side, order: FirstStrikeOrder) -> bool {
    order.fires_early()
        || (side == Side::Offense && state.options.ww2v2 && order.fires_with_general())
}

fn early_first_strike_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    for (side, order) in first_strike_orders(state) {
        if first_strike_fires_early(state, side, order) {
            push_first_strike(state, side, steps);
        }
    }
}

fn sneak_attack_casualty_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    if first_strike_orders(state)
        .iter()
        .any(|(_, order)| order.is_sneak_attack())
    {
        steps.push(StepDetails::new(
            REMOVE_SNEAK_ATTACK_CASUALTIES,
            BattleStep::RemoveSneakAttackCasualties,
        ));
    }
}

fn general_fire_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    for (side, order) in first_strike_orders(state) {
        if order.fires_with_general() && !first_strike_fires_early(state, side, order) {
            push_first_strike(state, side, steps);
        }
        let groups = FirePhase::General.groups(state, side);
        push_fire_triples(state, side, FirePhase::General, &groups, steps);
    }
}

fn remove_casualty_steps(_state: &BattleState, steps: &mut Vec<StepDetails>) {
    steps.push(StepDetails::new(REMOVE_CASUALTIES, BattleStep::RemoveCasualties));
}

fn retreat_steps(state: &BattleState, steps: &mut Vec<StepDetails>) {
    let after_battle = !state.options.sub_retreat_before_battle;
    if after_battle {
        push_subs_retreat(state, Side::Offense, false, steps);
    }
    if offensive_general_retreat(state).is_some() {
        steps.push(StepDetails::new(
            attacker_withdraw_name(&state.attacker.name),
            BattleStep::AttackerWithdraw,
        ));
    }
    if after_battle {
        push_subs_retreat(state, Side::Defense, false, steps);
    }
}
