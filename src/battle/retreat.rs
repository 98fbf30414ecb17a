//! Submerge and withdraw options
//!
//! The `*_retreat` functions decide whether a step is offered at all and are
//! pure. The `execute_*` functions run when the step comes up and may find
//! that the situation changed since the step list was built.

use tracing::{debug, info};

use crate::battle::battle_end::WhoWon;
use crate::battle::executor::BattleActions;
use crate::battle::state::{BattleState, Territory};
use crate::battle::strings::{ATTACKER_WITHDRAW, SUBS_SUBMERGE, SUBS_WITHDRAW};
use crate::battle::unit::{any_destroyer, only_non_combat_transports, Unit};
use crate::core::types::{Side, UnitId};

/// How evading units leave the battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsRetreat {
    Submerge,
    Withdraw,
}

impl SubsRetreat {
    pub fn step_name(self, player: &str) -> String {
        let suffix = match self {
            SubsRetreat::Submerge => SUBS_SUBMERGE,
            SubsRetreat::Withdraw => SUBS_WITHDRAW,
        };
        format!("{}{}", player, suffix)
    }
}

/// Which attacking units a general withdraw takes along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackerWithdraw {
    /// Air units lift off from an amphibious assault or a sea battle
    Planes,
    /// Units that did not land from the sea
    NonAmphibious,
    All,
}

pub fn attacker_withdraw_name(player: &str) -> String {
    format!("{}{}", player, ATTACKER_WITHDRAW)
}

fn has_evaders(state: &BattleState, side: Side) -> bool {
    state.alive(side).iter().any(Unit::can_evade)
}

/// Defenders consisting only of defenceless transports must be fought to the end
fn defenders_are_defenceless(state: &BattleState) -> bool {
    state.options.transport_casualties_restricted
        && only_non_combat_transports(state.alive(Side::Defense))
}

/// Enemy destroyers, including ones already hit this round
fn enemy_destroyer_present(state: &BattleState, side: Side) -> bool {
    let enemy = side.opposite();
    any_destroyer(state.alive(enemy).iter().chain(state.waiting_to_die(enemy)))
}

pub fn offensive_subs_retreat(state: &BattleState) -> Option<SubsRetreat> {
    if !has_evaders(state, Side::Offense)
        || state.amphibious
        || defenders_are_defenceless(state)
    {
        return None;
    }
    if state.options.submersible_subs {
        // An enemy destroyer might still die before the step runs
        Some(SubsRetreat::Submerge)
    } else if !state.attacker_retreat_territories.is_empty()
        && !any_destroyer(state.alive(Side::Defense))
    {
        Some(SubsRetreat::Withdraw)
    } else {
        None
    }
}

/// Neighbouring sea zones free of anyone at war with the defender
pub fn defender_retreat_territories(state: &BattleState) -> Vec<&Territory> {
    let defender = &state.defender.name;
    state
        .neighbors
        .iter()
        .filter(|territory| territory.is_water)
        .filter(|territory| {
            !territory
                .units
                .iter()
                .any(|unit| state.is_at_war(defender, &unit.owner))
        })
        .collect()
}

pub fn defensive_subs_retreat(state: &BattleState) -> Option<SubsRetreat> {
    if !has_evaders(state, Side::Defense) {
        return None;
    }
    if state.options.defending_may_submerge() {
        Some(SubsRetreat::Submerge)
    } else if !any_destroyer(state.alive(Side::Offense))
        && !defender_retreat_territories(state).is_empty()
    {
        Some(SubsRetreat::Withdraw)
    } else {
        None
    }
}

pub fn offensive_general_retreat(state: &BattleState) -> Option<AttackerWithdraw> {
    let options = &state.options;
    let attackers = state.alive(Side::Offense);

    if state.amphibious {
        if options.partial_amphibious_retreat && attackers.iter().any(|unit| !unit.was_amphibious)
        {
            return Some(AttackerWithdraw::NonAmphibious);
        }
        let planes_may_leave =
            options.ww2v2 || options.attacker_retreat_planes || options.partial_amphibious_retreat;
        if planes_may_leave && attackers.iter().any(Unit::is_air) {
            return Some(AttackerWithdraw::Planes);
        }
        return None;
    }

    let can_retreat =
        !state.attacker_retreat_territories.is_empty() && !defenders_are_defenceless(state);
    if state.battle_site.is_water && attackers.iter().any(Unit::is_air) {
        return Some(if can_retreat {
            AttackerWithdraw::All
        } else {
            AttackerWithdraw::Planes
        });
    }
    can_retreat.then_some(AttackerWithdraw::All)
}

fn evader_ids(state: &BattleState, side: Side) -> Vec<UnitId> {
    state
        .alive(side)
        .iter()
        .filter(|unit| unit.can_evade())
        .map(|unit| unit.id)
        .collect()
}

fn territory_names(territories: &[&Territory]) -> Vec<String> {
    territories.iter().map(|t| t.name.clone()).collect()
}

/// Returns true when units left the battle
pub fn execute_offensive_subs_retreat(
    state: &mut BattleState,
    actions: &mut dyn BattleActions,
) -> bool {
    if state.over || enemy_destroyer_present(state, Side::Offense) {
        return false;
    }
    let Some(kind) = offensive_subs_retreat(state) else {
        return false;
    };
    let ids = evader_ids(state, Side::Offense);
    let attacker = state.attacker.name.clone();

    match kind {
        SubsRetreat::Submerge => {
            let message = format!("{} submerge subs?", attacker);
            if !actions.query_submerge(state, Side::Offense, &message) {
                return false;
            }
            info!(player = %attacker, units = ids.len(), "subs submerge");
            state.submerge_units(Side::Offense, &ids);
        }
        SubsRetreat::Withdraw => {
            let candidates: Vec<&Territory> = state.attacker_retreat_territories.iter().collect();
            let names = territory_names(&candidates);
            let message = format!("{} retreat subs?", attacker);
            let Some(destination) =
                actions.query_retreat_territory(state, Side::Offense, &names, &message)
            else {
                return false;
            };
            info!(player = %attacker, to = %destination, "subs withdraw");
            state.retreat_units(Side::Offense, &ids, &destination);
        }
    }
    true
}

/// Defending subs pick a free sea zone, or the battle site itself to submerge
pub fn execute_defensive_subs_retreat(
    state: &mut BattleState,
    actions: &mut dyn BattleActions,
) -> bool {
    if state.over || enemy_destroyer_present(state, Side::Defense) {
        return false;
    }
    if defensive_subs_retreat(state).is_none() {
        return false;
    }

    let mut names = territory_names(&defender_retreat_territories(state));
    let site = state.battle_site.name.clone();
    if state.options.defending_may_submerge() {
        names.push(site.clone());
    }
    if names.is_empty() {
        return false;
    }

    let ids = evader_ids(state, Side::Defense);
    let message = format!("{} retreat subs?", state.defender.name);
    let Some(destination) = actions.query_retreat_territory(state, Side::Defense, &names, &message)
    else {
        return false;
    };
    if destination == site {
        info!(player = %state.defender.name, units = ids.len(), "subs submerge");
        state.submerge_units(Side::Defense, &ids);
    } else {
        info!(player = %state.defender.name, to = %destination, "subs withdraw");
        state.retreat_units(Side::Defense, &ids, &destination);
    }
    true
}

pub fn execute_offensive_general_retreat(
    state: &mut BattleState,
    actions: &mut dyn BattleActions,
) -> bool {
    if state.over {
        return false;
    }
    let Some(kind) = offensive_general_retreat(state) else {
        return false;
    };
    let attacker = state.attacker.name.clone();

    let (ids, names, message): (Vec<UnitId>, Vec<String>, String) = match kind {
        AttackerWithdraw::Planes => (
            state
                .alive(Side::Offense)
                .iter()
                .filter(|unit| unit.is_air())
                .map(|unit| unit.id)
                .collect(),
            vec![state.battle_site.name.clone()],
            format!("{} retreat planes?", attacker),
        ),
        AttackerWithdraw::NonAmphibious => (
            state
                .alive(Side::Offense)
                .iter()
                .filter(|unit| !unit.was_amphibious)
                .map(|unit| unit.id)
                .collect(),
            state
                .attacker_retreat_territories
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            format!("{} retreat non-amphibious units?", attacker),
        ),
        AttackerWithdraw::All => (
            state.alive(Side::Offense).iter().map(|unit| unit.id).collect(),
            state
                .attacker_retreat_territories
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            format!("{} retreat?", attacker),
        ),
    };
    if names.is_empty() {
        debug!(player = %attacker, "no territory to withdraw to");
        return false;
    }

    let Some(destination) = actions.query_retreat_territory(state, Side::Offense, &names, &message)
    else {
        return false;
    };
    info!(player = %attacker, to = %destination, units = ids.len(), "attacker withdraws");
    state.retreat_units(Side::Offense, &ids, &destination);
    // Planes leaving an amphibious assault do not end the fight on land
    if kind == AttackerWithdraw::All {
        state.end_battle(WhoWon::Defender);
    }
    true
}
