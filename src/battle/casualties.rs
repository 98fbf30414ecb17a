//! Main battle casualty selection
//!
//! Decides when casualties can be worked out automatically and otherwise
//! hands a narrowed candidate list to the injected selection function.

use tracing::debug;

use crate::battle::firing_group::FiringGroup;
use crate::battle::state::BattleState;
use crate::battle::unit::Unit;
use crate::core::types::{Side, UnitId};

/// Outcome of one casualty selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasualtyDetails {
    pub killed: Vec<Unit>,
    /// One entry per hit; a unit may appear more than once
    pub damaged: Vec<Unit>,
    pub auto_calculated: bool,
}

impl CasualtyDetails {
    pub fn new(killed: Vec<Unit>, damaged: Vec<Unit>, auto_calculated: bool) -> Self {
        Self {
            killed,
            damaged,
            auto_calculated,
        }
    }

    /// Everything dies, no choice involved
    pub fn all_killed(units: Vec<Unit>) -> Self {
        Self::new(units, Vec::new(), true)
    }

    pub fn killed_ids(&self) -> Vec<UnitId> {
        self.killed.iter().map(|unit| unit.id).collect()
    }

    pub fn damaged_ids(&self) -> Vec<UnitId> {
        self.damaged.iter().map(|unit| unit.id).collect()
    }
}

/// What the selection function gets to look at
#[derive(Debug, Clone, Copy)]
pub struct SelectCasualtiesContext<'a> {
    pub state: &'a BattleState,
    /// Side that fired; its enemy loses units
    pub firing_side: Side,
    pub group: &'a FiringGroup,
    pub hits: u32,
}

impl<'a> SelectCasualtiesContext<'a> {
    pub fn hit_side(&self) -> Side {
        self.firing_side.opposite()
    }

    pub fn targets(&self) -> &'a [Unit] {
        &self.group.target_units
    }
}

fn remaining_hit_points(units: &[Unit]) -> u32 {
    units.iter().map(Unit::remaining_hit_points).sum()
}

/// Pick casualties for a general fire group.
///
/// `select_fn` is only invoked when the outcome is not forced.
pub fn select_main_battle_casualties<F>(
    ctx: &SelectCasualtiesContext<'_>,
    mut select_fn: F,
) -> CasualtyDetails
where
    F: FnMut(&SelectCasualtiesContext<'_>, &[Unit], u32) -> CasualtyDetails,
{
    let options = &ctx.state.options;
    let targets = ctx.targets();

    if !options.transport_casualties_restricted || options.edit_mode {
        if remaining_hit_points(targets) <= ctx.hits {
            debug!(hits = ctx.hits, "hits exceed remaining hit points, all targets die");
            return CasualtyDetails::all_killed(targets.to_vec());
        }
        return select_fn(ctx, targets, ctx.hits);
    }

    let (transports, others): (Vec<Unit>, Vec<Unit>) = targets
        .iter()
        .cloned()
        .partition(Unit::is_sea_transport);

    let others_hit_points = remaining_hit_points(&others);
    if others_hit_points > ctx.hits {
        return select_fn(ctx, &others, ctx.hits);
    }

    let leftover = ctx.hits - others_hit_points;
    if leftover == 0 {
        return CasualtyDetails::all_killed(others);
    }
    if leftover as usize >= transports.len() {
        let mut killed = others;
        killed.extend(transports);
        return CasualtyDetails::all_killed(killed);
    }

    let candidates = transport_candidates(&transports, leftover as usize);
    debug!(
        leftover,
        candidates = candidates.len(),
        "transports take the remaining hits"
    );
    let selected = select_fn(ctx, &candidates, leftover);

    let mut killed = others;
    killed.extend(selected.killed);
    CasualtyDetails::new(killed, selected.damaged, true)
}

/// Up to `count` transports from each owner, owners in order of first appearance
fn transport_candidates(transports: &[Unit], count: usize) -> Vec<Unit> {
    let mut owners: Vec<&str> = Vec::new();
    for transport in transports {
        if !owners.contains(&transport.owner.as_str()) {
            owners.push(&transport.owner);
        }
    }
    owners
        .into_iter()
        .flat_map(|owner| {
            transports
                .iter()
                .filter(move |transport| transport.owner == owner)
                .take(count)
                .cloned()
        })
        .collect()
}
