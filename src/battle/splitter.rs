//! Split a side's units into firing groups
//!
//! Three splitters feed the sequencer:
//! - general fire (regular units or first strike units)
//! - combat AA, one group per AA type
//! - naval bombardment from ships offshore

use tracing::debug;

use crate::battle::firing_group::{group_by_suicide_on_hit, FiringGroup};
use crate::battle::state::{BattleState, UnitFilter};
use crate::battle::strings::{AIR_FIRE_NON_SUBS, NAVAL_BOMBARD};
use crate::battle::unit::Unit;
use crate::core::types::{Side, UnitId};

/// Which units take part in a general fire phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiringKind {
    Normal,
    FirstStrike,
}

impl FiringKind {
    fn includes(self, unit: &Unit) -> bool {
        match self {
            FiringKind::Normal => !unit.is_first_strike(),
            FiringKind::FirstStrike => unit.is_first_strike(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiringGroupSplitter {
    pub side: Side,
    pub kind: FiringKind,
    pub base_name: String,
}

impl FiringGroupSplitter {
    pub fn new(side: Side, kind: FiringKind, base_name: impl Into<String>) -> Self {
        Self {
            side,
            kind,
            base_name: base_name.into(),
        }
    }

    pub fn split(&self, state: &BattleState) -> Vec<FiringGroup> {
        let options = &state.options;
        let firing: Vec<&Unit> = state
            .filter_units(UnitFilter::AliveOrCasualty, self.side)
            .into_iter()
            .filter(|unit| self.kind.includes(unit))
            .filter(|unit| match self.side {
                // Owner is only consulted on offense
                Side::Offense => {
                    options.allied_air_independent || unit.owner == state.attacker.name
                }
                Side::Defense => {
                    !options.defending_suicide_and_munition_units_do_not_fire
                        || !unit.is_suicide_on_defense()
                }
            })
            .collect();

        let targets = valid_targets(state, self.side);
        if firing.is_empty() || targets.is_empty() {
            return Vec::new();
        }

        let target_groups = target_groups(&firing, &targets);
        let single = target_groups.len() == 1;
        let mut groups = Vec::new();
        for (group_firing, group_targets) in target_groups {
            let name = if single {
                self.base_name.clone()
            } else if group_firing.iter().all(|unit| unit.is_air())
                && group_targets.len() < targets.len()
            {
                AIR_FIRE_NON_SUBS.to_string()
            } else if group_targets.len() == targets.len() {
                self.base_name.clone()
            } else {
                format!("{} {}", self.base_name, type_names(&group_firing))
            };
            groups.extend(group_by_suicide_on_hit(
                &name,
                &group_firing,
                &group_targets,
            ));
        }

        debug!(
            side = self.side.label(),
            kind = ?self.kind,
            groups = groups.len(),
            "split firing groups"
        );
        groups
    }
}

/// Enemy units this side may shoot at in general combat
pub fn valid_targets(state: &BattleState, firing_side: Side) -> Vec<&Unit> {
    state
        .alive(firing_side.opposite())
        .iter()
        .filter(|unit| !unit.is_infrastructure())
        .filter(|unit| match firing_side {
            Side::Offense => !unit.is_suicide_on_defense(),
            Side::Defense => !unit.is_suicide_on_attack(),
        })
        .collect()
}

/// Group firing units by the exact set of targets they may hit.
/// Groups come out in order of their first firing unit.
fn target_groups(firing: &[&Unit], targets: &[&Unit]) -> Vec<(Vec<Unit>, Vec<Unit>)> {
    let mut groups: Vec<(Vec<UnitId>, Vec<Unit>, Vec<Unit>)> = Vec::new();
    for unit in firing {
        let reachable: Vec<&Unit> = targets
            .iter()
            .copied()
            .filter(|target| unit.can_target(target))
            .collect();
        if reachable.is_empty() {
            continue;
        }
        let key: Vec<UnitId> = reachable.iter().map(|target| target.id).collect();
        match groups.iter_mut().find(|(existing, _, _)| *existing == key) {
            Some((_, units, _)) => units.push((*unit).clone()),
            None => groups.push((
                key,
                vec![(*unit).clone()],
                reachable.into_iter().cloned().collect(),
            )),
        }
    }
    groups
        .into_iter()
        .map(|(_, firing, targets)| (firing, targets))
        .collect()
}

fn type_names(units: &[Unit]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for unit in units {
        if !names.contains(&unit.type_name()) {
            names.push(unit.type_name());
        }
    }
    names.join(", ")
}

/// One group per combat AA type, each shooting at the enemy types it lists
pub fn split_aa(state: &BattleState, side: Side) -> Vec<FiringGroup> {
    let enemies = state.alive(side.opposite());
    let mut by_type: Vec<(String, Vec<Unit>, Vec<Unit>)> = Vec::new();

    for aa in state
        .alive(side)
        .iter()
        .filter(|unit| unit.is_combat_aa(side, state.round))
    {
        let targets: Vec<Unit> = enemies
            .iter()
            .filter(|enemy| enemy.is_aa_target_of(aa))
            .filter(|enemy| state.is_at_war(&aa.owner, &enemy.owner))
            .cloned()
            .collect();
        if targets.is_empty() {
            continue;
        }
        let aa_type = aa.attachment().type_aa.clone();
        match by_type.iter_mut().find(|(name, _, _)| *name == aa_type) {
            Some((_, units, group_targets)) => {
                units.push(aa.clone());
                for target in targets {
                    if !group_targets.contains(&target) {
                        group_targets.push(target);
                    }
                }
            }
            None => by_type.push((aa_type, vec![aa.clone()], targets)),
        }
    }

    by_type
        .into_iter()
        .flat_map(|(aa_type, units, targets)| group_by_suicide_on_hit(&aa_type, &units, &targets))
        .collect()
}

/// Offshore ships shelling the defenders of a land territory
pub fn split_bombardment(state: &BattleState) -> Vec<FiringGroup> {
    let targets: Vec<Unit> = valid_targets(state, Side::Offense)
        .into_iter()
        .cloned()
        .collect();
    group_by_suicide_on_hit(NAVAL_BOMBARD, &state.bombarding_units, &targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::{BattleStateBuilder, GamePlayer};
    use crate::battle::strings::UNITS;
    use crate::battle::unit::{UnitAttachment, UnitType};
    use crate::core::config::GameOptions;

    fn unit(name: &str, owner: &str, attachment: UnitAttachment) -> Unit {
        Unit::new(UnitType::shared(name, attachment), owner)
    }

    fn plain(name: &str, owner: &str) -> Unit {
        unit(name, owner, UnitAttachment::default())
    }

    fn builder() -> BattleStateBuilder {
        BattleStateBuilder::new(GamePlayer::new("Germans"), GamePlayer::new("Russians"))
    }

    fn general(side: Side) -> FiringGroupSplitter {
        FiringGroupSplitter::new(side, FiringKind::Normal, UNITS)
    }

    #[test]
    fn test_one_firing_unit_vs_one_target() {
        let fire = plain("infantry", "Germans");
        let target = plain("infantry", "Russians");
        let state = builder()
            .with_attacking_units(vec![fire.clone()])
            .with_defending_units(vec![target.clone()])
            .build();

        let groups = general(Side::Offense).split(&state);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].display_name, UNITS);
        assert_eq!(groups[0].firing_units, vec![fire]);
        assert_eq!(groups[0].target_units, vec![target]);
    }

    #[test]
    fn test_waiting_to_die_units_still_fire() {
        let fire = plain("infantry", "Germans");
        let state = builder()
            .with_waiting_to_die(Side::Offense, vec![fire.clone()])
            .with_defending_units(vec![plain("infantry", "Russians")])
            .build();

        let groups = general(Side::Offense).split(&state);
        assert_eq!(groups[0].firing_units, vec![fire]);
    }

    #[test]
    fn test_kinds_are_exclusive() {
        let sub = unit(
            "submarine",
            "Germans",
            UnitAttachment {
                is_first_strike: true,
                ..Default::default()
            },
        );
        let ship = plain("destroyer", "Germans");
        let state = builder()
            .with_attacking_units(vec![sub.clone(), ship.clone()])
            .with_defending_units(vec![plain("cruiser", "Russians")])
            .build();

        let normal = general(Side::Offense).split(&state);
        let first_strike =
            FiringGroupSplitter::new(Side::Offense, FiringKind::FirstStrike, "x").split(&state);
        assert_eq!(normal[0].firing_units, vec![ship]);
        assert_eq!(first_strike[0].firing_units, vec![sub]);
    }

    #[test]
    fn test_allied_units_sit_out_when_air_is_not_independent() {
        let own = plain("fighter", "Germans");
        let ally = plain("fighter", "Italians");
        let mut options = GameOptions::default();
        options.allied_air_independent = false;
        let state = builder()
            .with_options(options.clone())
            .with_attacking_units(vec![own.clone(), ally.clone()])
            .with_defending_units(vec![plain("infantry", "Russians")])
            .build();
        assert_eq!(general(Side::Offense).split(&state)[0].firing_units, vec![own]);

        // Defense never filters by owner
        let state = builder()
            .with_options(options)
            .with_attacking_units(vec![plain("infantry", "Germans")])
            .with_defending_units(vec![
                plain("fighter", "Russians"),
                plain("fighter", "Americans"),
            ])
            .build();
        assert_eq!(general(Side::Defense).split(&state)[0].firing_units.len(), 2);
    }

    #[test]
    fn test_suicide_and_infrastructure_targets_are_excluded() {
        let factory = unit(
            "factory",
            "Russians",
            UnitAttachment {
                is_infrastructure: true,
                ..Default::default()
            },
        );
        let mine = unit(
            "mine",
            "Russians",
            UnitAttachment {
                is_suicide_on_defense: true,
                ..Default::default()
            },
        );
        let state = builder()
            .with_attacking_units(vec![plain("infantry", "Germans")])
            .with_defending_units(vec![factory.clone(), mine.clone()])
            .build();
        assert!(general(Side::Offense).split(&state).is_empty());

        let rocket = unit(
            "rocket",
            "Germans",
            UnitAttachment {
                is_suicide_on_attack: true,
                ..Default::default()
            },
        );
        let state = builder()
            .with_attacking_units(vec![rocket])
            .with_defending_units(vec![plain("infantry", "Russians")])
            .build();
        assert!(general(Side::Defense).split(&state).is_empty());
    }

    #[test]
    fn test_can_not_target_splits_into_named_groups() {
        let target1 = plain("target1", "Russians");
        let target2 = plain("target2", "Russians");
        let target3 = plain("target3", "Russians");

        let mut first = UnitAttachment::default();
        first.can_not_target.insert("target2".into());
        first.can_not_target.insert("target3".into());
        let fire1 = unit("fireUnit", "Germans", first);

        let mut second = UnitAttachment::default();
        second.can_not_target.insert("target1".into());
        let fire2 = unit("fireUnit2", "Germans", second);

        let state = builder()
            .with_attacking_units(vec![fire1.clone(), fire2.clone()])
            .with_defending_units(vec![target1.clone(), target2.clone(), target3.clone()])
            .build();

        let groups = general(Side::Offense).split(&state);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].display_name, "units fireUnit");
        assert_eq!(groups[0].target_units, vec![target1]);
        assert_eq!(groups[1].display_name, "units fireUnit2");
        assert_eq!(groups[1].target_units, vec![target2, target3]);
    }

    #[test]
    fn test_air_vs_sub_gets_its_own_group() {
        let air = unit(
            "fighter",
            "Germans",
            UnitAttachment {
                is_air: true,
                ..Default::default()
            },
        );
        let ship = plain("cruiser", "Germans");
        let mut sub_attachment = UnitAttachment {
            is_sea: true,
            ..Default::default()
        };
        sub_attachment.can_not_be_targeted_by.insert("fighter".into());
        let sub = unit("submarine", "Russians", sub_attachment);
        let other = plain("cruiser", "Russians");

        let state = builder()
            .with_attacking_units(vec![air.clone(), ship.clone()])
            .with_defending_units(vec![sub.clone(), other.clone()])
            .build();

        let groups = general(Side::Offense).split(&state);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].display_name, AIR_FIRE_NON_SUBS);
        assert_eq!(groups[0].target_units, vec![other.clone()]);
        assert_eq!(groups[1].display_name, UNITS);
        assert_eq!(groups[1].firing_units, vec![ship]);
        assert_eq!(groups[1].target_units, vec![sub, other]);
    }

    #[test]
    fn test_aa_groups_by_type() {
        let mut gun = UnitAttachment {
            type_aa: "AntiAirGun".into(),
            is_aa_for_combat_only: true,
            attack_aa: 1,
            ..Default::default()
        };
        gun.targets_aa.insert("bomber".into());
        let mut flak = gun.clone();
        flak.type_aa = "Flak".into();

        let bomber = plain("bomber", "Germans");
        let state = builder()
            .with_attacking_units(vec![bomber.clone(), plain("infantry", "Germans")])
            .with_defending_units(vec![
                unit("aa gun", "Russians", gun.clone()),
                unit("flak", "Russians", flak),
                unit("aa gun", "Russians", gun),
            ])
            .build();

        let groups = split_aa(&state, Side::Defense);
        let names: Vec<&str> = groups.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(names, vec!["AntiAirGun", "Flak"]);
        assert_eq!(groups[0].firing_units.len(), 2);
        assert_eq!(groups[0].target_units, vec![bomber]);
        assert!(split_aa(&state, Side::Offense).is_empty());
    }
}
