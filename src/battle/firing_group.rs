//! Firing groups: who shoots together at which targets

use crate::battle::strings::SUICIDE;
use crate::battle::unit::Unit;
use crate::core::types::UnitId;

/// Units that roll together against one set of targets
#[derive(Debug, Clone, PartialEq)]
pub struct FiringGroup {
    pub display_name: String,
    pub firing_units: Vec<Unit>,
    pub target_units: Vec<Unit>,
    pub suicide_on_hit: bool,
}

impl FiringGroup {
    pub fn is_suicide_on_hit(&self) -> bool {
        self.suicide_on_hit
    }

    pub fn firing_ids(&self) -> Vec<UnitId> {
        self.firing_units.iter().map(|unit| unit.id).collect()
    }

    pub fn target_ids(&self) -> Vec<UnitId> {
        self.target_units.iter().map(|unit| unit.id).collect()
    }
}

/// Split firing units into one regular group plus one group per suicide type.
///
/// Suicide groups are named `"{name} suicide"`, or `"{name} suicide {type}"`
/// once more than one suicide type is present. Input order is kept inside
/// every group and empty partitions produce no group.
pub fn group_by_suicide_on_hit(
    name: &str,
    firing_units: &[Unit],
    target_units: &[Unit],
) -> Vec<FiringGroup> {
    let mut regular = Vec::new();
    // (type name, units) in order of first appearance
    let mut suicide_by_type: Vec<(String, Vec<Unit>)> = Vec::new();

    for unit in firing_units {
        if !unit.is_suicide_on_hit() {
            regular.push(unit.clone());
            continue;
        }
        match suicide_by_type
            .iter_mut()
            .find(|(type_name, _)| type_name == unit.type_name())
        {
            Some((_, units)) => units.push(unit.clone()),
            None => suicide_by_type.push((unit.type_name().to_string(), vec![unit.clone()])),
        }
    }

    let mut groups = Vec::new();
    if !regular.is_empty() {
        groups.push(FiringGroup {
            display_name: name.to_string(),
            firing_units: regular,
            target_units: target_units.to_vec(),
            suicide_on_hit: false,
        });
    }

    let several_types = suicide_by_type.len() > 1;
    for (type_name, units) in suicide_by_type {
        let display_name = if several_types {
            format!("{} {} {}", name, SUICIDE, type_name)
        } else {
            format!("{} {}", name, SUICIDE)
        };
        groups.push(FiringGroup {
            display_name,
            firing_units: units,
            target_units: target_units.to_vec(),
            suicide_on_hit: true,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit::{UnitAttachment, UnitType};
    use proptest::prelude::*;

    fn unit(name: &str, suicide: bool) -> Unit {
        Unit::new(
            UnitType::shared(
                name,
                UnitAttachment {
                    is_suicide_on_hit: suicide,
                    ..Default::default()
                },
            ),
            "Germans",
        )
    }

    #[test]
    fn test_only_regular_units_make_one_group() {
        let units = vec![unit("infantry", false), unit("tank", false)];
        let groups = group_by_suicide_on_hit("units", &units, &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].display_name, "units");
        assert_eq!(groups[0].firing_units, units);
        assert!(!groups[0].is_suicide_on_hit());
    }

    #[test]
    fn test_single_suicide_type_has_no_type_suffix() {
        let units = vec![unit("infantry", false), unit("kamikaze", true)];
        let groups = group_by_suicide_on_hit("units", &units, &[]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].display_name, "units suicide");
        assert!(groups[1].is_suicide_on_hit());
    }

    #[test]
    fn test_only_suicide_units_of_one_type() {
        let units = vec![unit("kamikaze", true), unit("kamikaze", true)];
        let groups = group_by_suicide_on_hit("units", &units, &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].display_name, "units suicide");
        assert_eq!(groups[0].firing_units.len(), 2);
    }

    #[test]
    fn test_several_suicide_types_are_disambiguated() {
        let units = vec![
            unit("kamikaze", true),
            unit("infantry", false),
            unit("missile", true),
            unit("kamikaze", true),
        ];
        let groups = group_by_suicide_on_hit("units", &units, &[]);
        let names: Vec<&str> = groups.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["units", "units suicide kamikaze", "units suicide missile"]
        );
        assert_eq!(groups[1].firing_units, vec![units[0].clone(), units[3].clone()]);
    }

    #[test]
    fn test_empty_input_makes_no_groups() {
        assert!(group_by_suicide_on_hit("units", &[], &[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_groups_partition_input_in_order(
            kinds in proptest::collection::vec((0usize..4, any::<bool>()), 0..24),
        ) {
            let names = ["infantry", "kamikaze", "missile", "tank"];
            let units: Vec<Unit> = kinds
                .iter()
                .map(|(kind, suicide)| unit(names[*kind], *suicide))
                .collect();

            let groups = group_by_suicide_on_hit("units", &units, &[]);

            // Every unit lands in exactly one group
            let total: usize = groups.iter().map(|g| g.firing_units.len()).sum();
            prop_assert_eq!(total, units.len());
            for unit in &units {
                let hits = groups
                    .iter()
                    .filter(|g| g.firing_units.contains(unit))
                    .count();
                prop_assert_eq!(hits, 1);
            }

            // Relative order is preserved inside each group
            for group in &groups {
                let positions: Vec<usize> = group
                    .firing_units
                    .iter()
                    .map(|u| units.iter().position(|x| x == u).unwrap())
                    .collect();
                prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }

            // Names are unique
            let mut seen = std::collections::HashSet::new();
            for group in &groups {
                prop_assert!(seen.insert(group.display_name.clone()));
            }
        }
    }
}
