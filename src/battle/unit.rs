//! Units, unit types, and the predicates the sequencer asks about them
//!
//! Everything here is read-only classification of static attachment data plus
//! the few pieces of per-unit state (hits, owner, amphibious landing) that
//! battles care about.

use std::sync::Arc;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{Round, Side, UnitId};

/// Combat properties of a unit type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitAttachment {
    pub attack: u32,
    pub defense: u32,
    pub attack_rolls: u32,
    pub defense_rolls: u32,
    pub hit_points: u32,

    pub is_first_strike: bool,
    pub can_evade: bool,
    pub is_destroyer: bool,
    pub is_air: bool,
    pub is_sea: bool,
    pub is_infrastructure: bool,

    pub is_suicide_on_hit: bool,
    pub is_suicide_on_attack: bool,
    pub is_suicide_on_defense: bool,

    pub transport_capacity: u32,
    pub is_air_transport: bool,
    pub is_combat_transport: bool,

    /// Unit type names this type never shoots at
    pub can_not_target: AHashSet<String>,
    /// Unit type names that can never shoot at this type
    pub can_not_be_targeted_by: AHashSet<String>,
    /// `None` means the map did not say; only `Some(true)` allows it
    pub can_retreat_on_stalemate: Option<bool>,

    // AA
    pub type_aa: String,
    pub is_aa_for_combat_only: bool,
    pub attack_aa: u32,
    pub offensive_attack_aa: u32,
    pub targets_aa: AHashSet<String>,
    pub max_rounds_aa: i32, // -1 = every round
    pub max_aa_attacks: i32, // -1 = unlimited
}

impl Default for UnitAttachment {
    fn default() -> Self {
        Self {
            attack: 0,
            defense: 0,
            attack_rolls: 1,
            defense_rolls: 1,
            hit_points: 1,
            is_first_strike: false,
            can_evade: false,
            is_destroyer: false,
            is_air: false,
            is_sea: false,
            is_infrastructure: false,
            is_suicide_on_hit: false,
            is_suicide_on_attack: false,
            is_suicide_on_defense: false,
            transport_capacity: 0,
            is_air_transport: false,
            is_combat_transport: false,
            can_not_target: AHashSet::new(),
            can_not_be_targeted_by: AHashSet::new(),
            can_retreat_on_stalemate: None,
            type_aa: String::new(),
            is_aa_for_combat_only: false,
            attack_aa: 0,
            offensive_attack_aa: 0,
            targets_aa: AHashSet::new(),
            max_rounds_aa: 1,
            max_aa_attacks: -1,
        }
    }
}

/// A named unit type with its attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub attachment: UnitAttachment,
}

impl UnitType {
    pub fn new(name: impl Into<String>, attachment: UnitAttachment) -> Self {
        Self {
            name: name.into(),
            attachment,
        }
    }

    /// Wrap in an `Arc` so many units can share one type
    pub fn shared(name: impl Into<String>, attachment: UnitAttachment) -> Arc<Self> {
        Arc::new(Self::new(name, attachment))
    }
}

/// A single unit taking part in a battle
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: Arc<UnitType>,
    pub owner: String,
    pub hits: u32,
    pub was_amphibious: bool,
    pub transported_by: Option<UnitId>,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Unit {}

impl Unit {
    pub fn new(unit_type: Arc<UnitType>, owner: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(),
            unit_type,
            owner: owner.into(),
            hits: 0,
            was_amphibious: false,
            transported_by: None,
        }
    }

    pub fn with_hits(mut self, hits: u32) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_was_amphibious(mut self, was_amphibious: bool) -> Self {
        self.was_amphibious = was_amphibious;
        self
    }

    pub fn with_transported_by(mut self, transport: UnitId) -> Self {
        self.transported_by = Some(transport);
        self
    }

    pub fn attachment(&self) -> &UnitAttachment {
        &self.unit_type.attachment
    }

    pub fn type_name(&self) -> &str {
        &self.unit_type.name
    }

    /// Hit points left before the unit dies
    pub fn remaining_hit_points(&self) -> u32 {
        self.attachment().hit_points.saturating_sub(self.hits)
    }

    pub fn is_sea(&self) -> bool {
        self.attachment().is_sea
    }

    pub fn is_air(&self) -> bool {
        self.attachment().is_air
    }

    pub fn is_infrastructure(&self) -> bool {
        self.attachment().is_infrastructure
    }

    pub fn is_first_strike(&self) -> bool {
        self.attachment().is_first_strike
    }

    pub fn can_evade(&self) -> bool {
        self.attachment().can_evade
    }

    pub fn is_destroyer(&self) -> bool {
        self.attachment().is_destroyer
    }

    pub fn is_suicide_on_hit(&self) -> bool {
        self.attachment().is_suicide_on_hit
    }

    pub fn is_suicide_on_attack(&self) -> bool {
        self.attachment().is_suicide_on_attack
    }

    pub fn is_suicide_on_defense(&self) -> bool {
        self.attachment().is_suicide_on_defense
    }

    pub fn is_transport(&self) -> bool {
        self.attachment().transport_capacity > 0
    }

    pub fn is_sea_transport(&self) -> bool {
        self.is_transport() && self.is_sea()
    }

    /// Sea transport that cannot defend itself
    pub fn is_non_combat_transport(&self) -> bool {
        self.is_sea_transport() && !self.attachment().is_combat_transport
    }

    pub fn is_air_transport(&self) -> bool {
        self.attachment().is_air_transport
    }

    pub fn can_retreat_on_stalemate(&self) -> bool {
        self.attachment().can_retreat_on_stalemate == Some(true)
    }

    /// Combat strength when fighting on `side`
    pub fn power(&self, side: Side) -> u32 {
        match side {
            Side::Offense => self.attachment().attack,
            Side::Defense => self.attachment().defense,
        }
    }

    pub fn rolls(&self, side: Side) -> u32 {
        match side {
            Side::Offense => self.attachment().attack_rolls,
            Side::Defense => self.attachment().defense_rolls,
        }
    }

    pub fn has_power(&self, side: Side) -> bool {
        self.power(side) > 0 && self.rolls(side) > 0
    }

    /// Whether this unit is allowed to shoot at `target`
    pub fn can_target(&self, target: &Unit) -> bool {
        !self.attachment().can_not_target.contains(target.type_name())
            && !target
                .attachment()
                .can_not_be_targeted_by
                .contains(self.type_name())
    }

    pub fn aa_power(&self, side: Side) -> u32 {
        match side {
            Side::Offense => self.attachment().offensive_attack_aa,
            Side::Defense => self.attachment().attack_aa,
        }
    }

    /// AA that fires in its own pre-battle phase during `round`
    pub fn is_combat_aa(&self, side: Side, round: Round) -> bool {
        let attachment = self.attachment();
        let round = round.max(1) as i64;
        !attachment.type_aa.is_empty()
            && attachment.is_aa_for_combat_only
            && self.aa_power(side) > 0
            && attachment.max_aa_attacks != 0
            && (attachment.max_rounds_aa < 0 || round <= attachment.max_rounds_aa as i64)
    }

    pub fn is_aa_target_of(&self, aa: &Unit) -> bool {
        aa.attachment().targets_aa.contains(self.type_name())
    }
}

pub fn any_destroyer<'a>(units: impl IntoIterator<Item = &'a Unit>) -> bool {
    units.into_iter().any(Unit::is_destroyer)
}

/// True when there is at least one unit and every unit is a defenceless transport
pub fn only_non_combat_transports<'a>(units: impl IntoIterator<Item = &'a Unit>) -> bool {
    let mut seen = false;
    for unit in units {
        if !unit.is_non_combat_transport() {
            return false;
        }
        seen = true;
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, attachment: UnitAttachment) -> Unit {
        Unit::new(UnitType::shared(name, attachment), "Germans")
    }

    #[test]
    fn test_remaining_hit_points_never_underflows() {
        let battleship = unit(
            "battleship",
            UnitAttachment {
                hit_points: 2,
                ..Default::default()
            },
        );
        assert_eq!(battleship.remaining_hit_points(), 2);
        assert_eq!(battleship.clone().with_hits(1).remaining_hit_points(), 1);
        assert_eq!(battleship.with_hits(5).remaining_hit_points(), 0);
    }

    #[test]
    fn test_can_target_respects_both_directions() {
        let mut sub_attachment = UnitAttachment {
            is_sea: true,
            can_evade: true,
            ..Default::default()
        };
        sub_attachment
            .can_not_be_targeted_by
            .insert("fighter".to_string());
        let sub = unit("submarine", sub_attachment);

        let mut fighter_attachment = UnitAttachment {
            is_air: true,
            ..Default::default()
        };
        fighter_attachment.can_not_target.insert("tank".to_string());
        let fighter = unit("fighter", fighter_attachment);
        let tank = unit("tank", UnitAttachment::default());
        let infantry = unit("infantry", UnitAttachment::default());

        assert!(!fighter.can_target(&sub));
        assert!(!fighter.can_target(&tank));
        assert!(fighter.can_target(&infantry));
        assert!(sub.can_target(&fighter));
    }

    #[test]
    fn test_transport_classification() {
        let transport = unit(
            "transport",
            UnitAttachment {
                is_sea: true,
                transport_capacity: 2,
                ..Default::default()
            },
        );
        let armed_transport = unit(
            "armed transport",
            UnitAttachment {
                is_sea: true,
                transport_capacity: 2,
                is_combat_transport: true,
                ..Default::default()
            },
        );
        assert!(transport.is_non_combat_transport());
        assert!(!armed_transport.is_non_combat_transport());
        assert!(only_non_combat_transports([&transport]));
        assert!(!only_non_combat_transports([&transport, &armed_transport]));
        assert!(!only_non_combat_transports(std::iter::empty::<&Unit>()));
    }

    #[test]
    fn test_combat_aa_needs_type_power_and_rounds() {
        let mut attachment = UnitAttachment {
            type_aa: "AntiAirGun".to_string(),
            is_aa_for_combat_only: true,
            attack_aa: 1,
            ..Default::default()
        };
        let gun = unit("aa gun", attachment.clone());
        assert!(gun.is_combat_aa(Side::Defense, 1));
        assert!(gun.is_combat_aa(Side::Defense, 0));
        assert!(!gun.is_combat_aa(Side::Defense, 2));
        assert!(!gun.is_combat_aa(Side::Offense, 1));

        attachment.max_rounds_aa = -1;
        let gun = unit("aa gun", attachment);
        assert!(gun.is_combat_aa(Side::Defense, 7));
    }
}
