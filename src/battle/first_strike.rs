//! When each side's first strike units get to fire
//!
//! Destroyers cancel the sneak attack. Under WW2V2 rules defending first
//! strike units facing a destroyer still fire before the standard units,
//! otherwise they fall back into their side's general fire. Where the
//! attacker's cancelled first strike fires is decided by the sequencer.

use crate::battle::state::BattleState;
use crate::battle::unit::any_destroyer;
use crate::core::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirstStrikeOrder {
    NotApplicable,
    SneakAttack,
    SneakAttackWithOpposingFirstStrike,
    NoSneakAttack,
    NoSneakAttackButBeforeStandardAttack,
}

impl FirstStrikeOrder {
    /// Casualties of this phase are removed before the enemy returns fire
    pub fn is_sneak_attack(self) -> bool {
        matches!(
            self,
            FirstStrikeOrder::SneakAttack | FirstStrikeOrder::SneakAttackWithOpposingFirstStrike
        )
    }

    /// Fires in the early first strike slot rather than with general units
    pub fn fires_early(self) -> bool {
        self.is_sneak_attack() || self == FirstStrikeOrder::NoSneakAttackButBeforeStandardAttack
    }

    pub fn fires_with_general(self) -> bool {
        self == FirstStrikeOrder::NoSneakAttack
    }
}

fn has_first_strike(state: &BattleState, side: Side) -> bool {
    state.alive(side).iter().any(|unit| unit.is_first_strike())
}

pub fn order_for(state: &BattleState, side: Side) -> FirstStrikeOrder {
    match side {
        Side::Offense => offensive_order(state),
        Side::Defense => defensive_order(state),
    }
}

pub fn offensive_order(state: &BattleState) -> FirstStrikeOrder {
    if !has_first_strike(state, Side::Offense) {
        return FirstStrikeOrder::NotApplicable;
    }
    if any_destroyer(state.alive(Side::Defense)) {
        return FirstStrikeOrder::NoSneakAttack;
    }
    let ww2v2 = state.options.ww2v2;
    let defending_sneak = state.options.defending_subs_sneak_attack;
    if ww2v2 || (defending_sneak && !any_destroyer(state.alive(Side::Offense))) {
        FirstStrikeOrder::SneakAttackWithOpposingFirstStrike
    } else {
        FirstStrikeOrder::SneakAttack
    }
}

pub fn defensive_order(state: &BattleState) -> FirstStrikeOrder {
    if !has_first_strike(state, Side::Defense) {
        return FirstStrikeOrder::NotApplicable;
    }
    let ww2v2 = state.options.ww2v2;
    if !state.options.defending_sneak_attack_allowed() {
        return FirstStrikeOrder::NoSneakAttack;
    }
    if any_destroyer(state.alive(Side::Offense)) {
        return if ww2v2 {
            FirstStrikeOrder::NoSneakAttackButBeforeStandardAttack
        } else {
            FirstStrikeOrder::NoSneakAttack
        };
    }
    if ww2v2 || !any_destroyer(state.alive(Side::Defense)) {
        FirstStrikeOrder::SneakAttackWithOpposingFirstStrike
    } else {
        FirstStrikeOrder::SneakAttack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::{BattleStateBuilder, GamePlayer};
    use crate::battle::unit::{Unit, UnitAttachment, UnitType};
    use crate::core::config::GameOptions;

    fn sub(owner: &str) -> Unit {
        Unit::new(
            UnitType::shared(
                "submarine",
                UnitAttachment {
                    is_first_strike: true,
                    can_evade: true,
                    is_sea: true,
                    ..Default::default()
                },
            ),
            owner,
        )
    }

    fn destroyer(owner: &str) -> Unit {
        Unit::new(
            UnitType::shared(
                "destroyer",
                UnitAttachment {
                    is_destroyer: true,
                    is_sea: true,
                    ..Default::default()
                },
            ),
            owner,
        )
    }

    fn state(attackers: Vec<Unit>, defenders: Vec<Unit>, ww2v2: bool, sneak: bool) -> BattleState {
        let mut options = GameOptions::default();
        options.ww2v2 = ww2v2;
        options.defending_subs_sneak_attack = sneak;
        BattleStateBuilder::new(GamePlayer::new("Germans"), GamePlayer::new("British"))
            .with_options(options)
            .with_attacking_units(attackers)
            .with_defending_units(defenders)
            .build()
    }

    #[test]
    fn test_no_first_strike_units() {
        let state = state(vec![destroyer("Germans")], vec![destroyer("British")], true, true);
        assert_eq!(offensive_order(&state), FirstStrikeOrder::NotApplicable);
        assert_eq!(defensive_order(&state), FirstStrikeOrder::NotApplicable);
    }

    #[test]
    fn test_classic_rules_subs_vs_subs() {
        let state = state(vec![sub("Germans")], vec![sub("British")], false, false);
        assert_eq!(offensive_order(&state), FirstStrikeOrder::SneakAttack);
        assert_eq!(defensive_order(&state), FirstStrikeOrder::NoSneakAttack);
    }

    #[test]
    fn test_defending_sneak_attack_option() {
        let state = state(vec![sub("Germans")], vec![sub("British")], false, true);
        assert_eq!(
            offensive_order(&state),
            FirstStrikeOrder::SneakAttackWithOpposingFirstStrike
        );
        assert_eq!(
            defensive_order(&state),
            FirstStrikeOrder::SneakAttackWithOpposingFirstStrike
        );
    }

    #[test]
    fn test_destroyers_cancel_sneak_attacks() {
        let classic = state(
            vec![sub("Germans"), destroyer("Germans")],
            vec![sub("British"), destroyer("British")],
            false,
            true,
        );
        assert_eq!(offensive_order(&classic), FirstStrikeOrder::NoSneakAttack);
        assert_eq!(defensive_order(&classic), FirstStrikeOrder::NoSneakAttack);

        let ww2v2 = state(
            vec![sub("Germans"), destroyer("Germans")],
            vec![sub("British"), destroyer("British")],
            true,
            false,
        );
        assert_eq!(offensive_order(&ww2v2), FirstStrikeOrder::NoSneakAttack);
        assert_eq!(
            defensive_order(&ww2v2),
            FirstStrikeOrder::NoSneakAttackButBeforeStandardAttack
        );
    }

    #[test]
    fn test_own_destroyer_only_changes_sneak_kind() {
        let state = state(
            vec![sub("Germans")],
            vec![sub("British"), destroyer("British")],
            false,
            true,
        );
        assert_eq!(offensive_order(&state), FirstStrikeOrder::NoSneakAttack);
        assert_eq!(defensive_order(&state), FirstStrikeOrder::SneakAttack);
    }

    #[test]
    fn test_slots() {
        assert!(FirstStrikeOrder::SneakAttack.fires_early());
        assert!(FirstStrikeOrder::NoSneakAttackButBeforeStandardAttack.fires_early());
        assert!(!FirstStrikeOrder::NoSneakAttackButBeforeStandardAttack.is_sneak_attack());
        assert!(FirstStrikeOrder::NoSneakAttack.fires_with_general());
        assert!(!FirstStrikeOrder::NotApplicable.fires_early());
    }
}
