//! End-of-round battle resolution

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::splitter::valid_targets;
use crate::battle::state::BattleState;
use crate::battle::unit::only_non_combat_transports;
use crate::core::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhoWon {
    Attacker,
    Defender,
    Draw,
}

impl WhoWon {
    pub fn label(self) -> &'static str {
        match self {
            WhoWon::Attacker => "attacker",
            WhoWon::Defender => "defender",
            WhoWon::Draw => "draw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleStatus {
    Continue,
    Ended(WhoWon),
}

/// Whether some unit on `side` has power and a target it may shoot at
fn can_hit_enemy(state: &BattleState, side: Side) -> bool {
    let targets = valid_targets(state, side);
    state
        .alive(side)
        .iter()
        .filter(|unit| unit.has_power(side))
        .any(|unit| targets.iter().any(|target| unit.can_target(target)))
}

/// Attackers may stay and retreat instead of being forced into a draw
fn stalemate_retreat_possible(state: &BattleState) -> bool {
    let attackers = state.alive(Side::Offense);
    let all_can_retreat =
        !attackers.is_empty() && attackers.iter().all(|unit| unit.can_retreat_on_stalemate());
    all_can_retreat
        || (state.options.transport_casualties_restricted
            && only_non_combat_transports(attackers))
}

pub fn check_general_battle_end(state: &BattleState) -> BattleStatus {
    let attackers = state.alive(Side::Offense);
    let defenders = state.alive(Side::Defense);

    if attackers.iter().all(|unit| unit.is_infrastructure()) {
        return BattleStatus::Ended(WhoWon::Defender);
    }
    if defenders.iter().all(|unit| unit.is_infrastructure()) {
        return BattleStatus::Ended(WhoWon::Attacker);
    }

    let max_rounds = state.effective_max_rounds();
    if max_rounds > 0 && state.round >= max_rounds {
        return BattleStatus::Ended(WhoWon::Draw);
    }

    if !can_hit_enemy(state, Side::Offense) && !can_hit_enemy(state, Side::Defense) {
        if stalemate_retreat_possible(state) {
            debug!("stalemate, attacker may still retreat");
            return BattleStatus::Continue;
        }
        return BattleStatus::Ended(WhoWon::Draw);
    }

    BattleStatus::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::{BattleStateBuilder, GamePlayer};
    use crate::battle::unit::{Unit, UnitAttachment, UnitType};
    use crate::core::config::GameOptions;

    fn unit(owner: &str, attachment: UnitAttachment) -> Unit {
        Unit::new(UnitType::shared("unit", attachment), owner)
    }

    fn fighting(owner: &str) -> Unit {
        unit(
            owner,
            UnitAttachment {
                attack: 1,
                defense: 1,
                ..Default::default()
            },
        )
    }

    fn powerless(owner: &str) -> Unit {
        unit(owner, UnitAttachment::default())
    }

    fn factory(owner: &str) -> Unit {
        unit(
            owner,
            UnitAttachment {
                is_infrastructure: true,
                ..Default::default()
            },
        )
    }

    fn builder() -> BattleStateBuilder {
        BattleStateBuilder::new(GamePlayer::new("Germans"), GamePlayer::new("Russians"))
    }

    #[test]
    fn test_defender_wins_without_attacking_units() {
        let state = builder().with_defending_units(vec![fighting("Russians")]).build();
        assert_eq!(
            check_general_battle_end(&state),
            BattleStatus::Ended(WhoWon::Defender)
        );

        let state = builder()
            .with_attacking_units(vec![factory("Germans")])
            .with_defending_units(vec![fighting("Russians")])
            .build();
        assert_eq!(
            check_general_battle_end(&state),
            BattleStatus::Ended(WhoWon::Defender)
        );
    }

    #[test]
    fn test_attacker_wins_against_infrastructure() {
        let state = builder()
            .with_attacking_units(vec![fighting("Germans")])
            .with_defending_units(vec![factory("Russians")])
            .build();
        assert_eq!(
            check_general_battle_end(&state),
            BattleStatus::Ended(WhoWon::Attacker)
        );
    }

    #[test]
    fn test_draw_at_max_round() {
        let state = builder()
            .with_attacking_units(vec![fighting("Germans")])
            .with_defending_units(vec![fighting("Russians")])
            .with_round(10)
            .with_max_rounds(10)
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Ended(WhoWon::Draw));
    }

    #[test]
    fn test_continues_while_someone_can_hit() {
        let state = builder()
            .with_attacking_units(vec![fighting("Germans")])
            .with_defending_units(vec![powerless("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Continue);

        let state = builder()
            .with_attacking_units(vec![powerless("Germans")])
            .with_defending_units(vec![fighting("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Continue);
    }

    #[test]
    fn test_zero_power_is_a_draw() {
        let state = builder()
            .with_attacking_units(vec![powerless("Germans")])
            .with_defending_units(vec![powerless("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Ended(WhoWon::Draw));
    }

    #[test]
    fn test_units_that_can_not_target_each_other_draw() {
        let mut sub = UnitAttachment {
            attack: 2,
            defense: 1,
            ..Default::default()
        };
        sub.can_not_target.insert("fighter".into());
        let mut fighter = UnitAttachment {
            attack: 3,
            defense: 4,
            ..Default::default()
        };
        fighter.can_not_target.insert("submarine".into());
        let state = builder()
            .with_attacking_units(vec![Unit::new(UnitType::shared("submarine", sub), "Germans")])
            .with_defending_units(vec![Unit::new(
                UnitType::shared("fighter", fighter),
                "Russians",
            )])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Ended(WhoWon::Draw));
    }

    #[test]
    fn test_stalemate_retreat_keeps_battle_going() {
        let retreating = unit(
            "Germans",
            UnitAttachment {
                can_retreat_on_stalemate: Some(true),
                ..Default::default()
            },
        );
        let state = builder()
            .with_attacking_units(vec![retreating.clone()])
            .with_defending_units(vec![powerless("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Continue);

        let state = builder()
            .with_attacking_units(vec![retreating, powerless("Germans")])
            .with_defending_units(vec![powerless("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Ended(WhoWon::Draw));
    }

    #[test]
    fn test_defenceless_transports_may_retreat_under_restricted_casualties() {
        let transport = unit(
            "Germans",
            UnitAttachment {
                is_sea: true,
                transport_capacity: 2,
                ..Default::default()
            },
        );
        let mut options = GameOptions::default();
        options.transport_casualties_restricted = true;
        let state = builder()
            .with_options(options)
            .with_attacking_units(vec![transport])
            .with_defending_units(vec![powerless("Russians")])
            .build();
        assert_eq!(check_general_battle_end(&state), BattleStatus::Continue);
    }
}
