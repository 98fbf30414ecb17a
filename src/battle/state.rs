//! Battle snapshot handed to the sequencer
//!
//! The sequencer reads a `BattleState` and never changes it. Only step
//! execution mutates it, one step at a time.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::battle_end::WhoWon;
use crate::battle::unit::Unit;
use crate::core::config::GameOptions;
use crate::core::types::{Round, Side, UnitId};

/// Technology a player may have researched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechAdvances {
    pub paratroopers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub name: String,
    #[serde(default)]
    pub alliance: Option<String>,
    #[serde(default)]
    pub tech: TechAdvances,
}

impl GamePlayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alliance: None,
            tech: TechAdvances::default(),
        }
    }

    pub fn with_alliance(mut self, alliance: impl Into<String>) -> Self {
        self.alliance = Some(alliance.into());
        self
    }

    pub fn with_tech(mut self, tech: TechAdvances) -> Self {
        self.tech = tech;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Territory {
    pub name: String,
    pub is_water: bool,
    pub units: Vec<Unit>,
}

impl Territory {
    pub fn land(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_water: false,
            units: Vec::new(),
        }
    }

    pub fn sea(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_water: true,
            units: Vec::new(),
        }
    }

    pub fn with_units(mut self, units: Vec<Unit>) -> Self {
        self.units = units;
        self
    }
}

/// Which of a side's units to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFilter {
    Alive,
    Casualty, // hit this round, still shooting back until removed
    AliveOrCasualty,
}

#[derive(Debug, Clone)]
pub struct BattleState {
    pub attacker: GamePlayer,
    pub defender: GamePlayer,
    pub battle_site: Territory,
    pub neighbors: Vec<Territory>,
    pub round: Round,
    pub max_rounds: Round,

    pub attacking_units: Vec<Unit>,
    pub defending_units: Vec<Unit>,
    pub bombarding_units: Vec<Unit>,
    pub dependent_units: Vec<Unit>,
    pub attacking_waiting_to_die: Vec<Unit>,
    pub defending_waiting_to_die: Vec<Unit>,

    pub amphibious: bool,
    pub attacker_retreat_territories: Vec<Territory>,
    pub options: GameOptions,

    // Results of execution
    pub over: bool,
    pub outcome: Option<WhoWon>,
    pub killed: Vec<Unit>,
    pub submerged: Vec<Unit>,
    pub retreated: Vec<(Unit, String)>,

    alliances: AHashMap<String, String>,
}

impl BattleState {
    pub fn player(&self, side: Side) -> &GamePlayer {
        match side {
            Side::Offense => &self.attacker,
            Side::Defense => &self.defender,
        }
    }

    pub fn alive(&self, side: Side) -> &[Unit] {
        match side {
            Side::Offense => &self.attacking_units,
            Side::Defense => &self.defending_units,
        }
    }

    pub fn waiting_to_die(&self, side: Side) -> &[Unit] {
        match side {
            Side::Offense => &self.attacking_waiting_to_die,
            Side::Defense => &self.defending_waiting_to_die,
        }
    }

    pub fn filter_units(&self, filter: UnitFilter, side: Side) -> Vec<&Unit> {
        match filter {
            UnitFilter::Alive => self.alive(side).iter().collect(),
            UnitFilter::Casualty => self.waiting_to_die(side).iter().collect(),
            UnitFilter::AliveOrCasualty => self
                .alive(side)
                .iter()
                .chain(self.waiting_to_die(side))
                .collect(),
        }
    }

    pub fn find_unit(&self, side: Side, id: UnitId) -> Option<&Unit> {
        self.alive(side)
            .iter()
            .chain(self.waiting_to_die(side))
            .find(|unit| unit.id == id)
    }

    /// Round 0 means the round was never set and counts as the first
    pub fn is_first_round(&self) -> bool {
        self.round <= 1
    }

    /// Round limit, falling back to the land/sea option when unset
    pub fn effective_max_rounds(&self) -> Round {
        if self.max_rounds > 0 {
            return self.max_rounds;
        }
        if self.battle_site.is_water {
            self.options.sea_battle_rounds
        } else {
            self.options.land_battle_rounds
        }
    }

    pub fn alliance_of(&self, player: &str) -> Option<&str> {
        self.alliances.get(player).map(String::as_str)
    }

    pub fn is_allied(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.alliance_of(a), self.alliance_of(b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    pub fn is_at_war(&self, a: &str, b: &str) -> bool {
        !self.is_allied(a, b)
    }

    // === MUTATION (step execution only) ===

    fn alive_mut(&mut self, side: Side) -> &mut Vec<Unit> {
        match side {
            Side::Offense => &mut self.attacking_units,
            Side::Defense => &mut self.defending_units,
        }
    }

    fn waiting_mut(&mut self, side: Side) -> &mut Vec<Unit> {
        match side {
            Side::Offense => &mut self.attacking_waiting_to_die,
            Side::Defense => &mut self.defending_waiting_to_die,
        }
    }

    /// Take units with the given ids out of a side's alive list
    pub fn take_units(&mut self, side: Side, ids: &[UnitId]) -> Vec<Unit> {
        let alive = self.alive_mut(side);
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(alive.len());
        for unit in alive.drain(..) {
            if ids.contains(&unit.id) {
                taken.push(unit);
            } else {
                kept.push(unit);
            }
        }
        *alive = kept;
        taken
    }

    /// Killed units keep firing this round; they leave at the next removal step
    pub fn mark_casualties(&mut self, side: Side, ids: &[UnitId]) {
        let taken = self.take_units(side, ids);
        self.waiting_mut(side).extend(taken);
    }

    /// Each occurrence of an id in `damaged` is one more hit
    pub fn apply_damage(&mut self, side: Side, damaged: &[UnitId]) {
        for id in damaged {
            if let Some(unit) = self.alive_mut(side).iter_mut().find(|unit| unit.id == *id) {
                unit.hits += 1;
            }
        }
    }

    /// Remove every unit waiting to die on both sides
    pub fn remove_casualties(&mut self) -> Vec<Unit> {
        let mut removed: Vec<Unit> = self.attacking_waiting_to_die.drain(..).collect();
        removed.append(&mut self.defending_waiting_to_die);
        let dead: Vec<UnitId> = removed.iter().map(|unit| unit.id).collect();
        // Cargo dies with its transport
        let (lost_cargo, kept_cargo): (Vec<Unit>, Vec<Unit>) = self
            .dependent_units
            .drain(..)
            .partition(|unit| unit.transported_by.is_some_and(|t| dead.contains(&t)));
        self.dependent_units = kept_cargo;
        self.killed.extend(removed.iter().cloned());
        self.killed.extend(lost_cargo);
        removed
    }

    /// Kill outright, skipping the wait for the next removal step
    pub fn kill_units(&mut self, side: Side, ids: &[UnitId]) -> Vec<Unit> {
        let taken = self.take_units(side, ids);
        let (lost_cargo, kept_cargo): (Vec<Unit>, Vec<Unit>) = self
            .dependent_units
            .drain(..)
            .partition(|unit| unit.transported_by.is_some_and(|t| ids.contains(&t)));
        self.dependent_units = kept_cargo;
        self.killed.extend(taken.iter().cloned());
        self.killed.extend(lost_cargo);
        taken
    }

    pub fn submerge_units(&mut self, side: Side, ids: &[UnitId]) {
        let taken = self.take_units(side, ids);
        self.submerged.extend(taken);
    }

    pub fn retreat_units(&mut self, side: Side, ids: &[UnitId], destination: &str) {
        let taken = self.take_units(side, ids);
        self.retreated
            .extend(taken.into_iter().map(|unit| (unit, destination.to_string())));
    }

    /// Move the cargo of the given air transports into the attacking force
    pub fn land_paratroopers(&mut self, transports: &[UnitId]) -> usize {
        let (landing, staying): (Vec<Unit>, Vec<Unit>) = self
            .dependent_units
            .drain(..)
            .partition(|unit| unit.transported_by.is_some_and(|t| transports.contains(&t)));
        self.dependent_units = staying;
        let count = landing.len();
        self.attacking_units.extend(landing.into_iter().map(|mut unit| {
            unit.transported_by = None;
            unit
        }));
        count
    }

    pub fn end_battle(&mut self, who_won: WhoWon) {
        self.over = true;
        self.outcome = Some(who_won);
    }

    pub fn advance_round(&mut self) {
        self.round = self.round.max(1) + 1;
    }
}

/// Assembles a `BattleState`; unset fields get land-battle defaults
#[derive(Debug, Clone)]
pub struct BattleStateBuilder {
    state: BattleState,
}

impl BattleStateBuilder {
    pub fn new(attacker: GamePlayer, defender: GamePlayer) -> Self {
        Self {
            state: BattleState {
                attacker,
                defender,
                battle_site: Territory::land("battle site"),
                neighbors: Vec::new(),
                round: 1,
                max_rounds: 0,
                attacking_units: Vec::new(),
                defending_units: Vec::new(),
                bombarding_units: Vec::new(),
                dependent_units: Vec::new(),
                attacking_waiting_to_die: Vec::new(),
                defending_waiting_to_die: Vec::new(),
                amphibious: false,
                attacker_retreat_territories: Vec::new(),
                options: GameOptions::default(),
                over: false,
                outcome: None,
                killed: Vec::new(),
                submerged: Vec::new(),
                retreated: Vec::new(),
                alliances: AHashMap::new(),
            },
        }
    }

    pub fn with_battle_site(mut self, site: Territory) -> Self {
        self.state.battle_site = site;
        self
    }

    pub fn with_neighbors(mut self, neighbors: Vec<Territory>) -> Self {
        self.state.neighbors = neighbors;
        self
    }

    pub fn with_round(mut self, round: Round) -> Self {
        self.state.round = round;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: Round) -> Self {
        self.state.max_rounds = max_rounds;
        self
    }

    pub fn with_attacking_units(mut self, units: Vec<Unit>) -> Self {
        self.state.attacking_units = units;
        self
    }

    pub fn with_defending_units(mut self, units: Vec<Unit>) -> Self {
        self.state.defending_units = units;
        self
    }

    pub fn with_bombarding_units(mut self, units: Vec<Unit>) -> Self {
        self.state.bombarding_units = units;
        self
    }

    pub fn with_dependent_units(mut self, units: Vec<Unit>) -> Self {
        self.state.dependent_units = units;
        self
    }

    pub fn with_waiting_to_die(mut self, side: Side, units: Vec<Unit>) -> Self {
        match side {
            Side::Offense => self.state.attacking_waiting_to_die = units,
            Side::Defense => self.state.defending_waiting_to_die = units,
        }
        self
    }

    pub fn with_amphibious(mut self, amphibious: bool) -> Self {
        self.state.amphibious = amphibious;
        self
    }

    pub fn with_retreat_territories(mut self, territories: Vec<Territory>) -> Self {
        self.state.attacker_retreat_territories = territories;
        self
    }

    pub fn with_options(mut self, options: GameOptions) -> Self {
        self.state.options = options;
        self
    }

    pub fn with_over(mut self, over: bool) -> Self {
        self.state.over = over;
        self
    }

    /// Register a third party so alliance checks know about it
    pub fn with_player(mut self, player: &GamePlayer) -> Self {
        if let Some(alliance) = &player.alliance {
            self.state
                .alliances
                .insert(player.name.clone(), alliance.clone());
        }
        self
    }

    pub fn build(mut self) -> BattleState {
        for player in [self.state.attacker.clone(), self.state.defender.clone()] {
            self = self.with_player(&player);
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit::{UnitAttachment, UnitType};

    fn infantry(owner: &str) -> Unit {
        Unit::new(
            UnitType::shared(
                "infantry",
                UnitAttachment {
                    attack: 1,
                    defense: 2,
                    ..Default::default()
                },
            ),
            owner,
        )
    }

    fn builder() -> BattleStateBuilder {
        BattleStateBuilder::new(
            GamePlayer::new("Germans").with_alliance("Axis"),
            GamePlayer::new("Russians").with_alliance("Allies"),
        )
    }

    #[test]
    fn test_alliances() {
        let state = builder()
            .with_player(&GamePlayer::new("Italians").with_alliance("Axis"))
            .build();
        assert!(state.is_allied("Germans", "Italians"));
        assert!(state.is_at_war("Germans", "Russians"));
        assert!(state.is_allied("Neutral", "Neutral"));
        assert!(state.is_at_war("Neutral", "Germans"));
    }

    #[test]
    fn test_casualties_wait_then_leave() {
        let attacker = infantry("Germans");
        let id = attacker.id;
        let mut state = builder()
            .with_attacking_units(vec![attacker, infantry("Germans")])
            .build();

        state.mark_casualties(Side::Offense, &[id]);
        assert_eq!(state.alive(Side::Offense).len(), 1);
        assert_eq!(state.waiting_to_die(Side::Offense).len(), 1);
        assert_eq!(
            state
                .filter_units(UnitFilter::AliveOrCasualty, Side::Offense)
                .len(),
            2
        );

        let removed = state.remove_casualties();
        assert_eq!(removed.len(), 1);
        assert!(state.waiting_to_die(Side::Offense).is_empty());
        assert_eq!(state.killed.len(), 1);
    }

    #[test]
    fn test_land_paratroopers_moves_cargo() {
        let plane = infantry("Germans");
        let cargo = infantry("Germans").with_transported_by(plane.id);
        let stray = infantry("Germans").with_transported_by(UnitId::new());
        let mut state = builder()
            .with_attacking_units(vec![plane.clone()])
            .with_dependent_units(vec![cargo, stray])
            .build();

        assert_eq!(state.land_paratroopers(&[plane.id]), 1);
        assert_eq!(state.attacking_units.len(), 2);
        assert_eq!(state.dependent_units.len(), 1);
        assert!(state.attacking_units[1].transported_by.is_none());
    }

    #[test]
    fn test_effective_max_rounds_uses_site_kind() {
        let mut options = GameOptions::default();
        options.land_battle_rounds = 3;
        options.sea_battle_rounds = 5;
        let land = builder().with_options(options.clone()).build();
        let sea = builder()
            .with_options(options)
            .with_battle_site(Territory::sea("Baltic Sea"))
            .build();
        assert_eq!(land.effective_max_rounds(), 3);
        assert_eq!(sea.effective_max_rounds(), 5);
    }
}
