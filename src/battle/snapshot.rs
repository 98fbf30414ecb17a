//! Battle files
//!
//! A TOML or JSON description of one battle, resolved into a `BattleState`.
//! Unit types are declared once by name; units refer to them and may carry a
//! label so cargo can point at its transport.
//!
//! ```toml
//! [attacker]
//! name = "Germans"
//!
//! [defender]
//! name = "Russians"
//!
//! [site]
//! name = "Baltic Sea"
//! water = true
//!
//! [unit_types.submarine]
//! attack = 2
//! defense = 1
//! can_evade = true
//! is_sea = true
//!
//! [[attacking]]
//! type = "submarine"
//! count = 2
//! ```

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::state::{BattleState, BattleStateBuilder, GamePlayer, Territory};
use crate::battle::unit::{Unit, UnitAttachment, UnitType};
use crate::core::config::GameOptions;
use crate::core::error::{BattleError, Result};
use crate::core::types::{Round, UnitId};

fn default_count() -> u32 {
    1
}

fn default_round() -> Round {
    1
}

/// One entry of a unit list; `count` copies share every field except the label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    #[serde(rename = "type")]
    pub unit_type: String,
    /// Defaults to the side's player
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub was_amphibious: bool,
    /// Name other entries use in `transported_by`; only valid with `count = 1`
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub transported_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritorySpec {
    pub name: String,
    #[serde(default)]
    pub water: bool,
    /// Units already there, used to tell friendly from hostile neighbours
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub attacker: GamePlayer,
    pub defender: GamePlayer,
    /// Other players whose alliances matter
    #[serde(default)]
    pub players: Vec<GamePlayer>,
    pub site: TerritorySpec,
    #[serde(default)]
    pub neighbors: Vec<TerritorySpec>,
    /// Names of neighbours the attacker may retreat to
    #[serde(default)]
    pub retreat_territories: Vec<String>,
    #[serde(default = "default_round")]
    pub round: Round,
    #[serde(default)]
    pub max_rounds: Round,
    #[serde(default)]
    pub amphibious: bool,
    #[serde(default)]
    pub options: GameOptions,
    #[serde(default)]
    pub unit_types: AHashMap<String, UnitAttachment>,
    #[serde(default)]
    pub attacking: Vec<UnitSpec>,
    #[serde(default)]
    pub defending: Vec<UnitSpec>,
    #[serde(default)]
    pub bombarding: Vec<UnitSpec>,
    /// Cargo of transports, each entry naming its transport's label
    #[serde(default)]
    pub dependents: Vec<UnitSpec>,
}

impl BattleSnapshot {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load by extension: `.json` is JSON, anything else TOML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn into_state(self) -> Result<BattleState> {
        self.options.validate().map_err(BattleError::InvalidOption)?;
        let mut resolver = Resolver::new(&self);

        let attacking = resolver.units(&self.attacking, &self.attacker.name)?;
        let defending = resolver.units(&self.defending, &self.defender.name)?;
        let bombarding = resolver.units(&self.bombarding, &self.attacker.name)?;
        let neighbors = self
            .neighbors
            .iter()
            .map(|spec| resolver.territory(spec, &self.defender.name))
            .collect::<Result<Vec<_>>>()?;
        let dependents = resolver.units(&self.dependents, &self.attacker.name)?;
        let dependents = resolver.link_cargo(&self.dependents, dependents)?;

        let mut site = resolver.territory(&self.site, &self.defender.name)?;
        site.units.extend(attacking.iter().cloned());
        site.units.extend(defending.iter().cloned());

        let retreat_territories = self
            .retreat_territories
            .iter()
            .map(|name| {
                neighbors
                    .iter()
                    .find(|territory| territory.name == *name)
                    .cloned()
                    .ok_or_else(|| {
                        BattleError::InvalidSnapshot(format!(
                            "retreat territory {} is not a neighbour",
                            name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builder = BattleStateBuilder::new(self.attacker.clone(), self.defender.clone());
        for player in &self.players {
            builder = builder.with_player(player);
        }
        let state = builder
            .with_battle_site(site)
            .with_neighbors(neighbors)
            .with_retreat_territories(retreat_territories)
            .with_round(self.round)
            .with_max_rounds(self.max_rounds)
            .with_amphibious(self.amphibious)
            .with_options(self.options.clone())
            .with_attacking_units(attacking)
            .with_defending_units(defending)
            .with_bombarding_units(bombarding)
            .with_dependent_units(dependents)
            .build();

        debug!(
            site = %state.battle_site.name,
            attackers = state.attacking_units.len(),
            defenders = state.defending_units.len(),
            "snapshot loaded"
        );
        Ok(state)
    }
}

/// Shares unit types between units and tracks labels
struct Resolver<'a> {
    attachments: &'a AHashMap<String, UnitAttachment>,
    types: AHashMap<String, Arc<UnitType>>,
    labels: AHashMap<String, UnitId>,
    known_players: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn new(snapshot: &'a BattleSnapshot) -> Self {
        let mut known_players = vec![
            snapshot.attacker.name.as_str(),
            snapshot.defender.name.as_str(),
        ];
        known_players.extend(snapshot.players.iter().map(|player| player.name.as_str()));
        Self {
            attachments: &snapshot.unit_types,
            types: AHashMap::new(),
            labels: AHashMap::new(),
            known_players,
        }
    }

    fn unit_type(&mut self, name: &str) -> Result<Arc<UnitType>> {
        if let Some(unit_type) = self.types.get(name) {
            return Ok(unit_type.clone());
        }
        let attachment = self
            .attachments
            .get(name)
            .ok_or_else(|| BattleError::UnknownUnitType(name.to_string()))?;
        let unit_type = UnitType::shared(name, attachment.clone());
        self.types.insert(name.to_string(), unit_type.clone());
        Ok(unit_type)
    }

    fn units(&mut self, specs: &[UnitSpec], default_owner: &str) -> Result<Vec<Unit>> {
        let mut units = Vec::new();
        for spec in specs {
            let owner = spec.owner.as_deref().unwrap_or(default_owner);
            if !self.known_players.contains(&owner) {
                return Err(BattleError::UnknownPlayer(owner.to_string()));
            }
            if spec.label.is_some() && spec.count != 1 {
                return Err(BattleError::InvalidSnapshot(format!(
                    "labelled {} entry must have count = 1",
                    spec.unit_type
                )));
            }
            let unit_type = self.unit_type(&spec.unit_type)?;
            for _ in 0..spec.count {
                let unit = Unit::new(unit_type.clone(), owner)
                    .with_hits(spec.hits)
                    .with_was_amphibious(spec.was_amphibious);
                if let Some(label) = &spec.label {
                    if self.labels.insert(label.clone(), unit.id).is_some() {
                        return Err(BattleError::InvalidSnapshot(format!(
                            "duplicate label {}",
                            label
                        )));
                    }
                }
                units.push(unit);
            }
        }
        Ok(units)
    }

    fn territory(&mut self, spec: &TerritorySpec, default_owner: &str) -> Result<Territory> {
        let territory = if spec.water {
            Territory::sea(spec.name.clone())
        } else {
            Territory::land(spec.name.clone())
        };
        let units = self.units(&spec.units, default_owner)?;
        Ok(territory.with_units(units))
    }

    /// Point each cargo unit at its transport; runs after every label is known
    fn link_cargo(&self, specs: &[UnitSpec], mut units: Vec<Unit>) -> Result<Vec<Unit>> {
        let mut index = 0;
        for spec in specs {
            let transport = match &spec.transported_by {
                Some(label) => Some(*self.labels.get(label).ok_or_else(|| {
                    BattleError::InvalidSnapshot(format!("unknown transport label {}", label))
                })?),
                None => None,
            };
            for unit in &mut units[index..index + spec.count as usize] {
                unit.transported_by = transport;
            }
            index += spec.count as usize;
        }
        Ok(units)
    }
}
