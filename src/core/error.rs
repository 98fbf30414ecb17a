use thiserror::Error;

use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Step executed out of order: {0}")]
    StepOutOfOrder(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
