pub mod config;
pub mod error;
pub mod types;

pub use config::{GameOption, GameOptions};
pub use error::{BattleError, Result};
pub use types::{Side, UnitId};
