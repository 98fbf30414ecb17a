//! Battle Steps - combat round sequencing for Axis & Allies style games

pub mod battle;
pub mod core;
