pub mod config;
pub mod insights;
pub mod memory;
pub mod record;

use iku_brain_core::{Brain, BrainConfig};
use serde::Serialize;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Open the engine with the on-disk configuration and store.
pub fn open_brain() -> Result<Brain, Box<dyn std::error::Error>> {
    let config = BrainConfig::load()?;
    Ok(Brain::open(config)?)
}

pub fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
