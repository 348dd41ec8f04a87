use std::collections::BTreeMap;

use serde_json::json;

use super::{open_brain, print_json, CommandResult};

pub fn analyze() -> CommandResult {
    let mut brain = open_brain()?;
    let score = brain.analyze();
    print_json(&score)
}

pub fn dismiss(id: &str) -> CommandResult {
    let mut brain = open_brain()?;
    brain.dismiss(id);
    println!("dismissed: {id}");
    Ok(())
}

pub fn show(summary: bool) -> CommandResult {
    let mut brain = open_brain()?;
    let memory = brain.memory();
    if !summary {
        return print_json(memory);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &memory.events {
        *counts.entry(event.tag()).or_default() += 1;
    }
    print_json(&json!({
        "events": memory.events.len(),
        "byType": counts,
        "scores": memory.score_history.len(),
        "dismissed": memory.dismissed_suggestion_ids,
        "lastFullAnalysisTimestamp": memory.last_full_analysis_timestamp,
        "schemaVersion": memory.schema_version,
    }))
}

pub fn reset() -> CommandResult {
    let mut brain = open_brain()?;
    brain.reset();
    println!("memory reset");
    Ok(())
}
