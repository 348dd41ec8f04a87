use iku_brain_core::wellbeing::{score_color, score_description, score_emoji, trend_emoji};
use serde_json::json;

use super::{open_brain, print_json, CommandResult};

pub fn patterns() -> CommandResult {
    let mut brain = open_brain()?;
    print_json(&brain.patterns())
}

pub fn quick() -> CommandResult {
    let mut brain = open_brain()?;
    print_json(&brain.quick())
}

pub fn predict(detailed: bool) -> CommandResult {
    let mut brain = open_brain()?;
    if detailed {
        print_json(&brain.detailed_predictions())
    } else {
        print_json(&brain.predictions())
    }
}

pub fn wellbeing(summary: bool) -> CommandResult {
    let mut brain = open_brain()?;
    let score = brain.wellbeing();
    if summary {
        println!(
            "{} {}/100 {} {} {}%",
            score_emoji(score.overall),
            score.overall,
            score_description(score.overall),
            trend_emoji(score.trend.direction),
            score.trend.percent
        );
        return Ok(());
    }
    print_json(&json!({
        "score": score,
        "description": score_description(score.overall),
        "color": score_color(score.overall),
    }))
}

pub fn suggestions() -> CommandResult {
    let mut brain = open_brain()?;
    print_json(&brain.suggestions())
}

pub fn welcome() -> CommandResult {
    let mut brain = open_brain()?;
    println!("{}", brain.welcome_message());
    Ok(())
}

pub fn evening() -> CommandResult {
    let mut brain = open_brain()?;
    println!("{}", brain.evening_message());
    Ok(())
}
