//! Short-lived heuristic predictions.
//!
//! Every prediction is a small additive rule over the patterns and today's
//! events. Nothing here is persisted; callers recompute on each read.

use serde::{Deserialize, Serialize};

use crate::analyzer::{quick_analyze, today_focus_minutes, QuickAnalysis};
use crate::clock::{Clock, MS_PER_HOUR, MS_PER_MINUTE};
use crate::events::{Event, EventKind};
use crate::memory::Memory;
use crate::numeric::{round_dp, round_half_up};
use crate::patterns::UserPatterns;
use crate::storage::BrainConfig;

/// Minutes after the last focus event during which a break is still useful.
const BREAK_WINDOW_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Creative,
    Routine,
    Break,
}

/// Snapshot of what the engine expects right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPredictions {
    pub is_good_time_for_work: bool,
    pub expected_tasks_today: u32,
    /// 0.0 to 1.0
    pub procrastination_risk: f64,
    /// Minutes until a break is advisable, if one is.
    pub suggested_break_in: Option<u32>,
    pub expected_mood_tonight: f64,
    pub should_eat_soon: bool,
    pub hydration_reminder: bool,
    pub energy_level: EnergyLevel,
    pub optimal_task_type: TaskType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    Productivity,
    Health,
    Mood,
    Habit,
    Procrastination,
}

/// An explainable prediction: what the engine thinks and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PredictionType,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub prediction: String,
    pub based_on: String,
}

pub fn predict(
    memory: &Memory,
    patterns: &UserPatterns,
    clock: &dyn Clock,
    config: &BrainConfig,
) -> CurrentPredictions {
    let hour = clock.hour();
    let quick = quick_analyze(memory, clock);
    let today = memory.today(clock);

    CurrentPredictions {
        is_good_time_for_work: is_good_time_for_work(hour, patterns),
        expected_tasks_today: expected_tasks_today(patterns, quick.today_task_count),
        procrastination_risk: procrastination_risk(patterns, hour, quick.today_task_count),
        suggested_break_in: suggested_break_in(memory, &today, clock, config),
        expected_mood_tonight: expected_mood_tonight(patterns, quick.last_mood, clock.day_of_week()),
        should_eat_soon: quick.hours_since_last_meal.is_some_and(|h| h > 4.0),
        hydration_reminder: hydration_reminder(&today, hour, clock.now_ms()),
        energy_level: energy_level(hour, patterns, quick.last_mood),
        optimal_task_type: optimal_task_type(hour, patterns, &quick),
    }
}

pub fn is_good_time_for_work(hour: u32, patterns: &UserPatterns) -> bool {
    if patterns.is_peak_hour(hour) {
        return true;
    }
    if patterns.is_low_hour(hour) {
        return false;
    }
    (9..=18).contains(&hour)
}

fn expected_tasks_today(patterns: &UserPatterns, done: usize) -> u32 {
    let done = done as f64;
    let remaining = (patterns.productivity.avg_tasks_per_day - done).max(0.0);
    round_half_up(done + remaining) as u32
}

/// Sum of 0.2 per risk factor present, capped at 1.
pub fn procrastination_risk(patterns: &UserPatterns, hour: u32, today_tasks: usize) -> f64 {
    let factors = [
        !patterns.productivity.avoided_categories.is_empty(),
        patterns.productivity.task_completion_rate < 0.5,
        patterns.productivity.avg_task_delay_days > 3.0,
        patterns.is_low_hour(hour),
        today_tasks == 0 && hour >= 14,
    ];
    let present = factors.iter().filter(|f| **f).count();
    round_dp(present as f64 * 0.2, 1).min(1.0)
}

fn suggested_break_in(
    memory: &Memory,
    today: &[&Event],
    clock: &dyn Clock,
    config: &BrainConfig,
) -> Option<u32> {
    let last_focus = today
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::PomodoroCompleted(_) | EventKind::TaskCompleted(_)
            )
        })
        .map(|e| e.timestamp)
        .max()?;

    let minutes_since = (clock.now_ms() - last_focus) as f64 / MS_PER_MINUTE as f64;
    let focused = today_focus_minutes(memory, clock);

    if focused >= config.thresholds.break_after_minutes && minutes_since < BREAK_WINDOW_MINUTES {
        Some(round_half_up(BREAK_WINDOW_MINUTES - minutes_since) as u32)
    } else {
        None
    }
}

fn expected_mood_tonight(patterns: &UserPatterns, last_mood: Option<f64>, weekday: u32) -> f64 {
    let mut predicted = patterns.mental.avg_mood;
    if let Some(mood) = last_mood {
        predicted = (predicted + mood) / 2.0;
    }
    if let Some(day_mood) = patterns.mental.mood_by_day.get(&weekday).filter(|m| **m > 0.0) {
        predicted = (predicted + day_mood) / 2.0;
    }
    round_dp(predicted, 1)
}

fn hydration_reminder(today: &[&Event], hour: u32, now_ms: i64) -> bool {
    let last_water = today
        .iter()
        .filter(|e| matches!(e.kind, EventKind::WaterAdded(_)))
        .map(|e| e.timestamp)
        .max();

    match last_water {
        None => hour >= 10,
        Some(ts) => (now_ms - ts) as f64 / MS_PER_HOUR as f64 > 2.0,
    }
}

/// Integer energy score (base 50) before bucketing.
pub fn energy_score(hour: u32, patterns: &UserPatterns, mood: Option<f64>) -> i32 {
    let mut score = 50;
    if patterns.is_peak_hour(hour) {
        score += 20;
    }
    if patterns.is_low_hour(hour) {
        score -= 20;
    }
    match mood {
        Some(m) if m >= 7.0 => score += 15,
        Some(m) if m <= 4.0 => score -= 15,
        _ => {}
    }
    // post-lunch dip
    if (13..=14).contains(&hour) {
        score -= 10;
    }
    if hour >= 18 {
        score -= 10;
    }
    score
}

pub fn energy_level(hour: u32, patterns: &UserPatterns, mood: Option<f64>) -> EnergyLevel {
    match energy_score(hour, patterns, mood) {
        s if s >= 60 => EnergyLevel::High,
        s if s <= 40 => EnergyLevel::Low,
        _ => EnergyLevel::Medium,
    }
}

fn optimal_task_type(hour: u32, patterns: &UserPatterns, quick: &QuickAnalysis) -> TaskType {
    let done = quick.today_task_count as f64;
    if done >= patterns.productivity.avg_tasks_per_day * 1.5 {
        return TaskType::Break;
    }
    if patterns.is_peak_hour(hour) {
        return TaskType::Creative;
    }
    if patterns.is_low_hour(hour) {
        return if quick.today_task_count < 2 {
            TaskType::Routine
        } else {
            TaskType::Break
        };
    }
    if hour < 12 {
        TaskType::Creative
    } else {
        TaskType::Routine
    }
}

/// Up to four explainable predictions for display.
pub fn generate_detailed_predictions(
    memory: &Memory,
    patterns: &UserPatterns,
    clock: &dyn Clock,
) -> Vec<Prediction> {
    let hour = clock.hour();
    let quick = quick_analyze(memory, clock);
    let mut predictions = Vec::new();

    if patterns.is_peak_hour(hour) {
        predictions.push(Prediction {
            id: "peak-hour".into(),
            kind: PredictionType::Productivity,
            confidence: 0.8,
            prediction: format!("This is one of your most productive hours ({hour}h)"),
            based_on: format!("You completed a lot of tasks around {hour}h recently"),
        });
    }

    let risk = procrastination_risk(patterns, hour, quick.today_task_count);
    if risk > 0.5 {
        let based_on = match patterns.productivity.avoided_categories.first() {
            Some(category) => format!("You tend to put off \"{category}\" tasks"),
            None => "Your recent completion rate is low".to_string(),
        };
        predictions.push(Prediction {
            id: "procrastination-risk".into(),
            kind: PredictionType::Procrastination,
            confidence: risk,
            prediction: "Focusing might be harder than usual".into(),
            based_on,
        });
    }

    if let Some(mood) = quick.last_mood.filter(|m| *m <= 4.0) {
        predictions.push(Prediction {
            id: "low-mood".into(),
            kind: PredictionType::Mood,
            confidence: 0.7,
            prediction: "Today might be a tough day".into(),
            based_on: format!("Your current mood is {mood}/10"),
        });
    }

    if patterns.habits.habit_completion_rate < 0.5 && !patterns.habits.struggling_habits.is_empty() {
        let percent = round_half_up(patterns.habits.habit_completion_rate * 100.0);
        predictions.push(Prediction {
            id: "habit-struggle".into(),
            kind: PredictionType::Habit,
            confidence: 0.6,
            prediction: "Some habits are hard to keep up".into(),
            based_on: format!("Completion rate of {percent}%"),
        });
    }

    predictions
}
