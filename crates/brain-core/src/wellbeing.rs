//! Composite 0-100 wellbeing score.
//!
//! Four sub-scores of 0-25 each are summed. The health sub-score is kept in
//! the breakdown for layout compatibility but always reads 0.

use serde::{Deserialize, Serialize};

use crate::analyzer::{last_mood, today_focus_minutes};
use crate::clock::Clock;
use crate::events::EventKind;
use crate::memory::{Memory, ScoreEntry};
use crate::numeric::{mean, round_half_up};
use crate::patterns::UserPatterns;

/// Upper bound of every sub-score.
pub const MAX_SUB_SCORE: u32 = 25;

/// Daily focus target in minutes.
const FOCUS_GOAL_MINUTES: f64 = 120.0;

/// Score-history entries needed before a trend is reported.
const MIN_TREND_ENTRIES: usize = 3;

/// Points of change in the weekly mean before the trend moves off `stable`.
const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellbeingScore {
    /// 0 to 100
    pub overall: u32,
    pub breakdown: Breakdown,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub productivity: u32,
    /// Deprecated, always 0.
    pub health: u32,
    pub mental: u32,
    pub consistency: u32,
}

impl Breakdown {
    pub fn total(&self) -> u32 {
        self.productivity + self.health + self.mental + self.consistency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Magnitude of the change, in percent of the older weekly mean.
    pub percent: u32,
}

impl Trend {
    pub const STABLE: Trend = Trend {
        direction: TrendDirection::Stable,
        percent: 0,
    };
}

pub fn calculate(memory: &Memory, patterns: &UserPatterns, clock: &dyn Clock) -> WellbeingScore {
    let breakdown = Breakdown {
        productivity: productivity_score(memory, patterns, clock),
        health: 0,
        mental: mental_score(memory, patterns, clock),
        consistency: consistency_score(memory, patterns, clock),
    };
    WellbeingScore {
        overall: breakdown.total(),
        breakdown,
        trend: trend(&memory.score_history),
    }
}

fn clamp_sub_score(raw: f64) -> u32 {
    round_half_up(raw).clamp(0.0, f64::from(MAX_SUB_SCORE)) as u32
}

fn today_count(memory: &Memory, clock: &dyn Clock, pred: impl Fn(&EventKind) -> bool) -> usize {
    memory.today(clock).into_iter().filter(|e| pred(&e.kind)).count()
}

// ── Productivity ─────────────────────────────────────────────────────

pub fn productivity_score(memory: &Memory, patterns: &UserPatterns, clock: &dyn Clock) -> u32 {
    let tasks = today_count(memory, clock, EventKind::is_task_completed);
    let focus = today_focus_minutes(memory, clock);
    clamp_sub_score(
        task_term(tasks, patterns.productivity.avg_tasks_per_day)
            + focus_term(focus)
            + patterns.productivity.task_completion_rate * 5.0,
    )
}

/// 0-10 points for today's completed tasks against the daily average.
pub fn task_term(today_tasks: usize, avg_tasks_per_day: f64) -> f64 {
    if avg_tasks_per_day > 0.0 {
        (today_tasks as f64 / avg_tasks_per_day).min(1.0) * 10.0
    } else if today_tasks > 0 {
        5.0
    } else {
        0.0
    }
}

/// 0-10 points for today's focus minutes against a two hour goal.
pub fn focus_term(focus_minutes: f64) -> f64 {
    (focus_minutes / FOCUS_GOAL_MINUTES).clamp(0.0, 1.0) * 10.0
}

// ── Mental ───────────────────────────────────────────────────────────

pub fn mental_score(memory: &Memory, patterns: &UserPatterns, clock: &dyn Clock) -> u32 {
    let today = memory.today(clock);
    let avg_mood = patterns.mental.avg_mood;

    let current = last_mood(today.iter().copied())
        .unwrap_or(if avg_mood > 0.0 { avg_mood } else { 5.0 });

    let journaled = if today
        .iter()
        .any(|e| matches!(e.kind, EventKind::JournalWritten(_)))
    {
        5.0
    } else {
        0.0
    };

    let recent = if avg_mood >= 7.0 {
        5.0
    } else if avg_mood >= 5.0 {
        3.0
    } else {
        1.0
    };

    let correlation = patterns.correlations.mood_productivity;
    let linked = if correlation > 0.3 {
        5.0
    } else if correlation > 0.0 {
        2.0
    } else {
        0.0
    };

    clamp_sub_score(current + journaled + recent + linked)
}

// ── Consistency ──────────────────────────────────────────────────────

pub fn consistency_score(memory: &Memory, patterns: &UserPatterns, clock: &dyn Clock) -> u32 {
    let checked = today_count(memory, clock, |k| matches!(k, EventKind::HabitChecked(_)));
    let habits_today = match checked {
        0 => 0.0,
        1 => 4.0,
        2 => 7.0,
        _ => 10.0,
    };

    let journal = match patterns.mental.journal_frequency {
        0 => 0.0,
        1..=2 => 1.0,
        3..=4 => 3.0,
        _ => 5.0,
    };

    clamp_sub_score(habits_today + patterns.habits.habit_completion_rate * 10.0 + journal)
}

// ── Trend ────────────────────────────────────────────────────────────

/// Compare the mean of the last seven scores with the seven before them.
pub fn trend(history: &[ScoreEntry]) -> Trend {
    if history.len() < MIN_TREND_ENTRIES {
        return Trend::STABLE;
    }

    let split = history.len().saturating_sub(7);
    let recent: Vec<f64> = history[split..].iter().map(|s| f64::from(s.score)).collect();
    let older: Vec<f64> = history[split.saturating_sub(7)..split]
        .iter()
        .map(|s| f64::from(s.score))
        .collect();

    let (Some(recent_avg), Some(older_avg)) = (mean(&recent), mean(&older)) else {
        return Trend::STABLE;
    };

    let diff = recent_avg - older_avg;
    let percent = if older_avg > 0.0 {
        round_half_up(diff.abs() / older_avg * 100.0) as u32
    } else {
        0
    };
    let direction = if diff > TREND_THRESHOLD {
        TrendDirection::Improving
    } else if diff < -TREND_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Trend { direction, percent }
}

// ── Display helpers ──────────────────────────────────────────────────

pub fn score_description(score: u32) -> &'static str {
    match score {
        80.. => "Excellent! You're on top of things.",
        60..=79 => "Good! Keep it up.",
        40..=59 => "Okay. A few tweaks could help.",
        20..=39 => "Could be better. Take care of yourself.",
        _ => "Tough day. Tomorrow is another day.",
    }
}

pub fn score_color(score: u32) -> &'static str {
    match score {
        80.. => "#10b981",
        60..=79 => "#6366f1",
        40..=59 => "#f59e0b",
        20..=39 => "#f97316",
        _ => "#ef4444",
    }
}

pub fn score_emoji(score: u32) -> &'static str {
    match score {
        80.. => "🌟",
        60..=79 => "😊",
        40..=59 => "🙂",
        20..=39 => "😐",
        // supportive, never negative
        _ => "💙",
    }
}

pub fn trend_emoji(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Improving => "📈",
        TrendDirection::Declining => "📉",
        TrendDirection::Stable => "➡️",
    }
}
