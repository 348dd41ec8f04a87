//! Pattern analysis over the retained event window.
//!
//! Every metric is a plain aggregate over the events in memory, so each
//! pattern can be explained by pointing at the events behind it. Calendar
//! buckets (day, hour, weekday) use the clock's UTC offset.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{FixedOffset, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{date_of, Clock, MS_PER_DAY, MS_PER_HOUR};
use crate::events::{Event, EventKind, DEFAULT_FOCUS_MINUTES};
use crate::memory::Memory;
use crate::numeric::{mean, pearson, round_dp, round_half_up};
use crate::patterns::*;
use crate::storage::BrainConfig;

/// Minutes of study credited per course message.
const MINUTES_PER_COURSE_MESSAGE: f64 = 2.0;

/// Days with both a mood and a completed task needed for a correlation.
const MIN_CORRELATION_DAYS: usize = 5;

/// Derive patterns from the event window.
///
/// With fewer than `config.min_events_for_analysis` events the previous
/// patterns are returned unchanged.
pub fn analyze(memory: &Memory, clock: &dyn Clock, config: &BrainConfig) -> UserPatterns {
    let events = &memory.events;
    if events.len() < config.min_events_for_analysis {
        debug!(
            events = events.len(),
            needed = config.min_events_for_analysis,
            "not enough events, keeping previous patterns"
        );
        return memory.patterns.clone();
    }

    let offset = clock.offset();
    let patterns = UserPatterns {
        temporal: temporal(events, offset),
        productivity: productivity(events, offset),
        health: health(events, offset),
        mental: mental(events, offset),
        habits: habits(events),
        learning: learning(events, offset),
        correlations: correlations(events, offset),
    };
    info!(events = events.len(), "patterns analyzed");
    patterns
}

// ── Temporal ─────────────────────────────────────────────────────────

fn temporal(events: &[Event], offset: FixedOffset) -> TemporalPatterns {
    let mut by_hour: BTreeMap<u32, usize> = (0..24).map(|h| (h, 0)).collect();
    let mut by_day: BTreeMap<u32, usize> = (0..7).map(|d| (d, 0)).collect();

    for event in events {
        match &event.kind {
            EventKind::TaskCompleted(_) => {
                *by_hour.entry(event.hour(offset)).or_default() += 1;
                *by_day.entry(event.day_of_week(offset)).or_default() += 1;
            }
            EventKind::PomodoroCompleted(_) => {
                *by_hour.entry(event.hour(offset)).or_default() += 1;
            }
            _ => {}
        }
    }

    let peak_hours = top_keys(&by_hour, 3);
    let best_days = top_keys(&by_day, 3);

    let mut waking: Vec<(u32, usize)> = by_hour
        .iter()
        .filter(|(h, _)| (6..=23).contains(*h))
        .map(|(h, c)| (*h, *c))
        .collect();
    waking.sort_by_key(|(_, count)| *count);
    let low_hours: Vec<u32> = waking.into_iter().take(3).map(|(h, _)| h).collect();

    let open_hours: Vec<f64> = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::AppOpened(_)))
        .map(|e| f64::from(e.hour(offset)))
        .collect();
    let start = mean(&open_hours).map_or(9, |h| round_half_up(h) as u32);

    TemporalPatterns {
        peak_hours: or_default(peak_hours, &DEFAULT_PEAK_HOURS),
        low_hours: or_default(low_hours, &DEFAULT_LOW_HOURS),
        best_days: or_default(best_days, &DEFAULT_BEST_DAYS),
        average_session_start: start,
        average_session_end: start + 9,
    }
}

/// Up to `n` keys with the highest non-zero counts. Ties keep key order.
fn top_keys(counts: &BTreeMap<u32, usize>, n: usize) -> Vec<u32> {
    let mut ranked: Vec<(u32, usize)> = counts.iter().map(|(k, c)| (*k, *c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(n)
        .filter(|(_, count)| *count > 0)
        .map(|(k, _)| k)
        .collect()
}

fn or_default(values: Vec<u32>, default: &[u32]) -> Vec<u32> {
    if values.is_empty() {
        default.to_vec()
    } else {
        values
    }
}

// ── Productivity ─────────────────────────────────────────────────────

fn productivity(events: &[Event], offset: FixedOffset) -> ProductivityPatterns {
    let mut created: Vec<(&str, i64)> = Vec::new();
    let mut completed: Vec<(&str, i64)> = Vec::new();
    let mut created_by_category: IndexMap<String, usize> = IndexMap::new();
    let mut completed_by_category: IndexMap<String, usize> = IndexMap::new();
    let mut focus_minutes: Vec<f64> = Vec::new();

    for event in events {
        match &event.kind {
            EventKind::TaskCreated(t) => {
                created.push((t.id.as_str(), event.timestamp));
                *created_by_category
                    .entry(category_or_work(t.category.as_deref()))
                    .or_default() += 1;
            }
            EventKind::TaskCompleted(t) => {
                completed.push((t.id.as_str(), event.timestamp));
                *completed_by_category
                    .entry(category_or_work(t.category.as_deref()))
                    .or_default() += 1;
            }
            EventKind::PomodoroCompleted(p) => focus_minutes.push(p.minutes()),
            _ => {}
        }
    }

    let days = distinct_days(events.iter(), offset);
    let avg_tasks_per_day = if days.is_empty() {
        0.0
    } else {
        round_dp(completed.len() as f64 / days.len() as f64, 1)
    };

    let avg_focus_duration_minutes = mean(&focus_minutes)
        .map_or(DEFAULT_FOCUS_MINUTES, round_half_up);

    let mut ranked: Vec<(&String, &usize)> = completed_by_category.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    let preferred_categories = ranked.into_iter().take(3).map(|(c, _)| c.clone()).collect();

    let avoided_categories = created_by_category
        .iter()
        .filter(|(category, count)| {
            let done = completed_by_category.get(*category).copied().unwrap_or(0);
            **count > 2 && (done as f64 / **count as f64) < 0.3
        })
        .map(|(category, _)| category.clone())
        .collect();

    let task_completion_rate = if created.is_empty() {
        0.0
    } else {
        round_dp(completed.len() as f64 / created.len() as f64, 2).min(1.0)
    };

    let avg_task_delay_days = if completed.is_empty() {
        0.0
    } else {
        let total_days: f64 = completed
            .iter()
            .filter_map(|(id, done_at)| {
                created
                    .iter()
                    .find(|(created_id, _)| created_id == id)
                    .map(|(_, created_at)| (done_at - created_at) as f64 / MS_PER_DAY as f64)
            })
            .sum();
        round_half_up(total_days / completed.len() as f64)
    };

    ProductivityPatterns {
        avg_tasks_per_day,
        avg_focus_duration_minutes,
        preferred_categories,
        avoided_categories,
        task_completion_rate,
        avg_task_delay_days,
    }
}

fn category_or_work(category: Option<&str>) -> String {
    match category {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => "work".to_string(),
    }
}

fn distinct_days<'a>(events: impl Iterator<Item = &'a Event>, offset: FixedOffset) -> BTreeSet<NaiveDate> {
    events.map(|e| date_of(e.timestamp, offset)).collect()
}

// ── Health ───────────────────────────────────────────────────────────

fn health(events: &[Event], offset: FixedOffset) -> HealthPatterns {
    let mut breakfast = Vec::new();
    let mut lunch = Vec::new();
    let mut dinner = Vec::new();
    let mut calories_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut weights: Vec<(i64, f64)> = Vec::new();

    for event in events {
        match &event.kind {
            EventKind::MealAdded(meal) => {
                let hour = f64::from(event.hour(offset));
                match meal.meal_type.as_deref() {
                    Some("breakfast") => breakfast.push(hour),
                    Some("lunch") => lunch.push(hour),
                    Some("dinner") => dinner.push(hour),
                    _ => {}
                }
                *calories_by_day
                    .entry(date_of(event.timestamp, offset))
                    .or_default() += meal.calories;
            }
            EventKind::WeightAdded(w) => weights.push((event.timestamp, w.weight)),
            _ => {}
        }
    }

    let daily: Vec<f64> = calories_by_day.into_values().collect();
    let avg_calories_per_day = mean(&daily).map_or(0.0, round_half_up);

    weights.sort_by_key(|(ts, _)| *ts);
    let weight_trend = match (weights.first(), weights.last()) {
        (Some((_, first)), Some((_, last))) if weights.len() >= 2 => {
            let diff = last - first;
            if diff < -0.5 {
                WeightTrend::Losing
            } else if diff > 0.5 {
                WeightTrend::Gaining
            } else {
                WeightTrend::Stable
            }
        }
        _ => WeightTrend::Stable,
    };

    HealthPatterns {
        meal_times: MealTimes {
            breakfast: meal_time(&breakfast),
            lunch: meal_time(&lunch),
            dinner: meal_time(&dinner),
        },
        avg_calories_per_day,
        weight_trend,
    }
}

fn meal_time(hours: &[f64]) -> Option<String> {
    mean(hours).map(|h| format!("{:02}:00", round_half_up(h) as u32))
}

// ── Mental ───────────────────────────────────────────────────────────

fn mental(events: &[Event], offset: FixedOffset) -> MentalPatterns {
    let mut moods = Vec::new();
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();

    for event in events {
        if let Some(mood) = event.mood() {
            moods.push(mood);
            by_hour.entry(event.hour(offset)).or_default().push(mood);
            by_day.entry(event.day_of_week(offset)).or_default().push(mood);
        }
    }

    let journal_days = distinct_days(
        events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::JournalWritten(_))),
        offset,
    );

    MentalPatterns {
        avg_mood: mean(&moods).map_or(DEFAULT_MOOD, |m| round_dp(m, 1)),
        mood_by_hour: bucket_means(by_hour),
        mood_by_day: bucket_means(by_day),
        journal_frequency: journal_days.len().min(7) as u32,
    }
}

fn bucket_means(buckets: BTreeMap<u32, Vec<f64>>) -> BTreeMap<u32, f64> {
    buckets
        .into_iter()
        .filter_map(|(key, values)| mean(&values).map(|m| (key, round_dp(m, 1))))
        .collect()
}

// ── Habits ───────────────────────────────────────────────────────────

#[derive(Default)]
struct HabitTally {
    checked: usize,
    total: usize,
}

impl HabitTally {
    fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.checked as f64 / self.total as f64
        }
    }
}

fn habits(events: &[Event]) -> HabitPatterns {
    let mut tallies: IndexMap<&str, HabitTally> = IndexMap::new();
    let mut checked = 0usize;
    let mut unchecked = 0usize;

    for event in events {
        match &event.kind {
            EventKind::HabitChecked(h) => {
                checked += 1;
                let tally = tallies.entry(h.habit_id.as_str()).or_default();
                tally.checked += 1;
                tally.total += 1;
            }
            EventKind::HabitUnchecked(h) => {
                unchecked += 1;
                tallies.entry(h.habit_id.as_str()).or_default().total += 1;
            }
            _ => {}
        }
    }

    let total = checked + unchecked;
    let habit_completion_rate = if total == 0 {
        0.0
    } else {
        round_dp(checked as f64 / total as f64, 2)
    };

    let mut tracked: Vec<(&str, f64)> = tallies
        .iter()
        .filter(|(_, t)| t.total >= 3)
        .map(|(id, t)| (*id, t.rate()))
        .collect();

    tracked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let most_consistent_habits = tracked.iter().take(3).map(|(id, _)| id.to_string()).collect();

    let mut struggling: Vec<(&str, f64)> = tracked.into_iter().filter(|(_, r)| *r < 0.5).collect();
    struggling.sort_by(|a, b| a.1.total_cmp(&b.1));
    let struggling_habits = struggling.into_iter().take(3).map(|(id, _)| id.to_string()).collect();

    HabitPatterns {
        habit_completion_rate,
        most_consistent_habits,
        struggling_habits,
    }
}

// ── Learning ─────────────────────────────────────────────────────────

fn learning(events: &[Event], offset: FixedOffset) -> LearningPatterns {
    let mut minutes_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, usize> = BTreeMap::new();

    for event in events.iter().filter(|e| matches!(e.kind, EventKind::CourseMessage(_))) {
        *minutes_by_day
            .entry(date_of(event.timestamp, offset))
            .or_default() += MINUTES_PER_COURSE_MESSAGE;
        *by_hour.entry(event.hour(offset)).or_default() += 1;
    }

    let daily: Vec<f64> = minutes_by_day.into_values().collect();
    let defaults = LearningPatterns::default();

    LearningPatterns {
        avg_study_duration_minutes: mean(&daily)
            .map_or(defaults.avg_study_duration_minutes, round_half_up),
        preferred_learning_hour: top_keys(&by_hour, 1)
            .first()
            .copied()
            .unwrap_or(defaults.preferred_learning_hour),
    }
}

// ── Correlations ─────────────────────────────────────────────────────

#[derive(Default)]
struct DayTally {
    moods: Vec<f64>,
    tasks: usize,
}

fn correlations(events: &[Event], offset: FixedOffset) -> Correlations {
    let mut days: BTreeMap<NaiveDate, DayTally> = BTreeMap::new();
    for event in events {
        let day = days.entry(date_of(event.timestamp, offset)).or_default();
        if let Some(mood) = event.mood() {
            day.moods.push(mood);
        }
        if event.kind.is_task_completed() {
            day.tasks += 1;
        }
    }

    let (moods, tasks): (Vec<f64>, Vec<f64>) = days
        .values()
        .filter(|d| d.tasks > 0)
        .filter_map(|d| mean(&d.moods).map(|m| (m, d.tasks as f64)))
        .unzip();

    let mood_productivity = if moods.len() >= MIN_CORRELATION_DAYS {
        pearson(&moods, &tasks).map_or(0.0, |r| round_dp(r, 2))
    } else {
        0.0
    };

    Correlations {
        mood_productivity,
        sleep_productivity: 0.0,
        exercise_energy: 0.0,
    }
}

// ── Quick path ───────────────────────────────────────────────────────

/// Cheap snapshot of the current moment, computed without a full analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAnalysis {
    /// Completed tasks in the window recorded at the current hour.
    pub current_hour_productivity: usize,
    pub today_task_count: usize,
    pub last_mood: Option<f64>,
    pub hours_since_last_meal: Option<f64>,
}

pub fn quick_analyze(memory: &Memory, clock: &dyn Clock) -> QuickAnalysis {
    let offset = clock.offset();
    let hour = clock.hour();
    let now_ms = clock.now_ms();

    let current_hour_productivity = memory
        .events
        .iter()
        .filter(|e| e.kind.is_task_completed() && e.hour(offset) == hour)
        .count();

    let today_task_count = memory
        .today(clock)
        .into_iter()
        .filter(|e| e.kind.is_task_completed())
        .count();

    QuickAnalysis {
        current_hour_productivity,
        today_task_count,
        last_mood: last_mood(&memory.events),
        hours_since_last_meal: memory
            .by_type("meal:added")
            .map(|e| e.timestamp)
            .max()
            .map(|ts| round_dp((now_ms - ts) as f64 / MS_PER_HOUR as f64, 1)),
    }
}

/// Minutes of completed pomodoros recorded today.
pub fn today_focus_minutes(memory: &Memory, clock: &dyn Clock) -> f64 {
    memory
        .today(clock)
        .into_iter()
        .filter_map(|e| e.kind.focus_minutes())
        .sum()
}

/// Mood of the most recent mood or journal-with-mood event.
pub fn last_mood<'a>(events: impl IntoIterator<Item = &'a Event>) -> Option<f64> {
    events
        .into_iter()
        .filter_map(|e| e.mood().map(|m| (e.timestamp, m)))
        .fold(None, |latest: Option<(i64, f64)>, (ts, mood)| match latest {
            Some((best, _)) if best > ts => latest,
            _ => Some((ts, mood)),
        })
        .map(|(_, mood)| mood)
}
