//! Ranked, dismissible suggestions and short personal messages.
//!
//! Suggestions never blame: they encourage, propose gently, celebrate small
//! wins and forgive missed habits. Each rule has a stable id (optionally
//! suffixed with the hour or a count) so a dismissal sticks for as long as
//! the same situation lasts.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analyzer::today_focus_minutes;
use crate::clock::Clock;
use crate::events::EventKind;
use crate::memory::Memory;
use crate::patterns::{UserPatterns, WeightTrend};
use crate::predictor::{CurrentPredictions, TaskType};
use crate::storage::BrainConfig;

/// Most suggestions listed after the current one.
const MAX_UPCOMING: usize = 3;
const MAX_ACHIEVEMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Encouraging,
    Gentle,
    Celebratory,
    Supportive,
}

/// Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Productivity,
    Health,
    Mental,
    Habit,
    Break,
    Celebration,
}

/// Optional call to action. `action_token` is `navigate:<view>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actionable {
    pub label: String,
    pub action_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub message: String,
    pub tone: Tone,
    pub priority: Priority,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actionable: Option<Actionable>,
}

impl Suggestion {
    fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        tone: Tone,
        priority: Priority,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            tone,
            priority,
            category,
            actionable: None,
        }
    }

    fn navigate(mut self, label: &str, view: &str) -> Self {
        self.actionable = Some(Actionable {
            label: label.to_string(),
            action_token: format!("navigate:{view}"),
        });
        self
    }

    fn celebration(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, message, Tone::Celebratory, Priority::Low, Category::Celebration)
    }
}

/// Suggestions split by when they matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextualSuggestions {
    pub now: Option<Suggestion>,
    pub upcoming: Vec<Suggestion>,
    pub achievements: Vec<Suggestion>,
}

/// Facts about today shared by every rule.
struct Today {
    hour: u32,
    tasks: usize,
    habit_checks: usize,
    journaled: bool,
    /// Mood of the latest mood or journal event today, if it carried one.
    latest_mood: Option<f64>,
}

impl Today {
    fn collect(memory: &Memory, clock: &dyn Clock) -> Self {
        let events = memory.today(clock);
        let latest_mood = events
            .iter()
            .filter(|e| e.kind.is_mood_or_journal())
            .max_by_key(|e| e.timestamp)
            .and_then(|e| e.mood());
        Self {
            hour: clock.hour(),
            tasks: events.iter().filter(|e| e.kind.is_task_completed()).count(),
            habit_checks: events
                .iter()
                .filter(|e| matches!(e.kind, EventKind::HabitChecked(_)))
                .count(),
            journaled: events
                .iter()
                .any(|e| matches!(e.kind, EventKind::JournalWritten(_))),
            latest_mood,
        }
    }
}

pub fn generate(
    memory: &Memory,
    patterns: &UserPatterns,
    predictions: &CurrentPredictions,
    clock: &dyn Clock,
    config: &BrainConfig,
) -> ContextualSuggestions {
    let today = Today::collect(memory, clock);

    let mut all: Vec<Suggestion> = productivity(&today, patterns, predictions)
        .into_iter()
        .chain(health(&today, patterns, predictions))
        .chain(mental(&today, patterns, config))
        .chain(celebrations(&today, patterns, config))
        .filter(|s| !memory.is_dismissed(&s.id))
        .collect();

    // stable: rule order is kept within a priority
    all.sort_by_key(|s| s.priority);

    let (achievements, mut others): (Vec<_>, Vec<_>) = all
        .into_iter()
        .partition(|s| s.category == Category::Celebration);

    let now = if others.is_empty() {
        None
    } else {
        Some(others.remove(0))
    };
    others.truncate(MAX_UPCOMING);

    ContextualSuggestions {
        now,
        upcoming: others,
        achievements: achievements.into_iter().take(MAX_ACHIEVEMENTS).collect(),
    }
}

fn productivity(
    today: &Today,
    patterns: &UserPatterns,
    predictions: &CurrentPredictions,
) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let hour = today.hour;

    if predictions.is_good_time_for_work && (today.tasks as f64) < patterns.productivity.avg_tasks_per_day {
        out.push(
            Suggestion::new(
                format!("peak-hour-{hour}"),
                "This is one of your most productive hours! Perfect for an important task.",
                Tone::Encouraging,
                Priority::Medium,
                Category::Productivity,
            )
            .navigate("See my tasks", "tasks"),
        );
    }

    if predictions.suggested_break_in.is_some_and(|m| m <= 10) {
        out.push(Suggestion::new(
            format!("break-soon-{hour}"),
            "You've been working for a while. A short break would do you good! ☕",
            Tone::Gentle,
            Priority::Medium,
            Category::Break,
        ));
    }

    if predictions.optimal_task_type == TaskType::Creative && today.tasks == 0 {
        out.push(Suggestion::new(
            format!("creative-time-{hour}"),
            "Your energy is high! Ideal for tasks that need some deep thinking.",
            Tone::Encouraging,
            Priority::Low,
            Category::Productivity,
        ));
    }

    if predictions.procrastination_risk > 0.6 {
        if let Some(avoided) = patterns.productivity.avoided_categories.first() {
            out.push(
                Suggestion::new(
                    "procrastination-gentle",
                    format!(
                        "The \"{avoided}\" tasks have been waiting a while. Maybe just 5 minutes on one?"
                    ),
                    Tone::Gentle,
                    Priority::Low,
                    Category::Productivity,
                )
                .navigate("Start small", "tasks"),
            );
        }
    }

    out
}

fn health(
    today: &Today,
    patterns: &UserPatterns,
    predictions: &CurrentPredictions,
) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let hour = today.hour;

    if predictions.should_eat_soon {
        let meal = match hour {
            0..=10 => "breakfast",
            11..=14 => "lunch",
            15..=19 => "snack",
            _ => "dinner",
        };
        out.push(
            Suggestion::new(
                format!("meal-reminder-{hour}"),
                format!("You haven't eaten in a while. A {meal} would do you good! 🍽️"),
                Tone::Gentle,
                Priority::Medium,
                Category::Health,
            )
            .navigate("Add a meal", "health"),
        );
    }

    if predictions.hydration_reminder {
        out.push(Suggestion::new(
            format!("water-reminder-{hour}"),
            "Don't forget to drink some water! 💧",
            Tone::Gentle,
            Priority::Low,
            Category::Health,
        ));
    }

    if patterns.health.weight_trend == WeightTrend::Losing {
        out.push(Suggestion::new(
            "weight-progress",
            "Your weight trend is heading the right way, keep it up! 📉",
            Tone::Celebratory,
            Priority::Low,
            Category::Health,
        ));
    }

    out
}

fn mental(today: &Today, patterns: &UserPatterns, config: &BrainConfig) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if today
        .latest_mood
        .is_some_and(|m| m <= config.thresholds.low_mood)
    {
        out.push(Suggestion::new(
            "low-mood-support",
            "Rough day? That's okay, it happens. Take care of yourself. 💙",
            Tone::Supportive,
            Priority::High,
            Category::Mental,
        ));
    }

    if !today.journaled && today.hour >= 20 {
        out.push(
            Suggestion::new(
                "journal-evening",
                "A moment for yourself? Writing a few words can help you unwind.",
                Tone::Gentle,
                Priority::Low,
                Category::Mental,
            )
            .navigate("Open journal", "myday"),
        );
    }

    if !patterns.habits.struggling_habits.is_empty() && patterns.habits.habit_completion_rate < 0.5 {
        out.push(Suggestion::new(
            "habit-forgiveness",
            "Habits are hard. Every small step counts, even an imperfect one. 🌱",
            Tone::Supportive,
            Priority::Low,
            Category::Habit,
        ));
    }

    out
}

fn celebrations(today: &Today, patterns: &UserPatterns, config: &BrainConfig) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let tasks = today.tasks;
    let avg = patterns.productivity.avg_tasks_per_day;

    if tasks >= config.thresholds.celebrate_after_tasks {
        out.push(Suggestion::celebration(
            format!("celebrate-tasks-{tasks}"),
            format!("🎉 {tasks} tasks today! You're doing great!"),
        ));
    }

    if avg > 0.0 && tasks as f64 >= avg {
        out.push(Suggestion::celebration(
            "daily-goal-reached",
            "🏆 Daily goal reached! You can be proud.",
        ));
    }

    if today.habit_checks >= 3 {
        out.push(Suggestion::celebration(
            "habits-done",
            "✨ All your habits are checked! Well done!",
        ));
    }

    if patterns.correlations.mood_productivity > 0.5 {
        out.push(Suggestion::celebration(
            "mood-productivity-correlation",
            "📈 When you feel good, you get a lot done! Keep taking care of yourself.",
        ));
    }

    if patterns.mental.journal_frequency >= 5 {
        out.push(Suggestion::celebration(
            "journal-streak",
            "📝 You write in your journal regularly. That's a great habit!",
        ));
    }

    out
}

// ── Messages ─────────────────────────────────────────────────────────

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Greeting by time of day plus one personal line picked at random.
pub fn welcome_message<R: Rng + ?Sized>(
    patterns: &UserPatterns,
    clock: &dyn Clock,
    rng: &mut R,
) -> String {
    let hour = clock.hour();
    let day = clock.day_of_week();

    let greeting = match hour {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    };

    let mut lines = Vec::new();
    if patterns.is_peak_hour(hour) {
        lines.push("This is one of your productive hours!".to_string());
    }
    if patterns.temporal.best_days.contains(&day) {
        if let Some(name) = DAY_NAMES.get(day as usize) {
            lines.push(format!("{name}s are often good days for you."));
        }
    }
    if patterns.mental.avg_mood >= 7.0 {
        lines.push("You've seemed in good shape lately.".to_string());
    }

    let line = lines
        .choose(rng)
        .map_or("Ready for a new day?", String::as_str);
    format!("{greeting}! {line}")
}

/// End-of-day recap. Never blames a quiet day.
pub fn evening_message(memory: &Memory, patterns: &UserPatterns, clock: &dyn Clock) -> String {
    let tasks = memory
        .today(clock)
        .into_iter()
        .filter(|e| e.kind.is_task_completed())
        .count();
    let focus = today_focus_minutes(memory, clock);

    if tasks > 0 && tasks as f64 >= patterns.productivity.avg_tasks_per_day {
        return format!("Great day! {tasks} tasks done. Rest well. 🌙");
    }
    if tasks > 0 {
        let plural = if tasks > 1 { "s" } else { "" };
        return format!("{tasks} task{plural} today. Every step counts. Have a good evening! 🌙");
    }
    if focus > 0.0 {
        return format!("{focus} minutes of focus today. That's something! Good night. 🌙");
    }
    "Quiet day? That's okay, tomorrow is a new day. Rest well. 🌙".to_string()
}

pub fn tone_emoji(tone: Tone) -> &'static str {
    match tone {
        Tone::Encouraging => "💪",
        Tone::Gentle => "🌿",
        Tone::Celebratory => "🎉",
        Tone::Supportive => "💙",
    }
}
