//! Statistical summary of recent behaviour.
//!
//! [`UserPatterns`] is derived by the analyzer from the event window and
//! cached in memory. A brand-new user starts from [`UserPatterns::default`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPatterns {
    pub temporal: TemporalPatterns,
    pub productivity: ProductivityPatterns,
    pub health: HealthPatterns,
    pub mental: MentalPatterns,
    pub habits: HabitPatterns,
    pub learning: LearningPatterns,
    pub correlations: Correlations,
}

/// When the user is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporalPatterns {
    /// Up to three most productive hours (0-23)
    pub peak_hours: Vec<u32>,
    /// Three least active waking hours (0-23)
    pub low_hours: Vec<u32>,
    /// Up to three best weekdays (0-6, Sunday=0)
    pub best_days: Vec<u32>,
    pub average_session_start: u32,
    pub average_session_end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductivityPatterns {
    pub avg_tasks_per_day: f64,
    pub avg_focus_duration_minutes: f64,
    pub preferred_categories: Vec<String>,
    /// Categories whose tasks get created but rarely completed
    pub avoided_categories: Vec<String>,
    /// 0.0 to 1.0
    pub task_completion_rate: f64,
    /// Mean days between creation and completion
    pub avg_task_delay_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealTimes {
    /// "HH:00"
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightTrend {
    Losing,
    Gaining,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthPatterns {
    pub meal_times: MealTimes,
    pub avg_calories_per_day: f64,
    pub weight_trend: WeightTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MentalPatterns {
    /// 1.0 to 10.0
    pub avg_mood: f64,
    pub mood_by_hour: BTreeMap<u32, f64>,
    pub mood_by_day: BTreeMap<u32, f64>,
    /// Days with a journal entry in the window, 0 to 7
    pub journal_frequency: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HabitPatterns {
    /// 0.0 to 1.0
    pub habit_completion_rate: f64,
    pub most_consistent_habits: Vec<String>,
    pub struggling_habits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearningPatterns {
    pub avg_study_duration_minutes: f64,
    pub preferred_learning_hour: u32,
}

/// Correlation coefficients, each -1.0 to 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Correlations {
    pub mood_productivity: f64,
    /// No sleep data source yet; always 0.
    pub sleep_productivity: f64,
    /// No exercise data source yet; always 0.
    pub exercise_energy: f64,
}

pub const DEFAULT_PEAK_HOURS: [u32; 3] = [10, 14, 16];
pub const DEFAULT_LOW_HOURS: [u32; 3] = [13, 22, 23];
pub const DEFAULT_BEST_DAYS: [u32; 3] = [1, 2, 3];
pub const DEFAULT_MOOD: f64 = 6.0;

impl Default for TemporalPatterns {
    fn default() -> Self {
        Self {
            peak_hours: DEFAULT_PEAK_HOURS.to_vec(),
            low_hours: DEFAULT_LOW_HOURS.to_vec(),
            best_days: DEFAULT_BEST_DAYS.to_vec(),
            average_session_start: 9,
            average_session_end: 18,
        }
    }
}

impl Default for ProductivityPatterns {
    fn default() -> Self {
        Self {
            avg_tasks_per_day: 0.0,
            avg_focus_duration_minutes: 25.0,
            preferred_categories: Vec::new(),
            avoided_categories: Vec::new(),
            task_completion_rate: 0.0,
            avg_task_delay_days: 0.0,
        }
    }
}

impl Default for MentalPatterns {
    fn default() -> Self {
        Self {
            avg_mood: DEFAULT_MOOD,
            mood_by_hour: BTreeMap::new(),
            mood_by_day: BTreeMap::new(),
            journal_frequency: 0,
        }
    }
}

impl Default for LearningPatterns {
    fn default() -> Self {
        Self {
            avg_study_duration_minutes: 30.0,
            preferred_learning_hour: 10,
        }
    }
}

impl Default for UserPatterns {
    fn default() -> Self {
        Self {
            temporal: TemporalPatterns::default(),
            productivity: ProductivityPatterns::default(),
            health: HealthPatterns::default(),
            mental: MentalPatterns::default(),
            habits: HabitPatterns::default(),
            learning: LearningPatterns::default(),
            correlations: Correlations::default(),
        }
    }
}

impl UserPatterns {
    pub fn is_peak_hour(&self, hour: u32) -> bool {
        self.temporal.peak_hours.contains(&hour)
    }

    pub fn is_low_hour(&self, hour: u32) -> bool {
        self.temporal.low_hours.contains(&hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults() {
        let p = UserPatterns::default();
        assert_eq!(p.productivity.avg_tasks_per_day, 0.0);
        assert_eq!(p.mental.avg_mood, 6.0);
        assert_eq!(p.health.weight_trend, WeightTrend::Stable);
        assert!(p.is_peak_hour(14));
        assert!(p.is_low_hour(22));
    }

    #[test]
    fn partial_document_fills_defaults() {
        let p: UserPatterns =
            serde_json::from_str(r#"{"mental": {"avgMood": 8.5}}"#).unwrap();
        assert_eq!(p.mental.avg_mood, 8.5);
        assert_eq!(p.temporal.peak_hours, vec![10, 14, 16]);
        assert_eq!(p.learning.preferred_learning_hour, 10);
    }
}
