use std::ops::RangeInclusive;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::clock::{hour_of, weekday_of};

/// Focus length assumed for a completed pomodoro that reports no duration.
pub const DEFAULT_FOCUS_MINUTES: f64 = 25.0;

/// Moods outside this scale are treated as not reported.
pub const MOOD_SCALE: RangeInclusive<f64> = 1.0..=10.0;

/// One observed user action.
///
/// Serialized as `{"type": "task:created", "payload": {...}, "timestamp": ..., "context": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
}

/// Calendar context captured when the event was stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0-6, Sunday=0)
    pub day_of_week: u32,
    /// Mood at the time of the event, when the caller knew it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<f64>,
}

impl Event {
    pub fn new(kind: EventKind, timestamp: i64) -> Self {
        Self {
            kind,
            timestamp,
            context: None,
        }
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Hour the event was recorded at, falling back to its timestamp.
    pub fn hour(&self, offset: FixedOffset) -> u32 {
        self.context
            .map(|c| c.hour)
            .unwrap_or_else(|| hour_of(self.timestamp, offset))
    }

    /// Weekday the event was recorded on, falling back to its timestamp.
    pub fn day_of_week(&self, offset: FixedOffset) -> u32 {
        self.context
            .map(|c| c.day_of_week)
            .unwrap_or_else(|| weekday_of(self.timestamp, offset))
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    /// Reported mood of a mood or journal event.
    ///
    /// The payload wins; a payload without a mood falls back to the mood
    /// captured in the context. Any other event reports no mood.
    pub fn mood(&self) -> Option<f64> {
        if !self.kind.is_mood_or_journal() {
            return None;
        }
        self.kind.mood().or_else(|| {
            self.context
                .and_then(|c| c.mood)
                .filter(|m| MOOD_SCALE.contains(m))
        })
    }
}

/// Every action the engine observes, one payload struct per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    #[serde(rename = "task:created")]
    TaskCreated(TaskCreated),
    #[serde(rename = "task:completed")]
    TaskCompleted(TaskCompleted),
    #[serde(rename = "task:deleted")]
    TaskDeleted(TaskRef),
    #[serde(rename = "task:updated")]
    TaskUpdated(TaskRef),
    #[serde(rename = "task:moved")]
    TaskMoved(TaskMoved),
    #[serde(rename = "pomodoro:started")]
    PomodoroStarted(PomodoroStarted),
    #[serde(rename = "pomodoro:completed")]
    PomodoroCompleted(PomodoroCompleted),
    #[serde(rename = "pomodoro:interrupted")]
    PomodoroInterrupted(PomodoroInterrupted),
    #[serde(rename = "weight:added")]
    WeightAdded(WeightAdded),
    #[serde(rename = "meal:added")]
    MealAdded(MealAdded),
    #[serde(rename = "water:added")]
    WaterAdded(WaterAdded),
    #[serde(rename = "journal:written")]
    JournalWritten(JournalWritten),
    #[serde(rename = "mood:set")]
    MoodSet(MoodSet),
    #[serde(rename = "habit:checked")]
    HabitChecked(HabitToggled),
    #[serde(rename = "habit:unchecked")]
    HabitUnchecked(HabitToggled),
    #[serde(rename = "habit:created")]
    HabitCreated(HabitToggled),
    #[serde(rename = "book:started")]
    BookStarted(Book),
    #[serde(rename = "book:finished")]
    BookFinished(Book),
    #[serde(rename = "reading:session")]
    ReadingSession(ReadingSession),
    #[serde(rename = "course:started")]
    CourseStarted(CourseStarted),
    #[serde(rename = "course:message")]
    CourseMessage(CourseMessage),
    #[serde(rename = "flashcard:reviewed")]
    FlashcardReviewed(FlashcardReviewed),
    #[serde(rename = "view:changed")]
    ViewChanged(ViewChanged),
    #[serde(rename = "app:opened")]
    AppOpened(AppSession),
    #[serde(rename = "app:closed")]
    AppClosed(AppSession),
}

/// All event tags, in declaration order.
pub const EVENT_TAGS: [&str; 25] = [
    "task:created",
    "task:completed",
    "task:deleted",
    "task:updated",
    "task:moved",
    "pomodoro:started",
    "pomodoro:completed",
    "pomodoro:interrupted",
    "weight:added",
    "meal:added",
    "water:added",
    "journal:written",
    "mood:set",
    "habit:checked",
    "habit:unchecked",
    "habit:created",
    "book:started",
    "book:finished",
    "reading:session",
    "course:started",
    "course:message",
    "flashcard:reviewed",
    "view:changed",
    "app:opened",
    "app:closed",
];

impl EventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::TaskCreated(_) => "task:created",
            EventKind::TaskCompleted(_) => "task:completed",
            EventKind::TaskDeleted(_) => "task:deleted",
            EventKind::TaskUpdated(_) => "task:updated",
            EventKind::TaskMoved(_) => "task:moved",
            EventKind::PomodoroStarted(_) => "pomodoro:started",
            EventKind::PomodoroCompleted(_) => "pomodoro:completed",
            EventKind::PomodoroInterrupted(_) => "pomodoro:interrupted",
            EventKind::WeightAdded(_) => "weight:added",
            EventKind::MealAdded(_) => "meal:added",
            EventKind::WaterAdded(_) => "water:added",
            EventKind::JournalWritten(_) => "journal:written",
            EventKind::MoodSet(_) => "mood:set",
            EventKind::HabitChecked(_) => "habit:checked",
            EventKind::HabitUnchecked(_) => "habit:unchecked",
            EventKind::HabitCreated(_) => "habit:created",
            EventKind::BookStarted(_) => "book:started",
            EventKind::BookFinished(_) => "book:finished",
            EventKind::ReadingSession(_) => "reading:session",
            EventKind::CourseStarted(_) => "course:started",
            EventKind::CourseMessage(_) => "course:message",
            EventKind::FlashcardReviewed(_) => "flashcard:reviewed",
            EventKind::ViewChanged(_) => "view:changed",
            EventKind::AppOpened(_) => "app:opened",
            EventKind::AppClosed(_) => "app:closed",
        }
    }

    /// Build an event kind from its tag and a JSON payload.
    ///
    /// Missing payload fields take their defaults.
    pub fn from_tag(tag: &str, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        let payload = if payload.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            payload
        };
        serde_json::from_value(serde_json::json!({ "type": tag, "payload": payload }))
    }

    /// Mood carried by a mood or journal payload, if it is on the 1-10 scale.
    pub fn mood(&self) -> Option<f64> {
        let mood = match self {
            EventKind::MoodSet(m) => m.mood,
            EventKind::JournalWritten(j) => j.mood,
            _ => None,
        };
        mood.filter(|m| MOOD_SCALE.contains(m))
    }

    /// Fill the payload mood of a mood or journal event that has none.
    pub fn with_mood(mut self, mood: f64) -> Self {
        match &mut self {
            EventKind::MoodSet(m) => {
                m.mood.get_or_insert(mood);
            }
            EventKind::JournalWritten(j) => {
                j.mood.get_or_insert(mood);
            }
            _ => {}
        }
        self
    }

    /// Either a mood update or a journal entry, with or without a mood.
    pub fn is_mood_or_journal(&self) -> bool {
        matches!(self, EventKind::MoodSet(_) | EventKind::JournalWritten(_))
    }

    pub fn is_task_completed(&self) -> bool {
        matches!(self, EventKind::TaskCompleted(_))
    }

    /// Focus minutes of a completed pomodoro, `None` for any other event.
    pub fn focus_minutes(&self) -> Option<f64> {
        match self {
            EventKind::PomodoroCompleted(p) => Some(p.minutes()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskCreated {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskCompleted {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Minutes spent, when the board tracks it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskMoved {
    pub task_id: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PomodoroStarted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PomodoroCompleted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Planned minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Minutes actually focused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<f64>,
}

impl PomodoroCompleted {
    /// `actualDuration`, else `duration`, else 25. Zero counts as missing.
    pub fn minutes(&self) -> f64 {
        self.actual_duration
            .filter(|m| *m > 0.0)
            .or(self.duration.filter(|m| *m > 0.0))
            .unwrap_or(DEFAULT_FOCUS_MINUTES)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PomodoroInterrupted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub after_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightAdded {
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealAdded {
    pub calories: f64,
    /// breakfast, lunch, dinner or snack.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterAdded {
    pub ml: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JournalWritten {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<f64>,
    pub has_content: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HabitToggled {
    pub habit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habit_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Book {
    pub book_id: String,
    pub book_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadingSession {
    pub book_id: String,
    pub minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CourseStarted {
    pub course_id: String,
    pub course_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CourseMessage {
    pub course_id: String,
    pub is_user: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlashcardReviewed {
    pub course_id: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewChanged {
    pub from: String,
    pub to: String,
}

/// App lifecycle events carry no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSession {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_payload_layout() {
        let event = Event::new(
            EventKind::MoodSet(MoodSet { mood: Some(7.0) }),
            1_700_000_000_000,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "mood:set");
        assert_eq!(json["payload"]["mood"], 7.0);
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert!(json.get("context").is_none());
    }

    #[test]
    fn parses_camel_case_payload() {
        let raw = r#"{
            "type": "pomodoro:completed",
            "payload": {"taskId": "t1", "duration": 25, "actualDuration": 30},
            "timestamp": 1,
            "context": {"hour": 10, "dayOfWeek": 2}
        }"#;
        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind.focus_minutes(), Some(30.0));
        assert_eq!(event.context.unwrap().day_of_week, 2);
    }

    #[test]
    fn app_events_round_trip_with_empty_payload() {
        let event = Event::new(EventKind::AppOpened(AppSession {}), 5);
        let text = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn from_tag_fills_missing_fields() {
        let kind = EventKind::from_tag("journal:written", serde_json::json!({"mood": 3})).unwrap();
        assert_eq!(kind.mood(), Some(3.0));
        assert!(kind.is_mood_or_journal());

        let kind = EventKind::from_tag("app:closed", serde_json::Value::Null).unwrap();
        assert_eq!(kind.tag(), "app:closed");
    }

    #[test]
    fn mood_set_without_mood_reports_none() {
        let kind = EventKind::from_tag("mood:set", serde_json::json!({})).unwrap();
        assert_eq!(kind, EventKind::MoodSet(MoodSet { mood: None }));
        assert_eq!(kind.mood(), None);

        let zero = EventKind::from_tag("mood:set", serde_json::json!({"mood": 0})).unwrap();
        assert_eq!(zero.mood(), None);
    }

    #[test]
    fn with_mood_fills_only_missing_payload_mood() {
        let empty = EventKind::MoodSet(MoodSet { mood: None }).with_mood(8.0);
        assert_eq!(empty.mood(), Some(8.0));

        let set = EventKind::MoodSet(MoodSet { mood: Some(3.0) }).with_mood(8.0);
        assert_eq!(set.mood(), Some(3.0));

        let water = EventKind::WaterAdded(WaterAdded { ml: 1.0 }).with_mood(8.0);
        assert_eq!(water.mood(), None);
    }

    #[test]
    fn event_mood_falls_back_to_context() {
        let context = EventContext {
            hour: 9,
            day_of_week: 1,
            mood: Some(6.0),
        };
        let journal = Event::new(
            EventKind::JournalWritten(JournalWritten {
                mood: None,
                has_content: true,
            }),
            1,
        )
        .with_context(context);
        assert_eq!(journal.mood(), Some(6.0));

        let rated = Event::new(EventKind::MoodSet(MoodSet { mood: Some(4.0) }), 1)
            .with_context(context);
        assert_eq!(rated.mood(), Some(4.0));

        let water = Event::new(EventKind::WaterAdded(WaterAdded { ml: 1.0 }), 1)
            .with_context(context);
        assert_eq!(water.mood(), None);
    }

    #[test]
    fn from_tag_rejects_unknown_tag() {
        assert!(EventKind::from_tag("dance:started", serde_json::json!({})).is_err());
    }

    #[test]
    fn every_tag_parses() {
        for tag in EVENT_TAGS {
            let kind = EventKind::from_tag(tag, serde_json::json!({})).unwrap();
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn pomodoro_minutes_fall_back() {
        let planned = PomodoroCompleted {
            duration: Some(50.0),
            ..Default::default()
        };
        assert_eq!(planned.minutes(), 50.0);
        assert_eq!(PomodoroCompleted::default().minutes(), DEFAULT_FOCUS_MINUTES);
        let zero = PomodoroCompleted {
            actual_duration: Some(0.0),
            duration: Some(20.0),
            ..Default::default()
        };
        assert_eq!(zero.minutes(), 20.0);
    }
}
