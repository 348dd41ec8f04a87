//! Durable, versioned aggregate of everything the engine remembers.
//!
//! The whole aggregate is persisted as one JSON document under
//! [`STORAGE_KEY`]. Loading never fails: a missing or corrupt document
//! yields defaults, a document from another schema version is migrated
//! (events and patterns survive, everything else is reset).
//!
//! Mutations consume the aggregate and return the updated value, so the
//! owner decides when a new state becomes visible.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{date_of, Clock};
use crate::error::Result;
use crate::events::{Event, EventContext};
use crate::patterns::UserPatterns;
use crate::storage::{BrainConfig, KvStore};

/// Key of the persisted document.
pub const STORAGE_KEY: &str = "iku-brain-memory";

/// Current document schema version.
pub const CURRENT_VERSION: u32 = 1;

/// One day's wellbeing score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub date: NaiveDate,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub patterns: UserPatterns,
    #[serde(default)]
    pub score_history: Vec<ScoreEntry>,
    #[serde(default)]
    pub dismissed_suggestion_ids: Vec<String>,
    /// Epoch milliseconds of the last full analysis, 0 if never.
    #[serde(default)]
    pub last_full_analysis_timestamp: i64,
    #[serde(default)]
    pub schema_version: u32,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            patterns: UserPatterns::default(),
            score_history: Vec::new(),
            dismissed_suggestion_ids: Vec::new(),
            last_full_analysis_timestamp: 0,
            schema_version: CURRENT_VERSION,
        }
    }
}

impl Memory {
    /// Load the persisted document, falling back to defaults.
    ///
    /// Expired events are pruned and the event cap applied on the way in.
    pub fn load(store: &dyn KvStore, clock: &dyn Clock, config: &BrainConfig) -> Self {
        let raw = match store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no persisted memory, starting fresh");
                return Self::default();
            }
            Err(e) => {
                warn!(error = %e, "failed to read memory, using defaults");
                return Self::default();
            }
        };

        let memory = match Self::parse(&raw) {
            Ok(memory) => memory,
            Err(e) => {
                warn!(error = %e, "corrupt memory document, using defaults");
                return Self::default();
            }
        };

        let memory = memory.prune_expired(
            clock.now_ms(),
            config.retention(),
            config.max_recent_events,
        );
        info!(events = memory.events.len(), "memory loaded");
        memory
    }

    /// Parse a persisted document, migrating other schema versions.
    ///
    /// Events that fail to decode are skipped one by one; the rest of the
    /// document is kept.
    ///
    /// # Errors
    /// Returns an error if `raw` is not JSON or the document itself is
    /// malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(raw)?;
        let version = value
            .get("schemaVersion")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);

        if version != u64::from(CURRENT_VERSION) {
            return Ok(Self::migrate(&value, version));
        }

        let events = value
            .as_object_mut()
            .and_then(|doc| doc.remove("events"))
            .map(decode_events)
            .unwrap_or_default();
        let memory: Self = serde_json::from_value(value)?;
        Ok(Self { events, ..memory })
    }

    /// Keep events and patterns from an older (or newer) document.
    fn migrate(old: &serde_json::Value, from_version: u64) -> Self {
        info!(from_version, to_version = CURRENT_VERSION, "migrating memory");

        let events = old
            .get("events")
            .cloned()
            .map(decode_events)
            .unwrap_or_default();

        let patterns = old
            .get("patterns")
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default();

        Self {
            events,
            patterns,
            ..Self::default()
        }
    }

    /// Best-effort write. Returns whether the document was persisted.
    pub fn save(&self, store: &dyn KvStore) -> bool {
        let content = match serde_json::to_string(self) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "failed to serialize memory");
                return false;
            }
        };
        match store.set(STORAGE_KEY, &content) {
            Ok(()) => {
                debug!(events = self.events.len(), "memory saved");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to save memory, keeping it in-memory only");
                false
            }
        }
    }

    /// Remove the persisted document and start over.
    pub fn reset(store: &dyn KvStore) -> Self {
        if let Err(e) = store.remove(STORAGE_KEY) {
            warn!(error = %e, "failed to remove persisted memory");
        }
        Self::default()
    }

    /// Append an event, filling in its calendar context if the caller did
    /// not supply one, and evict the oldest events beyond `max_events`.
    pub fn append(mut self, event: Event, clock: &dyn Clock, max_events: usize) -> Self {
        let context = event.context.unwrap_or(EventContext {
            hour: clock.hour(),
            day_of_week: clock.day_of_week(),
            mood: None,
        });
        self.events.push(Event {
            context: Some(context),
            ..event
        });
        evict_oldest(&mut self.events, max_events);
        self
    }

    /// Drop events older than `retention` and apply the event cap.
    pub fn prune_expired(mut self, now_ms: i64, retention: Duration, max_events: usize) -> Self {
        let cutoff = now_ms - retention.num_milliseconds();
        self.events.retain(|e| e.timestamp >= cutoff);
        evict_oldest(&mut self.events, max_events);
        self
    }

    /// Record today's score, replacing any earlier score for the same date.
    pub fn record_score(mut self, today: NaiveDate, score: u32, max_entries: usize) -> Self {
        self.score_history.retain(|s| s.date != today);
        self.score_history.push(ScoreEntry { date: today, score });
        evict_oldest(&mut self.score_history, max_entries);
        self
    }

    /// Remember a dismissed suggestion. Dismissing twice is a no-op.
    pub fn dismiss(mut self, suggestion_id: &str, max_entries: usize) -> Self {
        if self.is_dismissed(suggestion_id) {
            return self;
        }
        self.dismissed_suggestion_ids.push(suggestion_id.to_string());
        evict_oldest(&mut self.dismissed_suggestion_ids, max_entries);
        self
    }

    pub fn is_dismissed(&self, suggestion_id: &str) -> bool {
        self.dismissed_suggestion_ids.iter().any(|id| id == suggestion_id)
    }

    /// Store freshly analyzed patterns and stamp the analysis time.
    pub fn update_patterns(mut self, patterns: UserPatterns, now_ms: i64) -> Self {
        self.patterns = patterns;
        self.last_full_analysis_timestamp = now_ms;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Events with the given tag, oldest first.
    pub fn by_type<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.tag() == tag)
    }

    /// Events recorded strictly within the last `hours` hours.
    pub fn within_last_hours(&self, hours: f64, now_ms: i64) -> Vec<&Event> {
        let cutoff = now_ms - (hours * crate::clock::MS_PER_HOUR as f64) as i64;
        self.events.iter().filter(|e| e.timestamp > cutoff).collect()
    }

    /// Events on the clock's current calendar date.
    pub fn today(&self, clock: &dyn Clock) -> Vec<&Event> {
        let today = clock.today();
        let offset = clock.offset();
        self.events
            .iter()
            .filter(|e| date_of(e.timestamp, offset) == today)
            .collect()
    }
}

/// Decode a JSON array of events, dropping the ones that no longer parse.
fn decode_events(items: serde_json::Value) -> Vec<Event> {
    let serde_json::Value::Array(items) = items else {
        warn!("memory events are not a list, dropping them");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Event>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "skipping undecodable event");
                None
            }
        })
        .collect()
}

fn evict_oldest<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, MS_PER_DAY, MS_PER_HOUR};
    use crate::events::{EventKind, MoodSet, TaskRef, WaterAdded};
    use crate::storage::InMemoryStore;

    fn water(ts: i64) -> Event {
        Event::new(EventKind::WaterAdded(WaterAdded { ml: 250.0 }), ts)
    }

    #[test]
    fn append_fills_context_from_clock() {
        let clock = FixedClock::at(2024, 3, 13, 15, 0);
        let memory = Memory::default().append(water(clock.now_ms()), &clock, 500);
        let ctx = memory.events[0].context.unwrap();
        assert_eq!(ctx.hour, 15);
        assert_eq!(ctx.day_of_week, 3);
        assert_eq!(ctx.mood, None);
    }

    #[test]
    fn append_keeps_caller_context() {
        let clock = FixedClock::at(2024, 3, 13, 15, 0);
        let event = water(clock.now_ms()).with_context(EventContext {
            hour: 7,
            day_of_week: 1,
            mood: Some(8.0),
        });
        let memory = Memory::default().append(event, &clock, 500);
        let ctx = memory.events[0].context.unwrap();
        assert_eq!((ctx.hour, ctx.day_of_week, ctx.mood), (7, 1, Some(8.0)));
    }

    #[test]
    fn append_evicts_oldest_beyond_cap() {
        let clock = FixedClock::at(2024, 3, 13, 15, 0);
        let mut memory = Memory::default();
        for i in 0..5 {
            memory = memory.append(water(i), &clock, 3);
        }
        let stamps: Vec<i64> = memory.events.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
    }

    #[test]
    fn prune_drops_expired_then_caps() {
        let now = 100 * MS_PER_DAY;
        let memory = Memory {
            events: vec![
                water(now - 8 * MS_PER_DAY),
                water(now - 7 * MS_PER_DAY),
                water(now - MS_PER_DAY),
                water(now),
            ],
            ..Memory::default()
        };
        let pruned = memory.clone().prune_expired(now, Duration::days(7), 500);
        assert_eq!(pruned.events.len(), 3);
        let capped = memory.prune_expired(now, Duration::days(7), 1);
        assert_eq!(capped.events.len(), 1);
        assert_eq!(capped.events[0].timestamp, now);
    }

    #[test]
    fn record_score_last_write_wins_per_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        let memory = Memory::default()
            .record_score(day, 40, 30)
            .record_score(day, 55, 30);
        assert_eq!(memory.score_history, vec![ScoreEntry { date: day, score: 55 }]);
    }

    #[test]
    fn record_score_caps_history() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut memory = Memory::default();
        for i in 0..35 {
            memory = memory.record_score(start + Duration::days(i), i as u32, 30);
        }
        assert_eq!(memory.score_history.len(), 30);
        assert_eq!(memory.score_history[0].score, 5);
        assert_eq!(memory.score_history[29].score, 34);
    }

    #[test]
    fn dismiss_is_idempotent_and_capped() {
        let once = Memory::default().dismiss("a", 50);
        let twice = once.clone().dismiss("a", 50);
        assert_eq!(once, twice);

        let mut memory = Memory::default();
        for i in 0..4 {
            memory = memory.dismiss(&format!("s{i}"), 3);
        }
        assert_eq!(memory.dismissed_suggestion_ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn query_helpers_filter() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let now = clock.now_ms();
        let memory = Memory {
            events: vec![
                water(now - 30 * MS_PER_HOUR),
                Event::new(EventKind::MoodSet(MoodSet { mood: Some(5.0) }), now - 3 * MS_PER_HOUR),
                Event::new(
                    EventKind::TaskDeleted(TaskRef {
                        task_id: "t".into(),
                    }),
                    now - MS_PER_HOUR,
                ),
            ],
            ..Memory::default()
        };
        assert_eq!(memory.by_type("water:added").count(), 1);
        assert_eq!(memory.within_last_hours(2.0, now).len(), 1);
        assert_eq!(memory.within_last_hours(4.0, now).len(), 2);
        assert_eq!(memory.today(&clock).len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let config = BrainConfig::default();
        let store = InMemoryStore::new();
        let memory = Memory::default()
            .append(water(clock.now_ms()), &clock, 500)
            .dismiss("x", 50);
        assert!(memory.save(&store));
        assert_eq!(Memory::load(&store, &clock, &config), memory);
    }

    #[test]
    fn load_prunes_expired_events() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let config = BrainConfig::default();
        let store = InMemoryStore::new();
        let now = clock.now_ms();
        let memory = Memory {
            events: vec![water(now - 8 * MS_PER_DAY), water(now - MS_PER_DAY)],
            ..Memory::default()
        };
        memory.save(&store);
        assert_eq!(Memory::load(&store, &clock, &config).events.len(), 1);
    }

    #[test]
    fn load_corrupt_document_returns_defaults() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let store = InMemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        assert_eq!(
            Memory::load(&store, &clock, &BrainConfig::default()),
            Memory::default()
        );
    }

    #[test]
    fn load_skips_undecodable_events_and_keeps_the_rest() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let now = clock.now_ms();
        let store = InMemoryStore::new();
        let doc = serde_json::json!({
            "schemaVersion": CURRENT_VERSION,
            "events": [
                {"type": "mood:set", "payload": {"mood": 8}, "timestamp": now},
                {"type": "unknown:thing", "payload": {}, "timestamp": now},
                {"type": "water:added", "payload": {"ml": "lots"}, "timestamp": now},
                {"type": "water:added", "payload": {"ml": 250}, "timestamp": now}
            ],
            "patterns": {"mental": {"avgMood": 8.0}},
            "scoreHistory": [{"date": "2024-03-12", "score": 70}],
            "dismissedSuggestionIds": ["a"],
            "lastFullAnalysisTimestamp": 42
        });
        store.set(STORAGE_KEY, &doc.to_string()).unwrap();

        let memory = Memory::load(&store, &clock, &BrainConfig::default());
        let tags: Vec<&str> = memory.events.iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["mood:set", "water:added"]);
        assert_eq!(memory.patterns.mental.avg_mood, 8.0);
        assert_eq!(memory.score_history.len(), 1);
        assert_eq!(memory.dismissed_suggestion_ids, vec!["a"]);
        assert_eq!(memory.last_full_analysis_timestamp, 42);
    }

    #[test]
    fn parse_reports_invalid_json_as_json_error() {
        let err = Memory::parse("{not json").unwrap_err();
        assert!(matches!(err, crate::error::BrainError::Json(_)));
    }

    #[test]
    fn migration_keeps_events_and_patterns_only() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let now = clock.now_ms();
        let store = InMemoryStore::new();
        let old = serde_json::json!({
            "schemaVersion": 0,
            "events": [
                {"type": "mood:set", "payload": {"mood": 8}, "timestamp": now},
                {"type": "unknown:thing", "payload": {}, "timestamp": now}
            ],
            "patterns": {"mental": {"avgMood": 8.0}},
            "scoreHistory": [{"date": "2024-03-12", "score": 70}],
            "dismissedSuggestionIds": ["a"],
            "lastFullAnalysisTimestamp": 42
        });
        store.set(STORAGE_KEY, &old.to_string()).unwrap();

        let memory = Memory::load(&store, &clock, &BrainConfig::default());
        assert_eq!(memory.schema_version, CURRENT_VERSION);
        assert_eq!(memory.events.len(), 1);
        assert_eq!(memory.patterns.mental.avg_mood, 8.0);
        assert!(memory.score_history.is_empty());
        assert!(memory.dismissed_suggestion_ids.is_empty());
        assert_eq!(memory.last_full_analysis_timestamp, 0);
    }

    #[test]
    fn save_failure_is_reported_not_raised() {
        let store = InMemoryStore::new();
        store.fail_writes(true);
        assert!(!Memory::default().save(&store));
    }

    #[test]
    fn reset_removes_document() {
        let clock = FixedClock::at(2024, 3, 13, 12, 0);
        let store = InMemoryStore::new();
        Memory::default().dismiss("x", 50).save(&store);
        let fresh = Memory::reset(&store);
        assert_eq!(fresh, Memory::default());
        assert_eq!(store.get(STORAGE_KEY).unwrap(), None);
        assert_eq!(
            Memory::load(&store, &clock, &BrainConfig::default()),
            Memory::default()
        );
    }
}
