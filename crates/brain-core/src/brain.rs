//! The engine coordinator.
//!
//! [`Brain`] owns the memory lifecycle through its [`Observer`] and is the
//! only writer. Reads are recomputed on demand; pattern analysis is gated
//! by a cache window and memoised until the next recorded event.
//!
//! ## Lifecycle
//!
//! ```text
//! start() -> record()* / reads* / tick()* -> shutdown()
//! ```
//!
//! `tick()` has to be called periodically (see [`crate::BrainService`]): it
//! performs due debounced writes and the periodic full analysis.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzer::{self, QuickAnalysis};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::events::{Event, EventKind};
use crate::guide::{self, ContextualSuggestions};
use crate::memory::Memory;
use crate::observer::{Observe, Observer};
use crate::patterns::UserPatterns;
use crate::predictor::{self, CurrentPredictions, Prediction};
use crate::storage::{BrainConfig, Database, KvStore};
use crate::wellbeing::{self, WellbeingScore};

/// What a call to [`Brain::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub saved: bool,
    pub analyzed: bool,
}

/// Patterns computed since the last full analysis, valid for one event
/// generation.
struct Memo {
    generation: u64,
    patterns: UserPatterns,
}

pub struct Brain {
    observer: Observer,
    clock: Arc<dyn Clock>,
    config: BrainConfig,
    /// Bumped on every recorded event.
    generation: u64,
    memo: Option<Memo>,
    /// Epoch milliseconds of the next periodic analysis, once started.
    next_analysis_ms: Option<i64>,
}

impl Brain {
    pub fn new(store: Box<dyn KvStore>, clock: Arc<dyn Clock>, config: BrainConfig) -> Self {
        let observer = Observer::new(store, Arc::clone(&clock), config.clone());
        Self {
            observer,
            clock,
            config,
            generation: 0,
            memo: None,
            next_analysis_ms: None,
        }
    }

    /// Open the on-disk engine: SQLite store in the data directory and the
    /// system clock.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(config: BrainConfig) -> Result<Self> {
        let db = Database::open()?;
        Ok(Self::new(Box::new(db), Arc::new(SystemClock), config))
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Record the app opening, run a first analysis and arm the periodic one.
    pub fn start(&mut self) -> WellbeingScore {
        info!("brain starting");
        self.app_opened();
        self.analyze()
    }

    /// Run due work: the debounced write and the periodic analysis.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            saved: self.observer.tick(),
            analyzed: false,
        };
        if let Some(due) = self.next_analysis_ms {
            if self.clock.now_ms() >= due {
                debug!("periodic analysis due");
                self.analyze();
                report.analyzed = true;
            }
        }
        report
    }

    /// Record the app closing and write everything out.
    pub fn shutdown(&mut self) {
        self.app_closed();
        self.next_analysis_ms = None;
        self.observer.flush();
        info!("brain stopped");
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Record a fully built event, keeping its timestamp and context.
    pub fn record_event(&mut self, event: Event) {
        self.observer.record_event(event);
        self.generation += 1;
    }

    /// Full analysis: refresh patterns, score today and persist both.
    pub fn analyze(&mut self) -> WellbeingScore {
        let clock = Arc::clone(&self.clock);
        let now = clock.now_ms();

        let patterns = analyzer::analyze(self.observer.memory(), clock.as_ref(), &self.config);
        let stamped = patterns.clone();
        self.observer.update(|m, _| m.update_patterns(stamped, now));

        let score = wellbeing::calculate(self.observer.memory(), &patterns, clock.as_ref());
        let max_scores = self.config.max_score_history;
        let overall = score.overall;
        self.observer
            .update(|m, c| m.record_score(c.today(), overall, max_scores));
        self.observer.flush();

        self.memo = Some(Memo {
            generation: self.generation,
            patterns,
        });
        self.next_analysis_ms = Some(now + self.config.analyze_interval().num_milliseconds());
        info!(score = score.overall, "analysis complete");
        score
    }

    /// Hide a suggestion for good.
    pub fn dismiss(&mut self, suggestion_id: &str) {
        let max = self.config.max_dismissed;
        self.observer.update(|m, _| m.dismiss(suggestion_id, max));
        self.observer.flush();
    }

    /// Forget everything, including the persisted document.
    pub fn reset(&mut self) {
        self.observer.reset();
        self.memo = None;
        self.generation += 1;
    }

    /// Write pending changes now.
    pub fn flush(&mut self) -> bool {
        self.observer.flush()
    }

    pub fn pending_save(&self) -> bool {
        self.observer.pending()
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn memory(&mut self) -> &Memory {
        self.observer.memory()
    }

    /// Current patterns.
    ///
    /// Within the cache window after a full analysis the stored patterns
    /// are returned as-is; otherwise the analyzer runs, memoised until the
    /// next recorded event.
    pub fn patterns(&mut self) -> UserPatterns {
        let now = self.clock.now_ms();
        let cache_ms = self.config.patterns_cache().num_milliseconds();
        let memory = self.observer.memory();

        if now - memory.last_full_analysis_timestamp < cache_ms {
            debug!("patterns served from the cache window");
            return memory.patterns.clone();
        }
        if let Some(memo) = self.memo.as_ref().filter(|m| m.generation == self.generation) {
            return memo.patterns.clone();
        }

        let patterns = analyzer::analyze(memory, self.clock.as_ref(), &self.config);
        self.memo = Some(Memo {
            generation: self.generation,
            patterns: patterns.clone(),
        });
        patterns
    }

    pub fn predictions(&mut self) -> CurrentPredictions {
        let patterns = self.patterns();
        predictor::predict(
            self.observer.memory(),
            &patterns,
            self.clock.as_ref(),
            &self.config,
        )
    }

    pub fn detailed_predictions(&mut self) -> Vec<Prediction> {
        let patterns = self.patterns();
        predictor::generate_detailed_predictions(
            self.observer.memory(),
            &patterns,
            self.clock.as_ref(),
        )
    }

    pub fn wellbeing(&mut self) -> WellbeingScore {
        let patterns = self.patterns();
        wellbeing::calculate(self.observer.memory(), &patterns, self.clock.as_ref())
    }

    pub fn suggestions(&mut self) -> ContextualSuggestions {
        let patterns = self.patterns();
        let predictions = predictor::predict(
            self.observer.memory(),
            &patterns,
            self.clock.as_ref(),
            &self.config,
        );
        guide::generate(
            self.observer.memory(),
            &patterns,
            &predictions,
            self.clock.as_ref(),
            &self.config,
        )
    }

    pub fn quick(&mut self) -> QuickAnalysis {
        analyzer::quick_analyze(self.observer.memory(), self.clock.as_ref())
    }

    pub fn welcome_message(&mut self) -> String {
        self.welcome_message_with(&mut rand::thread_rng())
    }

    pub fn welcome_message_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        let patterns = self.patterns();
        guide::welcome_message(&patterns, self.clock.as_ref(), rng)
    }

    pub fn evening_message(&mut self) -> String {
        let patterns = self.patterns();
        guide::evening_message(self.observer.memory(), &patterns, self.clock.as_ref())
    }
}

impl Observe for Brain {
    fn record(&mut self, kind: EventKind) {
        self.observer.record_kind(kind);
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::STORAGE_KEY;
    use crate::storage::InMemoryStore;
    use chrono::Duration;

    fn brain() -> (Brain, InMemoryStore, FixedClock) {
        let store = InMemoryStore::new();
        let clock = FixedClock::at(2024, 3, 13, 10, 0);
        let brain = Brain::new(
            Box::new(store.clone()),
            Arc::new(clock.clone()),
            BrainConfig::default(),
        );
        (brain, store, clock)
    }

    fn persisted(store: &InMemoryStore) -> Memory {
        let raw = store.get(STORAGE_KEY).unwrap().unwrap();
        Memory::parse(&raw).unwrap()
    }

    #[test]
    fn start_records_open_and_scores_today() {
        let (mut brain, store, clock) = brain();
        let score = brain.start();
        let saved = persisted(&store);
        assert_eq!(saved.by_type("app:opened").count(), 1);
        assert_eq!(saved.score_history.len(), 1);
        assert_eq!(saved.score_history[0].score, score.overall);
        assert_eq!(saved.last_full_analysis_timestamp, clock.now_ms());
    }

    #[test]
    fn analyze_twice_same_day_keeps_one_score() {
        let (mut brain, store, clock) = brain();
        brain.analyze();
        clock.advance(Duration::hours(1));
        brain.analyze();
        assert_eq!(persisted(&store).score_history.len(), 1);
    }

    #[test]
    fn patterns_are_served_from_cache_window() {
        let (mut brain, _store, clock) = brain();
        brain.analyze();
        for i in 0..12 {
            brain.task_completed(&format!("t{i}"), "", None);
        }
        // inside the window the stored new-user patterns are returned
        assert_eq!(brain.patterns().productivity.avg_tasks_per_day, 0.0);

        clock.advance(Duration::seconds(61));
        assert_eq!(brain.patterns().productivity.avg_tasks_per_day, 12.0);
    }

    #[test]
    fn tick_runs_debounced_save_and_periodic_analysis() {
        let (mut brain, store, clock) = brain();
        brain.start();
        let writes = store.write_count();

        brain.water_added(250.0);
        assert!(brain.pending_save());
        assert_eq!(brain.tick(), TickReport::default());

        clock.advance(Duration::milliseconds(1000));
        assert_eq!(
            brain.tick(),
            TickReport {
                saved: true,
                analyzed: false
            }
        );
        assert_eq!(store.write_count(), writes + 1);

        clock.advance(Duration::minutes(5));
        assert!(brain.tick().analyzed);
    }

    #[test]
    fn dismiss_persists_immediately() {
        let (mut brain, store, _clock) = brain();
        brain.dismiss("journal-evening");
        brain.dismiss("journal-evening");
        assert_eq!(
            persisted(&store).dismissed_suggestion_ids,
            vec!["journal-evening"]
        );
    }

    #[test]
    fn shutdown_flushes_pending_events() {
        let (mut brain, store, _clock) = brain();
        brain.mood_set(7.0);
        brain.shutdown();
        assert!(!brain.pending_save());
        let saved = persisted(&store);
        assert_eq!(saved.by_type("mood:set").count(), 1);
        assert_eq!(saved.by_type("app:closed").count(), 1);
    }

    #[test]
    fn dismissed_low_mood_is_not_suggested() {
        let (mut brain, _store, _clock) = brain();
        brain.mood_set(2.0);
        assert_eq!(
            brain.suggestions().now.map(|s| s.id),
            Some("low-mood-support".to_string())
        );
        brain.dismiss("low-mood-support");
        assert!(brain
            .suggestions()
            .now
            .map_or(true, |s| s.id != "low-mood-support"));
    }

    #[test]
    fn reset_clears_memory_and_store() {
        let (mut brain, store, _clock) = brain();
        brain.start();
        brain.reset();
        assert!(brain.memory().events.is_empty());
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
    }
}
