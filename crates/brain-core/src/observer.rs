//! Event ingestion with debounced persistence.
//!
//! The observer owns the in-memory [`Memory`] handle, loading it lazily on
//! first use. Every recorded event is appended immediately; the write to the
//! store is deferred behind a trailing [`Debouncer`] deadline so a burst of
//! events costs one write.
//!
//! Like the rest of the engine the observer has no internal thread: the
//! caller is responsible for calling `tick()` periodically, and `flush()`
//! on teardown.
//!
//! ```ignore
//! let mut observer = Observer::new(Box::new(store), clock, config);
//! observer.task_completed("t1", "Write report", None);
//! observer.mood_set(7.0);
//! // In a loop:
//! observer.tick(); // writes once the debounce deadline passed
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::events::*;
use crate::memory::Memory;
use crate::storage::{BrainConfig, KvStore};

/// Trailing-edge deadline. Every `schedule` pushes the deadline back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay_ms: i64,
    /// Epoch milliseconds at which the pending action becomes due.
    deadline_ms: Option<i64>,
}

impl Debouncer {
    pub fn new(delay_ms: i64) -> Self {
        Self {
            delay_ms,
            deadline_ms: None,
        }
    }

    /// Cancel any pending deadline and reschedule from `now_ms`.
    pub fn schedule(&mut self, now_ms: i64) {
        self.deadline_ms = Some(now_ms + self.delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        self.deadline_ms
    }

    /// Returns true (and clears the deadline) once it has passed.
    pub fn take_due(&mut self, now_ms: i64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Records events into memory and persists them.
pub struct Observer {
    store: Box<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: BrainConfig,
    memory: Option<Memory>,
    debouncer: Debouncer,
}

impl Observer {
    pub fn new(store: Box<dyn KvStore>, clock: Arc<dyn Clock>, config: BrainConfig) -> Self {
        let debouncer = Debouncer::new(config.save_debounce().num_milliseconds());
        Self {
            store,
            clock,
            config,
            memory: None,
            debouncer,
        }
    }

    /// The current memory, loaded from the store on first access.
    pub fn memory(&mut self) -> &Memory {
        self.loaded()
    }

    fn loaded(&mut self) -> &mut Memory {
        if self.memory.is_none() {
            self.memory = Some(Memory::load(
                self.store.as_ref(),
                self.clock.as_ref(),
                &self.config,
            ));
        }
        self.memory.get_or_insert_with(Memory::default)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Record an event timestamped now.
    pub fn record_kind(&mut self, kind: EventKind) {
        let event = Event::new(kind, self.clock.now_ms());
        self.record_event(event);
    }

    /// Record a fully built event (caller-supplied timestamp and context).
    pub fn record_event(&mut self, event: Event) {
        debug!(event = event.tag(), "observed");
        let max_events = self.config.max_recent_events;
        self.update(|memory, clock| memory.append(event, clock, max_events));
    }

    /// Replace memory with the result of `f` and schedule a write.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(Memory, &dyn Clock) -> Memory,
    {
        let current = std::mem::take(self.loaded());
        let next = f(current, self.clock.as_ref());
        self.memory = Some(next);
        self.debouncer.schedule(self.clock.now_ms());
    }

    /// Perform the pending write if its deadline has passed.
    ///
    /// Returns whether a write was attempted.
    pub fn tick(&mut self) -> bool {
        if !self.debouncer.take_due(self.clock.now_ms()) {
            return false;
        }
        debug!("debounced save due");
        self.write();
        true
    }

    /// Cancel the pending write and persist immediately.
    ///
    /// Returns whether the store accepted the write.
    pub fn flush(&mut self) -> bool {
        self.debouncer.cancel();
        self.write()
    }

    pub fn pending(&self) -> bool {
        self.debouncer.pending()
    }

    /// Forget everything, including the persisted document.
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.memory = Some(Memory::reset(self.store.as_ref()));
    }

    fn write(&mut self) -> bool {
        match &self.memory {
            Some(memory) => memory.save(self.store.as_ref()),
            None => false,
        }
    }
}

/// One thin wrapper per domain action. Implementors only provide `record`.
pub trait Observe {
    fn record(&mut self, kind: EventKind);

    // ── Tasks ────────────────────────────────────────────────────────

    fn task_created(&mut self, id: &str, title: &str, category: Option<&str>, priority: Option<&str>) {
        self.record(EventKind::TaskCreated(TaskCreated {
            id: id.to_string(),
            title: title.to_string(),
            category: category.map(str::to_string),
            priority: priority.map(str::to_string),
        }));
    }

    fn task_completed(&mut self, id: &str, title: &str, category: Option<&str>) {
        self.record(EventKind::TaskCompleted(TaskCompleted {
            id: id.to_string(),
            title: title.to_string(),
            category: category.map(str::to_string),
            duration: None,
        }));
    }

    fn task_deleted(&mut self, task_id: &str) {
        self.record(EventKind::TaskDeleted(TaskRef {
            task_id: task_id.to_string(),
        }));
    }

    fn task_updated(&mut self, task_id: &str) {
        self.record(EventKind::TaskUpdated(TaskRef {
            task_id: task_id.to_string(),
        }));
    }

    /// A move into the `done` column also counts as a completion.
    fn task_moved(&mut self, task_id: &str, from: &str, to: &str) {
        self.record(EventKind::TaskMoved(TaskMoved {
            task_id: task_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }));
        if to == "done" {
            self.record(EventKind::TaskCompleted(TaskCompleted {
                id: task_id.to_string(),
                ..Default::default()
            }));
        }
    }

    // ── Focus ────────────────────────────────────────────────────────

    fn pomodoro_started(&mut self, task_id: Option<&str>, duration: f64) {
        self.record(EventKind::PomodoroStarted(PomodoroStarted {
            task_id: task_id.map(str::to_string),
            duration,
        }));
    }

    fn pomodoro_completed(&mut self, task_id: Option<&str>, duration: f64, actual_duration: f64) {
        self.record(EventKind::PomodoroCompleted(PomodoroCompleted {
            task_id: task_id.map(str::to_string),
            duration: Some(duration),
            actual_duration: Some(actual_duration),
        }));
    }

    fn pomodoro_interrupted(&mut self, task_id: Option<&str>, after_minutes: f64) {
        self.record(EventKind::PomodoroInterrupted(PomodoroInterrupted {
            task_id: task_id.map(str::to_string),
            after_minutes,
        }));
    }

    // ── Health ───────────────────────────────────────────────────────

    fn weight_added(&mut self, weight: f64) {
        self.record(EventKind::WeightAdded(WeightAdded { weight }));
    }

    fn meal_added(&mut self, calories: f64, meal_type: &str) {
        self.record(EventKind::MealAdded(MealAdded {
            calories,
            meal_type: Some(meal_type.to_string()),
        }));
    }

    fn water_added(&mut self, ml: f64) {
        self.record(EventKind::WaterAdded(WaterAdded { ml }));
    }

    // ── Journal ──────────────────────────────────────────────────────

    /// A journal entry with a mood also records the mood on its own.
    fn journal_written(&mut self, mood: Option<f64>, has_content: bool) {
        self.record(EventKind::JournalWritten(JournalWritten { mood, has_content }));
        if let Some(mood) = mood {
            self.mood_set(mood);
        }
    }

    fn mood_set(&mut self, mood: f64) {
        self.record(EventKind::MoodSet(MoodSet { mood: Some(mood) }));
    }

    // ── Habits ───────────────────────────────────────────────────────

    fn habit_checked(&mut self, habit_id: &str, habit_name: &str) {
        self.record(EventKind::HabitChecked(HabitToggled {
            habit_id: habit_id.to_string(),
            habit_name: Some(habit_name.to_string()),
        }));
    }

    fn habit_unchecked(&mut self, habit_id: &str) {
        self.record(EventKind::HabitUnchecked(HabitToggled {
            habit_id: habit_id.to_string(),
            habit_name: None,
        }));
    }

    fn habit_created(&mut self, habit_id: &str, habit_name: &str) {
        self.record(EventKind::HabitCreated(HabitToggled {
            habit_id: habit_id.to_string(),
            habit_name: Some(habit_name.to_string()),
        }));
    }

    // ── Library ──────────────────────────────────────────────────────

    fn book_started(&mut self, book_id: &str, book_title: &str) {
        self.record(EventKind::BookStarted(Book {
            book_id: book_id.to_string(),
            book_title: book_title.to_string(),
        }));
    }

    fn book_finished(&mut self, book_id: &str, book_title: &str) {
        self.record(EventKind::BookFinished(Book {
            book_id: book_id.to_string(),
            book_title: book_title.to_string(),
        }));
    }

    fn reading_session(&mut self, book_id: &str, minutes: f64) {
        self.record(EventKind::ReadingSession(ReadingSession {
            book_id: book_id.to_string(),
            minutes,
        }));
    }

    // ── Learning ─────────────────────────────────────────────────────

    fn course_started(&mut self, course_id: &str, course_name: &str) {
        self.record(EventKind::CourseStarted(CourseStarted {
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
        }));
    }

    fn course_message(&mut self, course_id: &str, is_user: bool) {
        self.record(EventKind::CourseMessage(CourseMessage {
            course_id: course_id.to_string(),
            is_user,
        }));
    }

    fn flashcard_reviewed(&mut self, course_id: &str, correct: bool) {
        self.record(EventKind::FlashcardReviewed(FlashcardReviewed {
            course_id: course_id.to_string(),
            correct,
        }));
    }

    // ── Navigation ───────────────────────────────────────────────────

    fn view_changed(&mut self, from: &str, to: &str) {
        self.record(EventKind::ViewChanged(ViewChanged {
            from: from.to_string(),
            to: to.to_string(),
        }));
    }

    fn app_opened(&mut self) {
        self.record(EventKind::AppOpened(AppSession {}));
    }

    fn app_closed(&mut self) {
        self.record(EventKind::AppClosed(AppSession {}));
    }
}

impl Observe for Observer {
    fn record(&mut self, kind: EventKind) {
        self.record_kind(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::STORAGE_KEY;
    use crate::storage::InMemoryStore;
    use chrono::Duration;

    fn observer() -> (Observer, InMemoryStore, FixedClock) {
        let store = InMemoryStore::new();
        let clock = FixedClock::at(2024, 3, 13, 10, 0);
        let observer = Observer::new(
            Box::new(store.clone()),
            Arc::new(clock.clone()),
            BrainConfig::default(),
        );
        (observer, store, clock)
    }

    #[test]
    fn debouncer_reschedules_on_every_call() {
        let mut d = Debouncer::new(1000);
        d.schedule(0);
        d.schedule(800);
        assert!(!d.take_due(1000));
        assert!(d.pending());
        assert!(d.take_due(1800));
        assert!(!d.pending());
        assert!(!d.take_due(5000));
    }

    #[test]
    fn burst_of_records_costs_one_write() {
        let (mut observer, store, clock) = observer();
        for _ in 0..5 {
            observer.water_added(250.0);
            clock.advance(Duration::milliseconds(200));
        }
        assert!(!observer.tick());
        assert_eq!(store.write_count(), 0);

        clock.advance(Duration::milliseconds(1000));
        assert!(observer.tick());
        assert_eq!(store.write_count(), 1);
        assert!(!observer.pending());
        assert!(!observer.tick());
    }

    #[test]
    fn flush_writes_immediately_and_cancels() {
        let (mut observer, store, _clock) = observer();
        observer.mood_set(7.0);
        assert!(observer.pending());
        assert!(observer.flush());
        assert!(!observer.pending());
        assert_eq!(store.write_count(), 1);
        assert!(store.get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn record_stamps_clock_time_and_context() {
        let (mut observer, _store, clock) = observer();
        observer.app_opened();
        let event = &observer.memory().events[0];
        assert_eq!(event.timestamp, clock.now_ms());
        assert_eq!(event.context.unwrap().hour, 10);
    }

    #[test]
    fn move_to_done_also_completes() {
        let (mut observer, _store, _clock) = observer();
        observer.task_moved("t1", "doing", "done");
        observer.task_moved("t2", "todo", "doing");
        let tags: Vec<&str> = observer.memory().events.iter().map(Event::tag).collect();
        assert_eq!(
            tags,
            vec!["task:moved", "task:completed", "task:moved"]
        );
    }

    #[test]
    fn journal_with_mood_also_sets_mood() {
        let (mut observer, _store, _clock) = observer();
        observer.journal_written(Some(8.0), true);
        observer.journal_written(None, true);
        let memory = observer.memory();
        assert_eq!(memory.by_type("mood:set").count(), 1);
        assert_eq!(memory.by_type("journal:written").count(), 2);
    }

    #[test]
    fn lazily_loads_persisted_memory() {
        let (mut first, store, clock) = observer();
        first.habit_checked("h1", "Stretch");
        first.flush();

        let mut second = Observer::new(
            Box::new(store),
            Arc::new(clock),
            BrainConfig::default(),
        );
        assert_eq!(second.memory().events.len(), 1);
    }

    #[test]
    fn write_failure_keeps_memory() {
        let (mut observer, store, _clock) = observer();
        store.fail_writes(true);
        observer.weight_added(70.0);
        assert!(!observer.flush());
        assert_eq!(observer.memory().events.len(), 1);
    }
}
