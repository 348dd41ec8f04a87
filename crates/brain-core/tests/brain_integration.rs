//! Brain lifecycle against a real SQLite file.

use std::sync::Arc;

use chrono::Duration;
use iku_brain_core::{Brain, BrainConfig, Clock, Database, FixedClock, Observe};

fn open(path: &std::path::Path, clock: &FixedClock) -> Brain {
    let db = Database::open_at(path).unwrap();
    Brain::new(Box::new(db), Arc::new(clock.clone()), BrainConfig::default())
}

#[test]
fn events_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.db");
    let clock = FixedClock::at(2024, 3, 13, 9, 0);

    let mut brain = open(&path, &clock);
    brain.start();
    brain.task_created("t1", "Write report", Some("work"), None);
    brain.task_moved("t1", "todo", "done");
    brain.journal_written(Some(8.0), true);
    brain.shutdown();
    drop(brain);

    clock.advance(Duration::hours(2));
    let mut brain = open(&path, &clock);
    let memory = brain.memory();
    let tags: Vec<&str> = memory.events.iter().map(|e| e.tag()).collect();
    assert_eq!(
        tags,
        vec![
            "app:opened",
            "task:created",
            "task:moved",
            "task:completed",
            "journal:written",
            "mood:set",
            "app:closed",
        ]
    );
    assert_eq!(memory.score_history.len(), 1);
    assert_eq!(brain.quick().today_task_count, 1);
    assert_eq!(brain.quick().last_mood, Some(8.0));
}

#[test]
fn dismissals_and_scores_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.db");
    let clock = FixedClock::at(2024, 3, 13, 9, 0);

    let mut brain = open(&path, &clock);
    brain.analyze();
    brain.dismiss("journal-evening");
    clock.advance(Duration::days(1));
    brain.analyze();
    drop(brain);

    let mut brain = open(&path, &clock);
    let memory = brain.memory();
    assert!(memory.is_dismissed("journal-evening"));
    let days: Vec<_> = memory.score_history.iter().map(|s| s.date).collect();
    assert_eq!(days, vec![clock.today() - Duration::days(1), clock.today()]);
}

#[test]
fn expired_events_are_pruned_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.db");
    let clock = FixedClock::at(2024, 3, 1, 9, 0);

    let mut brain = open(&path, &clock);
    brain.water_added(250.0);
    brain.flush();
    drop(brain);

    clock.advance(Duration::days(8));
    let mut brain = open(&path, &clock);
    assert!(brain.memory().events.is_empty());
}

#[test]
fn reset_removes_the_stored_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.db");
    let clock = FixedClock::at(2024, 3, 13, 9, 0);

    let mut brain = open(&path, &clock);
    brain.start();
    brain.reset();
    drop(brain);

    let mut brain = open(&path, &clock);
    assert!(brain.memory().events.is_empty());
    assert!(brain.memory().score_history.is_empty());
}
