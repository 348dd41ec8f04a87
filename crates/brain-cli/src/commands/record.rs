use chrono::DateTime;
use clap::Args;
use iku_brain_core::clock::{hour_of, weekday_of};
use iku_brain_core::{Event, EventContext, EventKind};
use tracing::debug;

use super::{open_brain, print_json, CommandResult};

#[derive(Args)]
pub struct RecordArgs {
    /// Event type, e.g. "task:completed"
    pub tag: String,
    /// Event payload as a JSON object
    #[arg(long)]
    pub payload: Option<String>,
    /// Mood (1-10) at the time of the event; also fills the payload mood of
    /// `mood:set` and `journal:written` when the payload has none
    #[arg(long)]
    pub mood: Option<f64>,
    /// RFC 3339 timestamp; defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run(args: RecordArgs) -> CommandResult {
    if let Some(mood) = args.mood {
        if !(1.0..=10.0).contains(&mood) {
            return Err(format!("mood must be between 1 and 10, got {mood}").into());
        }
    }

    let payload = match args.payload.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => serde_json::Value::Null,
    };
    let mut kind = EventKind::from_tag(&args.tag, payload)
        .map_err(|e| format!("invalid event {}: {e}", args.tag))?;
    if let Some(mood) = args.mood {
        kind = kind.with_mood(mood);
    }

    let mut brain = open_brain()?;
    let timestamp = match args.at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)?.timestamp_millis(),
        None => brain.clock().now_ms(),
    };
    let offset = brain.clock().offset();
    let event = Event::new(kind, timestamp).with_context(EventContext {
        hour: hour_of(timestamp, offset),
        day_of_week: weekday_of(timestamp, offset),
        mood: args.mood,
    });

    debug!(event = event.tag(), timestamp, "recording");
    brain.record_event(event.clone());
    if !brain.flush() {
        return Err("failed to persist event".into());
    }
    print_json(&event)
}
