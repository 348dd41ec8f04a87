//! # Iku Brain Core Library
//!
//! This library provides the passive behavioural-analytics engine behind
//! Iku. It silently records user actions, derives patterns from a rolling
//! window of recent events, scores the day's wellbeing and proposes a few
//! gentle, dismissible suggestions. A standalone CLI binary exposes every
//! operation over the same core library.
//!
//! ## Architecture
//!
//! - **Memory**: one versioned JSON document holding the event window,
//!   the last patterns, the score history and dismissed suggestions
//! - **Observer**: event ingestion with debounced persistence; like the rest
//!   of the engine it requires the caller to periodically invoke `tick()`
//! - **Analysis**: pure functions from memory to patterns, predictions,
//!   wellbeing score and suggestions
//! - **Storage**: SQLite key-value persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Brain`]: The engine coordinator
//! - [`BrainService`]: Tokio driver that ticks a shared `Brain`
//! - [`Observe`]: Typed recording wrappers, one per user action
//! - [`Database`]: SQLite-backed memory persistence
//! - [`BrainConfig`]: Engine configuration management

pub mod analyzer;
pub mod brain;
pub mod clock;
pub mod error;
pub mod events;
pub mod guide;
pub mod memory;
pub mod numeric;
pub mod observer;
pub mod patterns;
pub mod predictor;
pub mod service;
pub mod storage;
pub mod wellbeing;

pub use analyzer::{analyze, quick_analyze, QuickAnalysis};
pub use brain::{Brain, TickReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BrainError, ConfigError, StorageError};
pub use events::{Event, EventContext, EventKind};
pub use guide::{ContextualSuggestions, Suggestion};
pub use memory::{Memory, ScoreEntry};
pub use observer::{Debouncer, Observe, Observer};
pub use patterns::UserPatterns;
pub use predictor::{CurrentPredictions, EnergyLevel, Prediction, TaskType};
pub use service::BrainService;
pub use storage::{BrainConfig, Database, InMemoryStore, KvStore, Thresholds};
pub use wellbeing::{TrendDirection, WellbeingScore};
