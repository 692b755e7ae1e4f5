// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod http;
pub mod poller;
pub mod publish;
pub mod ratelimit;
pub mod record;
pub mod retry;
pub mod sources;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::ConfigResolver;
pub use crate::error::{ConfigError, FetchError, PublishError};
pub use crate::poller::{CycleReport, Poller, PublishOutcome, SymbolOutcome};
pub use crate::publish::{QueuePublisher, RecordingPublisher};
pub use crate::ratelimit::RateLimiter;
pub use crate::record::{SentimentRecord, Source, Symbol};
pub use crate::retry::{Backoff, RetryPolicy};
pub use crate::sources::{AdapterContext, RecordSource, Registry, SourceAdapter};
