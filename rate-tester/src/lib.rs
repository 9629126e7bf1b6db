//! Fixed-rate HTTP load generator.
//!
//! A [`Dispatcher`] launches one worker per tick for a bounded duration, every
//! worker posts the same payload once and hands its [`RequestOutcome`] to a
//! shared [`Aggregator`], and the run ends with a [`RunReport`] once all
//! workers have finished.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod report;
pub mod ticker;

pub use aggregator::{AggregateReport, Aggregator, MalformedBodyPolicy};
pub use client::{HttpClient, HttpTarget, Target};
pub use config::RunConfig;
pub use dispatcher::{run, Dispatcher};
pub use error::{ApplicationError, ConfigError, TransportError};
pub use outcome::RequestOutcome;
pub use report::RunReport;
pub use ticker::{IntervalTicker, Ticker};
