//! Practice schedule expansion and attendance reconciliation for squad
//! rosters.
//!
//! The engine modules (`schedule`, `expand`, `reconcile`, `aggregate`,
//! `engine`) are pure and synchronous; `db` adapts them to Postgres.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod expand;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod schedule;

pub use aggregate::{aggregate, CohortOrder};
pub use engine::{build_report, AttendanceReport};
pub use error::{BlockError, ConflictError, InvalidRangeError, ScheduleError};
pub use expand::{expand, DateRange};
pub use reconcile::{latest_per_date, reconcile};
pub use schedule::{validate, validate_batch, validate_edit};
