/// Ridehail Identity Library
///
/// Credential and token lifecycle for rider and driver accounts.
///
/// ## Modules
///
/// - `app`: Service wiring
/// - `config`: Service configuration
/// - `db`: Repository port with PostgreSQL and in-memory adapters
/// - `error`: Error types and status classification
/// - `models`: Data models and request types
/// - `security`: Password hashing and reset codes
/// - `services`: Registration, sessions, password reset, accounts, email
/// - `telemetry`: Structured logging
/// - `validators`: Input validation and error aggregation
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod security;
pub mod services;
pub mod telemetry;
pub mod validators;

// Re-export commonly used types
pub use app::IdentityApp;
pub use error::{IdentityError, Result, Status};
pub use validators::{FieldErrors, ValidationAggregator, ValidationOutcome};
