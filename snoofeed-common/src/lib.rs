//! Shared plumbing for the snoofeed crates.
//!
//! For now this is only the [`observability`] module, which every binary and
//! integration test uses to install the same `tracing` subscriber.
//!
//! ```rust
//! use snoofeed_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "snoofeed");
//! ```
pub mod observability;
