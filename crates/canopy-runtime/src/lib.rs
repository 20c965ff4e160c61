//! `canopy-runtime` – running canopy trees inside a process.
//!
//! # Modules
//!
//! - [`driver`] – [`TreeDriver`]: a tokio loop that ticks a
//!   [`BehaviorTree`][canopy_core::BehaviorTree] until it completes,
//!   sleeping on the tree's wake-up signal between ticks, with a
//!   `watch`-channel shutdown that halts the tree.
//! - [`config`] – [`EngineConfig`]: strict mode, tick interval, tick limit
//!   and log format, loaded from TOML with `CANOPY_*` environment
//!   overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod driver;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig, LogFormat};
pub use driver::{DriveReport, DriverError, TreeDriver};
pub use telemetry::{TracerProviderGuard, init_tracing};
