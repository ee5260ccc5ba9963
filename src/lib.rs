pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "browser")]
pub use adapters::ChromeDriver;
pub use adapters::{AmapClient, LocalStorage};
pub use app::pipelines::{GeocodePipeline, JobsPipeline};
pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use core::etl::{EtlEngine, RunOutcome};
pub use utils::error::{EtlError, Result};
