pub mod adapters;
pub mod analysis;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use app::{build_scheduler, Services};
pub use config::AppConfig;
pub use core::{EtlEngine, Job, Scheduler};
pub use server::AppState;
pub use utils::error::{DigestError, Result};
