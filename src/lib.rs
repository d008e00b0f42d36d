pub mod analysis;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod store;

pub use analysis::{AnalysisMode, Analyzer};
pub use collector::{collect, CollectOptions};
pub use config::Config;
pub use store::ReportStore;
