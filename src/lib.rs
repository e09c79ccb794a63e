pub mod analysis;
pub mod api;
pub mod market_indicators;
pub mod models;
pub mod notifier;
pub mod orchestrator;
pub mod report;
pub mod universe_loader;
pub mod utils;
