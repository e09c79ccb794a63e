pub mod filter;
pub mod metrics;

pub use filter::*;
pub use metrics::*;
