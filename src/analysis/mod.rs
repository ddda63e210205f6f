pub mod benchmarks;
pub mod evaluation;
pub mod metrics;

pub use benchmarks::*;
pub use evaluation::*;
pub use metrics::*;
