pub mod engine;
pub mod merge;
pub mod preprocess;
pub mod traits;
pub mod types;

pub use engine::*;
pub use merge::*;
pub use preprocess::{reduce, ChannelSelector};
pub use traits::*;
pub use types::*;
