// Feature-based localization stages, leaf first
pub mod registry;
pub mod features;
pub mod matcher;
pub mod validation;
pub mod localizer;

pub use features::*;
pub use localizer::*;
pub use matcher::*;
pub use registry::*;
pub use validation::*;
