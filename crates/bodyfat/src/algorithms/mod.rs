pub mod preprocessing;
pub mod segmentation;
pub mod selection;
pub mod measurement;

pub use preprocessing::*;
pub use segmentation::*;
pub use selection::*;
pub use measurement::*;
