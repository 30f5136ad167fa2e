pub mod scaler;
pub mod split;
pub mod preprocess;

pub use scaler::*;
pub use split::*;
pub use preprocess::*;
