pub mod logistic;
pub mod saga;
pub mod trainer;

pub use logistic::*;
pub use saga::*;
pub use trainer::*;
