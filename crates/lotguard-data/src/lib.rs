pub mod table;
pub mod loader;

pub use table::*;
pub use loader::*;
