pub mod engine;
pub mod placeholder;
pub mod substitute;

pub use engine::*;
pub use substitute::*;
