// Core data models for Charla
// These structs represent the domain entities

pub mod stage;
pub mod category;
pub mod template;

pub use stage::*;
pub use category::*;
pub use template::*;
