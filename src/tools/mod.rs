//! The assistant's closed tool set.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::*;
