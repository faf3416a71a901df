//! Tool system
//!
//! Tools give the model file system access and command execution. A
//! `ToolManager` owns the registered tools and the working directory; every
//! call receives that directory both as a `ToolContext` and under the
//! reserved `__work_dir__` argument key.

mod context;
mod error;
mod manager;
mod traits;

pub mod builtin;
pub mod params;
pub mod registry;
pub mod security;

pub use context::{ToolContext, WORK_DIR_KEY};
pub use error::ToolError;
pub use manager::ToolManager;
pub use registry::standard_manager;
pub use security::SecurityViolation;
pub use traits::{FnTool, Tool, ToolResult, ToolSchema};
