//! Wires the built-in tool set into a manager

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::builtin::{
    DeleteFileTool, FileSearchTool, GrepSearchTool, ListDirTool, ReadFileTool, RunTerminalCmdTool, SearchReplaceTool,
    WriteFileTool,
};
use super::{Tool, ToolError, ToolManager};

/// Every built-in tool, in registration order
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(DeleteFileTool),
        Arc::new(ListDirTool),
        Arc::new(SearchReplaceTool),
        Arc::new(FileSearchTool),
        Arc::new(GrepSearchTool),
        Arc::new(RunTerminalCmdTool),
    ]
}

/// Create a manager rooted at `work_dir` with the built-in tools registered
pub fn standard_manager(work_dir: impl Into<PathBuf>) -> Result<ToolManager, ToolError> {
    let manager = ToolManager::new(work_dir);
    for tool in builtin_tools() {
        debug!(name = %tool.name(), "standard_manager: registering tool");
        manager.register_tool(tool)?;
    }
    Ok(manager)
}
