//! Built-in tools exposed to the model

mod delete_file;
mod file_search;
mod grep_search;
mod list_dir;
mod read_file;
mod run_terminal_cmd;
mod search_replace;
mod write_file;

pub use delete_file::DeleteFileTool;
pub use file_search::{FileSearchTool, fuzzy_score};
pub use grep_search::{GrepMatch, GrepQuery, GrepSearchTool, search_in_process};
pub use list_dir::{ListDirTool, format_size};
pub use read_file::ReadFileTool;
pub use run_terminal_cmd::RunTerminalCmdTool;
pub use search_replace::SearchReplaceTool;
pub use write_file::WriteFileTool;
