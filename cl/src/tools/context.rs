//! ToolContext - execution context for a single tool call

use std::path::{Path, PathBuf};
use tracing::debug;

/// Reserved argument key carrying the working directory into a tool call
pub const WORK_DIR_KEY: &str = "__work_dir__";

/// Execution context for tools - a snapshot taken at dispatch time
///
/// The manager builds one per call from its current working directory, so a
/// concurrent `set_work_dir` never changes the directory a running tool sees.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Directory relative paths are resolved against
    pub work_dir: PathBuf,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(work_dir: PathBuf) -> Self {
        debug!(?work_dir, "ToolContext::new: called");
        Self { work_dir }
    }

    /// Resolve a tool path: absolute paths are kept, relative ones join the working directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            debug!(?path, "ToolContext::resolve: path is absolute");
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// Path shown to the model: relative to the working directory when possible
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.work_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Working directory as an absolute path
    pub fn absolute_work_dir(&self) -> PathBuf {
        std::path::absolute(&self.work_dir).unwrap_or_else(|_| self.work_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let ctx = ToolContext::new(PathBuf::from("/tmp/worktree"));
        assert_eq!(ctx.resolve("src/lib.rs"), PathBuf::from("/tmp/worktree/src/lib.rs"));
    }

    #[test]
    fn test_resolve_absolute_path_preserved() {
        let ctx = ToolContext::new(PathBuf::from("/tmp/worktree"));
        assert_eq!(ctx.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_display_path_strips_work_dir() {
        let ctx = ToolContext::new(PathBuf::from("/tmp/worktree"));
        assert_eq!(ctx.display_path(Path::new("/tmp/worktree/src/app.ts")), "src/app.ts");
        assert_eq!(ctx.display_path(Path::new("/opt/other.txt")), "/opt/other.txt");
    }

    #[test]
    fn test_absolute_work_dir_from_relative() {
        let ctx = ToolContext::new(PathBuf::from("."));
        assert!(ctx.absolute_work_dir().is_absolute());
    }
}
