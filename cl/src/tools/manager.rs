//! ToolManager - name-keyed registry and dispatcher for tools

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::context::WORK_DIR_KEY;
use super::{Tool, ToolContext, ToolError, ToolResult, ToolSchema};

struct RegisteredTool {
    schema: ToolSchema,
    tool: Arc<dyn Tool>,
}

struct Inner {
    tools: HashMap<String, RegisteredTool>,
    work_dir: PathBuf,
}

/// Thread-safe tool registry bound to a working directory
pub struct ToolManager {
    inner: RwLock<Inner>,
}

impl ToolManager {
    /// Create an empty manager rooted at `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        debug!(?work_dir, "ToolManager::new: called");
        Self {
            inner: RwLock::new(Inner {
                tools: HashMap::new(),
                work_dir,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a tool under `name`; the first registration of a name wins
    pub fn register(&self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = name.into();
        debug!(%name, "ToolManager::register: called");
        let mut inner = self.write();
        if inner.tools.contains_key(&name) {
            warn!(%name, "ToolManager::register: duplicate tool name rejected");
            return Err(ToolError::DuplicateName { name });
        }

        let mut schema = tool.schema();
        schema.name = name.clone();
        inner.tools.insert(name, RegisteredTool { schema, tool });
        Ok(())
    }

    /// Register a tool under its own name
    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        self.register(name, tool)
    }

    /// Look up a tool by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        debug!(%name, "ToolManager::lookup: called");
        self.read().tools.get(name).map(|registered| Arc::clone(&registered.tool))
    }

    /// Schemas of every registered tool, sorted by name
    pub fn list(&self) -> Vec<ToolSchema> {
        debug!("ToolManager::list: called");
        let mut schemas: Vec<ToolSchema> = self.read().tools.values().map(|r| r.schema.clone()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.read().tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current working directory
    pub fn work_dir(&self) -> PathBuf {
        self.read().work_dir.clone()
    }

    /// Replace the working directory for subsequent calls
    pub fn set_work_dir(&self, work_dir: impl Into<PathBuf>) {
        let work_dir = work_dir.into();
        info!(?work_dir, "ToolManager::set_work_dir: working directory changed");
        self.write().work_dir = work_dir;
    }

    /// Resolve a path against the current working directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        ToolContext::new(self.work_dir()).resolve(path)
    }

    /// Execute a tool by name
    ///
    /// Never fails: unknown tools and tool errors both come back as a failed
    /// `ToolResult`.
    pub async fn execute(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        debug!(%name, "ToolManager::execute: called");
        let (tool, work_dir) = {
            let inner = self.read();
            let tool = inner.tools.get(name).map(|registered| Arc::clone(&registered.tool));
            (tool, inner.work_dir.clone())
        };

        let Some(tool) = tool else {
            debug!(%name, "ToolManager::execute: unknown tool");
            return ToolResult::failure(name, format!("tool '{}' not found", name));
        };

        let mut arguments = arguments;
        arguments.insert(
            WORK_DIR_KEY.to_string(),
            Value::String(work_dir.to_string_lossy().to_string()),
        );
        let ctx = ToolContext::new(work_dir);

        match tool.execute(Value::Object(arguments), &ctx).await {
            Ok(value) => {
                debug!(%name, "ToolManager::execute: tool succeeded");
                ToolResult::success(name, value)
            }
            Err(e) => {
                debug!(%name, error = %e, "ToolManager::execute: tool failed");
                ToolResult::failure(name, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use serde_json::json;

    fn echo_tool(name: &str, reply: &'static str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            ToolSchema::new(name, "Echo", json!({"type": "object", "properties": {}})),
            move |_| Ok(json!(reply)),
        ))
    }

    fn work_dir_tool() -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            ToolSchema::new("where", "Report the working directory", json!({"type": "object"})),
            |args| Ok(args.get(WORK_DIR_KEY).cloned().unwrap_or(Value::Null)),
        ))
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let manager = ToolManager::new("/tmp");
        manager.register("echo", echo_tool("echo", "first")).unwrap();

        let err = manager.register("echo", echo_tool("echo", "second")).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName { .. }));

        let result = manager.execute("echo", Map::new()).await;
        assert!(result.success);
        assert_eq!(result.result, Some(json!("first")));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let manager = ToolManager::new("/tmp");
        let result = manager.execute("nonexistent", Map::new()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool 'nonexistent' not found"));
    }

    #[tokio::test]
    async fn test_work_dir_injected_and_overrides_model_value() {
        let manager = ToolManager::new("/srv/project");
        manager.register_tool(work_dir_tool()).unwrap();

        let mut args = Map::new();
        args.insert(WORK_DIR_KEY.to_string(), json!("/somewhere/else"));
        let result = manager.execute("where", args).await;
        assert_eq!(result.result, Some(json!("/srv/project")));

        manager.set_work_dir("/srv/other");
        let result = manager.execute("where", Map::new()).await;
        assert_eq!(result.result, Some(json!("/srv/other")));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failed_result() {
        let manager = ToolManager::new("/tmp");
        manager
            .register_tool(Arc::new(FnTool::new(
                ToolSchema::new("needs_path", "Requires path", json!({"type": "object"})),
                |args| match args.get("path") {
                    Some(v) => Ok(v.clone()),
                    None => Err(ToolError::missing("path")),
                },
            )))
            .unwrap();

        let result = manager.execute("needs_path", Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("path is required"));
    }

    #[test]
    fn test_list_sorted_by_name() {
        let manager = ToolManager::new("/tmp");
        manager.register_tool(echo_tool("zeta", "z")).unwrap();
        manager.register_tool(echo_tool("alpha", "a")).unwrap();

        let names: Vec<String> = manager.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(manager.lookup("alpha").is_some());
        assert!(manager.lookup("missing").is_none());
    }

    #[test]
    fn test_resolve_path() {
        let manager = ToolManager::new("/srv/project");
        assert_eq!(manager.resolve_path("a/b.txt"), PathBuf::from("/srv/project/a/b.txt"));
        assert_eq!(manager.resolve_path("/abs/c.txt"), PathBuf::from("/abs/c.txt"));
    }
}
