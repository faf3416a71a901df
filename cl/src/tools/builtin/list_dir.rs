//! list_dir tool - list the immediate children of a directory

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::tools::params::required_str;
use crate::tools::{Tool, ToolContext, ToolError};

#[derive(Debug, Serialize)]
struct DirItem {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_str: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_count: Option<String>,
}

impl DirItem {
    fn is_dir(&self) -> bool {
        self.kind == "directory"
    }
}

#[derive(Debug, Serialize)]
struct ListDirOutput {
    path: String,
    items: Vec<DirItem>,
    count: usize,
}

/// Human-readable size with 1024 scaling
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size < KB {
        format!("{}B", size)
    } else if size < MB {
        format!("{:.1}KB", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.1}MB", size as f64 / MB as f64)
    } else {
        format!("{:.1}GB", size as f64 / GB as f64)
    }
}

async fn count_items(dir: &Path) -> String {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return "? items".to_string();
    };
    let mut count = 0usize;
    loop {
        match entries.next_entry().await {
            Ok(Some(_)) => count += 1,
            Ok(None) => break,
            Err(_) => return "? items".to_string(),
        }
    }
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

/// List directory contents
pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &'static str {
        "list_dir"
    }

    fn description(&self) -> &'static str {
        "List the contents of a directory. The quick tool for discovery before using more \
         targeted tools like file reading or searching."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "relative_workspace_path": {
                    "type": "string",
                    "description": "Path to list contents of, relative to the workspace root"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this tool is being used"
                }
            },
            "required": ["relative_workspace_path"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "ListDirTool::execute: called");
        let relative = required_str(&input, "relative_workspace_path")?;
        let path = ctx.resolve(relative);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::DirectoryNotFound { path });
            }
            Err(e) => return Err(ToolError::io("access", path, e)),
        };
        if !metadata.is_dir() {
            debug!(?path, "ListDirTool::execute: not a directory");
            return Err(ToolError::NotADirectory { path });
        }

        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::io("read directory", &path, e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::io("read directory", &path, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);

            let item = if is_dir {
                DirItem {
                    name,
                    kind: "directory",
                    size: None,
                    size_str: None,
                    item_count: Some(count_items(&entry.path()).await),
                }
            } else {
                let size = entry.metadata().await.ok().map(|m| m.len());
                DirItem {
                    name,
                    kind: "file",
                    size,
                    size_str: size.map(format_size),
                    item_count: None,
                }
            };
            items.push(item);
        }

        items.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        debug!(count = items.len(), "ListDirTool::execute: listed");

        let output = ListDirOutput {
            path: path.to_string_lossy().to_string(),
            count: items.len(),
            items,
        };
        serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
