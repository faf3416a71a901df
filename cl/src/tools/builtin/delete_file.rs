//! delete_file tool - remove a single file

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::params::required_non_empty_str;
use crate::tools::security::check_path;
use crate::tools::{Tool, ToolContext, ToolError};

#[derive(Debug, Default, Serialize)]
struct DeleteFileOutput {
    deleted: bool,
    file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_info: Option<String>,
    message: String,
}

/// Delete a file
pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete_file"
    }

    fn description(&self) -> &'static str {
        "Delete a file at the specified path. Directories cannot be deleted, and the operation \
         fails gracefully if the file does not exist or is protected."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_file": {
                    "type": "string",
                    "description": "Path of the file to delete, relative to the workspace or absolute"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this tool is being used"
                }
            },
            "required": ["target_file"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "DeleteFileTool::execute: called");
        let target = required_non_empty_str(&input, "target_file")?;
        let path = ctx.resolve(target);
        let mut output = DeleteFileOutput {
            file_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "DeleteFileTool::execute: file does not exist");
                output.message = "File does not exist".to_string();
                return to_value(output);
            }
            Err(e) => return Err(ToolError::io("access", path, e)),
        };

        if metadata.is_dir() {
            debug!(?path, "DeleteFileTool::execute: refusing directory");
            output.file_info = Some(format!("Directory with {} bytes", metadata.len()));
            output.message = "Cannot delete directories with this tool".to_string();
            return to_value(output);
        }
        output.file_info = Some(format!("File with {} bytes", metadata.len()));

        if let Err(violation) = check_path(&path) {
            debug!(%violation, "DeleteFileTool::execute: security check failed");
            output.message = format!("Security check failed: {}", violation);
            return to_value(output);
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::io("delete", &path, e))?;

        debug!(?path, "DeleteFileTool::execute: deleted");
        output.deleted = true;
        output.message = "File successfully deleted".to_string();
        to_value(output)
    }
}

fn to_value(output: DeleteFileOutput) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
}
