//! write_file tool - create or overwrite a file

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::params::{optional_bool, required_non_empty_str, required_str};
use crate::tools::security::check_path;
use crate::tools::{Tool, ToolContext, ToolError};

#[derive(Debug, Default, Serialize)]
struct WriteFileOutput {
    written: bool,
    created: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    file_exists: bool,
    bytes_written: usize,
    file_path: String,
    message: String,
}

/// Write content to a file
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write content to a file. Creates parent directories if needed. An existing file is only \
         replaced when overwrite is true. Writes into system directories or of executable file \
         types are refused."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_file": {
                    "type": "string",
                    "description": "Path of the file to write, relative to the workspace or absolute"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                },
                "overwrite": {
                    "type": "boolean",
                    "description": "Replace the file if it already exists. Defaults to false."
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this tool is being used"
                }
            },
            "required": ["target_file", "content"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!("WriteFileTool::execute: called");
        let target = required_non_empty_str(&input, "target_file")?;
        let content = required_str(&input, "content")?;
        let overwrite = optional_bool(&input, "overwrite", false)?;

        let path = ctx.resolve(target);
        let mut output = WriteFileOutput {
            file_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ToolError::io("access", &path, e))?;
        if exists && !overwrite {
            debug!(?path, "WriteFileTool::execute: file exists, overwrite disabled");
            output.file_exists = true;
            output.message = "File exists and overwrite is not enabled".to_string();
            return to_value(output);
        }

        if let Err(violation) = check_path(&path) {
            debug!(%violation, "WriteFileTool::execute: security check failed");
            output.message = format!("Security check failed: {}", violation);
            return to_value(output);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("create directory", parent, e))?;
        }
        debug!("WriteFileTool::execute: parent directories ensured");

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::io("write", &path, e))?;

        output.written = true;
        output.created = !exists;
        output.bytes_written = content.len();
        output.message = if exists {
            format!("File overwritten successfully with {} bytes", content.len())
        } else {
            format!("File created successfully with {} bytes", content.len())
        };
        debug!(bytes = content.len(), "WriteFileTool::execute: file written successfully");
        to_value(output)
    }
}

fn to_value(output: WriteFileOutput) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
}
