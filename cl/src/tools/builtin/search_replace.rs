//! search_replace tool - replace the first occurrence of a string in a file

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::params::{required_non_empty_str, required_str};
use crate::tools::{Tool, ToolContext, ToolError};

#[derive(Debug, Default, Serialize)]
struct SearchReplaceOutput {
    file_path: String,
    old_string: String,
    new_string: String,
    replaced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_line: Option<String>,
    message: String,
}

/// Replace text on the first line that contains it
pub struct SearchReplaceTool;

#[async_trait]
impl Tool for SearchReplaceTool {
    fn name(&self) -> &'static str {
        "search_replace"
    }

    fn description(&self) -> &'static str {
        "Replace the first occurrence of old_string in a file with new_string. Only the first \
         matching line is changed. Include enough surrounding text in old_string to make the \
         match unique."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to edit, relative to the workspace or absolute"
                },
                "old_string": {
                    "type": "string",
                    "description": "Text to replace (must appear on a single line)"
                },
                "new_string": {
                    "type": "string",
                    "description": "Replacement text"
                }
            },
            "required": ["file_path", "old_string", "new_string"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "SearchReplaceTool::execute: called");
        let file_path = required_non_empty_str(&input, "file_path")?;
        let old_string = required_non_empty_str(&input, "old_string")?;
        let new_string = required_str(&input, "new_string")?;

        let path = ctx.resolve(file_path);
        let mut output = SearchReplaceOutput {
            file_path: path.to_string_lossy().to_string(),
            old_string: old_string.to_string(),
            new_string: new_string.to_string(),
            ..Default::default()
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "SearchReplaceTool::execute: file not found");
                output.message = format!("File not found: {}", path.display());
                return to_value(output);
            }
            Err(e) => return Err(ToolError::io("read", path, e)),
        };

        let old = old_string.as_bytes();
        let mut lines = split_lines(&bytes);

        let Some((index, at)) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| find_bytes(line, old).map(|at| (i, at)))
        else {
            debug!("SearchReplaceTool::execute: old string not found");
            output.message = "Old string not found in file".to_string();
            return to_value(output);
        };

        // Only the target line is rebuilt; every other line keeps its raw bytes
        let original = lines[index];
        let mut replaced_line = Vec::with_capacity(original.len() + new_string.len());
        replaced_line.extend_from_slice(&original[..at]);
        replaced_line.extend_from_slice(new_string.as_bytes());
        replaced_line.extend_from_slice(&original[at + old.len()..]);
        lines[index] = &replaced_line;

        let mut rewritten = lines.join(&b'\n');
        if !lines.is_empty() {
            rewritten.push(b'\n');
        }
        tokio::fs::write(&path, rewritten)
            .await
            .map_err(|e| ToolError::io("write", &path, e))?;

        let line_number = index + 1;
        debug!(line_number, "SearchReplaceTool::execute: replaced");
        output.replaced = true;
        output.line_number = Some(line_number);
        output.original_line = Some(String::from_utf8_lossy(original).into_owned());
        output.new_line = Some(String::from_utf8_lossy(&replaced_line).into_owned());
        output.message = format!("Successfully replaced text on line {}", line_number);
        to_value(output)
    }
}

/// Split raw file bytes into lines, dropping `\n` and a trailing `\r`
fn split_lines(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn to_value(output: SearchReplaceOutput) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
}
