//! read_file tool - read a whole file or an inclusive line range

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::params::{optional_int, optional_str, required_bool, required_non_empty_str};
use crate::tools::{Tool, ToolContext, ToolError};

/// Largest range a single call may return
pub const MAX_RANGE_LINES: usize = 250;

/// Smallest partial range allowed once a file reaches this many lines
pub const MIN_RANGE_LINES: usize = 200;

#[derive(Debug, Serialize)]
struct ReadFileOutput {
    content: String,
    total_lines: usize,
    start_line: usize,
    end_line: usize,
    file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines_not_shown: Option<String>,
    read_entire_file: bool,
}

/// Reported instead of content when the target does not exist
#[derive(Debug, Serialize)]
struct MissingFileOutput {
    file_path: String,
    file_exists: bool,
    message: String,
}

/// Read file contents
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read the contents of a file. Returns the 1-indexed lines from start_line_one_indexed to \
         end_line_one_indexed_inclusive together with a summary of the lines outside that range. \
         A single call can view at most 250 lines, and at least 200 lines when the file is that long. \
         If the lines you viewed are not enough, call the tool again for the lines not shown. \
         Reading the entire file is slow for large files; use should_read_entire_file sparingly."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_file": {
                    "type": "string",
                    "description": "Path of the file to read, relative to the workspace or absolute"
                },
                "should_read_entire_file": {
                    "type": "boolean",
                    "description": "Whether to read the entire file"
                },
                "start_line_one_indexed": {
                    "type": "integer",
                    "description": "One-indexed line to start reading from (inclusive)"
                },
                "end_line_one_indexed_inclusive": {
                    "type": "integer",
                    "description": "One-indexed line to stop reading at (inclusive)"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this tool is being used"
                }
            },
            "required": ["target_file", "should_read_entire_file"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "ReadFileTool::execute: called");
        let target = required_non_empty_str(&input, "target_file")?;
        let entire = required_bool(&input, "should_read_entire_file")?;
        let start = optional_int(&input, "start_line_one_indexed")?;
        let end = optional_int(&input, "end_line_one_indexed_inclusive")?;
        if let Some(explanation) = optional_str(&input, "explanation")? {
            debug!(%explanation, "ReadFileTool::execute: explanation");
        }

        let path = ctx.resolve(target);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "ReadFileTool::execute: file not found");
                let output = MissingFileOutput {
                    file_path: path.to_string_lossy().to_string(),
                    file_exists: false,
                    message: format!("File not found: {}", path.display()),
                };
                return serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()));
            }
            Err(e) => return Err(ToolError::io("read", path, e)),
        };

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let file_path = path.to_string_lossy().to_string();

        let output = if entire {
            debug!(total = lines.len(), "ReadFileTool::execute: reading entire file");
            ReadFileOutput {
                content: lines.join("\n"),
                total_lines: lines.len(),
                start_line: 1,
                end_line: lines.len(),
                file_path,
                lines_not_shown: None,
                read_entire_file: true,
            }
        } else {
            let start = start.ok_or_else(|| ToolError::missing("start_line_one_indexed"))?;
            let end = end.ok_or_else(|| ToolError::missing("end_line_one_indexed_inclusive"))?;
            read_range(&lines, start, end, file_path)?
        };

        serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

fn read_range(lines: &[&str], start: i64, end: i64, file_path: String) -> Result<ReadFileOutput, ToolError> {
    let total = lines.len();
    let start = start.max(1);
    if end < start {
        return Err(ToolError::InvalidRange(format!(
            "end_line ({}) must be >= start_line ({})",
            end, start
        )));
    }

    let start = start as usize;
    if start > total {
        return Err(ToolError::InvalidRange(format!(
            "start_line ({}) exceeds total lines ({})",
            start, total
        )));
    }
    let end = (end as usize).min(total);

    let count = end - start + 1;
    if count > MAX_RANGE_LINES {
        debug!(count, "read_range: range too large");
        return Err(ToolError::InvalidRange(format!(
            "cannot read more than {} lines at once (requested: {})",
            MAX_RANGE_LINES, count
        )));
    }
    if count < MIN_RANGE_LINES && total >= MIN_RANGE_LINES && end < total {
        let suggested_end = (start + MIN_RANGE_LINES - 1).min(total);
        debug!(count, suggested_end, "read_range: range too small");
        return Err(ToolError::InvalidRange(format!(
            "minimum {} lines required when file has >= {} lines. Consider reading lines {}-{}",
            MIN_RANGE_LINES, MIN_RANGE_LINES, start, suggested_end
        )));
    }

    let mut not_shown = Vec::new();
    if start > 1 {
        not_shown.push(format!("Lines 1-{} not shown", start - 1));
    }
    if end < total {
        not_shown.push(format!("Lines {}-{} not shown", end + 1, total));
    }

    Ok(ReadFileOutput {
        content: lines[start - 1..end].join("\n"),
        total_lines: total,
        start_line: start,
        end_line: end,
        file_path,
        lines_not_shown: (!not_shown.is_empty()).then(|| not_shown.join("; ")),
        read_entire_file: false,
    })
}
