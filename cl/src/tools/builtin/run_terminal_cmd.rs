//! run_terminal_cmd tool - execute shell commands in the working directory

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::tools::params::{required_bool, required_non_empty_str};
use crate::tools::{Tool, ToolContext, ToolError};

#[derive(Debug, Default, Serialize)]
struct RunTerminalCmdOutput {
    command: String,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    exit_code: i32,
    is_background: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
}

/// Collapse a multi-line command onto one line
fn normalize_command(command: &str) -> String {
    command.replace('\n', " ").trim().to_string()
}

/// Shell invocation whose stderr shares stdout's pipe, so output keeps the
/// order in which the command wrote it
fn combined_output_command(command: &str) -> Command {
    if cfg!(windows) {
        shell_command(&format!("({}) 2>&1", command))
    } else {
        shell_command(&format!("exec 2>&1; {}", command))
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Execute a shell command
pub struct RunTerminalCmdTool;

#[async_trait]
impl Tool for RunTerminalCmdTool {
    fn name(&self) -> &'static str {
        "run_terminal_cmd"
    }

    fn description(&self) -> &'static str {
        "Run a terminal command in the workspace directory. The user is not available to interact, \
         so pass non-interactive flags (e.g. --yes). Append ` | cat` to commands that would use a \
         pager. Set is_background to true for long-running commands such as servers instead of \
         changing the command itself. Do not include newlines in the command."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The terminal command to execute"
                },
                "is_background": {
                    "type": "boolean",
                    "description": "Whether the command should run in the background"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this command needs to be run"
                }
            },
            "required": ["command", "is_background"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "RunTerminalCmdTool::execute: called");
        let command = normalize_command(required_non_empty_str(&input, "command")?);
        if command.is_empty() {
            return Err(ToolError::missing("command"));
        }
        let is_background = required_bool(&input, "is_background")?;

        let mut output = RunTerminalCmdOutput {
            command: command.clone(),
            is_background,
            ..Default::default()
        };

        if is_background {
            let mut cmd = shell_command(&command);
            cmd.current_dir(ctx.absolute_work_dir());
            let mut child = cmd
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(ToolError::CommandLaunch)?;

            let pid = child.id().unwrap_or_default();
            info!(%command, pid, "RunTerminalCmdTool::execute: started background command");
            tokio::spawn(async move {
                match child.wait().await {
                    Ok(status) => debug!(pid, %status, "background command exited"),
                    Err(e) => debug!(pid, %e, "background command wait failed"),
                }
            });

            output.pid = Some(pid);
            output.output = format!("Command started in background with PID: {}", pid);
            return serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()));
        }

        debug!(%command, "RunTerminalCmdTool::execute: running foreground command");
        let mut cmd = combined_output_command(&command);
        cmd.current_dir(ctx.absolute_work_dir());
        let result = cmd
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(ToolError::CommandLaunch)?;

        output.output = String::from_utf8_lossy(&result.stdout).into_owned();
        debug!(output_len = output.output.len(), "RunTerminalCmdTool::execute: output length");

        if result.status.success() {
            output.exit_code = 0;
        } else {
            output.exit_code = result.status.code().unwrap_or(-1);
            output.error = Some(format!("command exited with {}", result.status));
            debug!(exit_code = output.exit_code, "RunTerminalCmdTool::execute: command failed");
        }

        serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("  echo a\necho b \n"), "echo a echo b");
    }

    #[tokio::test]
    async fn test_run_foreground_in_work_dir() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "").unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = RunTerminalCmdTool
            .execute(json!({"command": "ls", "is_background": false}), &ctx)
            .await
            .unwrap();

        assert_eq!(value["exit_code"], 0);
        assert!(value["output"].as_str().unwrap().contains("marker.txt"));
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_run_interleaves_stdout_and_stderr() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = RunTerminalCmdTool
            .execute(
                json!({"command": "echo err 1>&2; echo out; echo err2 1>&2", "is_background": false}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(value["output"], "err\nout\nerr2\n");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = RunTerminalCmdTool
            .execute(json!({"command": "exit 3", "is_background": false}), &ctx)
            .await
            .unwrap();

        assert_eq!(value["exit_code"], 3);
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn test_run_background_returns_pid() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = RunTerminalCmdTool
            .execute(json!({"command": "sleep 1", "is_background": true}), &ctx)
            .await
            .unwrap();

        let pid = value["pid"].as_u64().unwrap();
        assert!(pid > 0);
        assert_eq!(
            value["output"],
            format!("Command started in background with PID: {}", pid)
        );
    }

    #[tokio::test]
    async fn test_run_requires_is_background() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let err = RunTerminalCmdTool
            .execute(json!({"command": "echo hi"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
