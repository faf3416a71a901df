//! System prompt rendering

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Built-in system prompt template
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../prompts/system.pmt");

#[derive(Debug, Serialize)]
struct PromptContext {
    working_dir: String,
    os: &'static str,
}

/// Render the system prompt for `work_dir`, using `template` when given
pub fn render_system_prompt(template: Option<&str>, work_dir: &Path) -> Result<String> {
    debug!(?work_dir, custom = template.is_some(), "render_system_prompt: called");
    let template = template.unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(handlebars::no_escape);

    let context = PromptContext {
        working_dir: work_dir.display().to_string(),
        os: std::env::consts::OS,
    };

    hbs.render_template(template, &context)
        .map_err(|e| eyre!("Failed to render system prompt: {}", e))
}
