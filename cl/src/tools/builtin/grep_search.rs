//! grep_search tool - regex search over workspace files
//!
//! Uses the `rg` executable when it is on PATH, otherwise searches in
//! process with the ripgrep library crates.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use grep_searcher::sinks::UTF8;
use grep_searcher::{BinaryDetection, SearcherBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::tools::params::{optional_bool, optional_str, required_non_empty_str};
use crate::tools::{Tool, ToolContext, ToolError};

/// Most matches returned by one search
pub const MAX_MATCHES: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    pub content: String,
    #[serde(rename = "match")]
    pub matched: String,
}

#[derive(Debug, Serialize)]
struct GrepSearchOutput {
    query: String,
    matches: Vec<GrepMatch>,
    total_matches: usize,
    matched_files: usize,
    case_sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_pattern: Option<String>,
    engine: &'static str,
}

/// Parameters of one search, shared by both engines
#[derive(Debug, Clone)]
pub struct GrepQuery {
    pub pattern: String,
    pub case_sensitive: bool,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

impl GrepQuery {
    /// Compile the pattern the way the in-process engine runs it
    pub fn matcher(&self) -> Result<RegexMatcher, ToolError> {
        let pattern = if self.case_sensitive {
            self.pattern.clone()
        } else {
            format!("(?i){}", self.pattern)
        };
        RegexMatcherBuilder::new()
            .build(&pattern)
            .map_err(|e| ToolError::InvalidRegex(e.to_string()))
    }
}

/// Locate an executable on PATH
fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let names = if cfg!(windows) {
        vec![format!("{}.exe", program), program.to_string()]
    } else {
        vec![program.to_string()]
    };
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

fn matched_text(matcher: &RegexMatcher, line: &str, fallback: &str) -> String {
    match matcher.find(line.as_bytes()) {
        Ok(Some(m)) => line.get(m.start()..m.end()).unwrap_or(fallback).to_string(),
        _ => fallback.to_string(),
    }
}

/// Parse one `file\0line:column:content` line of `rg --null` output
fn parse_rg_line(line: &str, matcher: &RegexMatcher, query: &str) -> Option<GrepMatch> {
    let (file, rest) = line.split_once('\0')?;
    let mut parts = rest.splitn(3, ':');
    let line_number = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    let content = parts.next()?.trim_end_matches('\r');

    Some(GrepMatch {
        file: file.strip_prefix("./").unwrap_or(file).to_string(),
        line: line_number,
        column: Some(column),
        content: content.to_string(),
        matched: matched_text(matcher, content, query),
    })
}

async fn search_with_rg(
    rg: &Path,
    query: &GrepQuery,
    matcher: &RegexMatcher,
    ctx: &ToolContext,
) -> Result<Vec<GrepMatch>, ToolError> {
    debug!(?rg, "search_with_rg: called");
    let mut cmd = tokio::process::Command::new(rg);
    cmd.args([
        "--no-heading",
        "--null",
        "--line-number",
        "--column",
        "--color=never",
        "--max-count=50",
    ]);
    if !query.case_sensitive {
        cmd.arg("--ignore-case");
    }
    if let Some(include) = &query.include {
        cmd.arg("--glob").arg(include);
    }
    if let Some(exclude) = &query.exclude {
        cmd.arg("--glob").arg(format!("!{}", exclude));
    }
    cmd.arg("-e").arg(&query.pattern).arg(".");
    cmd.current_dir(ctx.absolute_work_dir());

    let output = cmd.output().await.map_err(ToolError::CommandLaunch)?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    // exit code 1 means no matches; 2 is an error, possibly with partial output
    if output.status.code() == Some(2) && stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(%stderr, "search_with_rg: rg failed");
        return Err(ToolError::Failed(format!("rg failed: {}", stderr.trim())));
    }

    Ok(stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| parse_rg_line(l, matcher, &query.pattern))
        .take(MAX_MATCHES)
        .collect())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Match a glob the way rg's `--glob` does: patterns without a `/` match
/// the file name at any depth, others match the path relative to the root
fn glob_matches(pattern: &glob::Pattern, relative: &Path) -> bool {
    if pattern.as_str().contains('/') {
        pattern.matches_path(relative)
    } else {
        relative
            .file_name()
            .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
    }
}

/// In-process search over the working directory
pub fn search_in_process(
    query: &GrepQuery,
    matcher: &RegexMatcher,
    ctx: &ToolContext,
) -> Result<Vec<GrepMatch>, ToolError> {
    debug!(pattern = %query.pattern, "search_in_process: called");
    let include = query
        .include
        .as_deref()
        .map(glob::Pattern::new)
        .transpose()
        .map_err(|e| ToolError::invalid(format!("include_pattern ({})", e), "a valid glob"))?;
    let exclude = query
        .exclude
        .as_deref()
        .map(glob::Pattern::new)
        .transpose()
        .map_err(|e| ToolError::invalid(format!("exclude_pattern ({})", e), "a valid glob"))?;

    let mut searcher = SearcherBuilder::new()
        .binary_detection(BinaryDetection::quit(b'\x00'))
        .line_number(true)
        .build();

    let files = WalkDir::new(&ctx.work_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let relative = e.path().strip_prefix(&ctx.work_dir).unwrap_or(e.path());
            include.as_ref().is_none_or(|p| glob_matches(p, relative))
                && !exclude.as_ref().is_some_and(|p| glob_matches(p, relative))
        });

    let mut matches: Vec<GrepMatch> = Vec::new();
    for entry in files {
        if matches.len() >= MAX_MATCHES {
            debug!("search_in_process: max matches reached");
            break;
        }

        let file = ctx.display_path(entry.path());
        let result = searcher.search_path(
            matcher,
            entry.path(),
            UTF8(|line_number, line| {
                let content = line.trim_end_matches(['\n', '\r']);
                matches.push(GrepMatch {
                    file: file.clone(),
                    line: line_number,
                    column: None,
                    content: content.to_string(),
                    matched: matched_text(matcher, content, &query.pattern),
                });
                Ok(matches.len() < MAX_MATCHES)
            }),
        );

        if let Err(e) = result {
            debug!(path = ?entry.path(), %e, "search_in_process: skipping file");
        }
    }

    Ok(matches)
}

/// Regex search across files
pub struct GrepSearchTool;

#[async_trait]
impl Tool for GrepSearchTool {
    fn name(&self) -> &'static str {
        "grep_search"
    }

    fn description(&self) -> &'static str {
        "Fast exact regex search over text files, powered by ripgrep. Best when you know the exact \
         symbol or string to look for. Results are capped at 50 matches; use include_pattern or \
         exclude_pattern to narrow the files searched. Escape regex special characters such as \
         ( ) [ ] { } + * ? ^ $ | . and \\ when searching for them literally."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The regex pattern to search for"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Whether the search should be case sensitive"
                },
                "include_pattern": {
                    "type": "string",
                    "description": "Glob pattern for files to include (e.g. '*.ts')"
                },
                "exclude_pattern": {
                    "type": "string",
                    "description": "Glob pattern for files to exclude"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence explanation of why this tool is being used"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "GrepSearchTool::execute: called");
        let query = GrepQuery {
            pattern: required_non_empty_str(&input, "query")?.to_string(),
            case_sensitive: optional_bool(&input, "case_sensitive", false)?,
            include: optional_str(&input, "include_pattern")?.map(str::to_string),
            exclude: optional_str(&input, "exclude_pattern")?.map(str::to_string),
        };
        let matcher = query.matcher()?;

        let (matches, engine) = match find_in_path("rg") {
            Some(rg) => (search_with_rg(&rg, &query, &matcher, ctx).await?, "ripgrep"),
            None => {
                debug!("GrepSearchTool::execute: rg not found, using in-process search");
                let (q, m, c) = (query.clone(), matcher.clone(), ctx.clone());
                let matches = tokio::task::spawn_blocking(move || search_in_process(&q, &m, &c))
                    .await
                    .map_err(|e| ToolError::Failed(format!("search task failed: {}", e)))??;
                (matches, "builtin")
            }
        };

        let matched_files = matches.iter().map(|m| m.file.as_str()).collect::<HashSet<_>>().len();
        debug!(total = matches.len(), matched_files, engine, "GrepSearchTool::execute: search complete");

        let output = GrepSearchOutput {
            query: query.pattern,
            total_matches: matches.len(),
            matched_files,
            matches,
            case_sensitive: query.case_sensitive,
            include_pattern: query.include,
            exclude_pattern: query.exclude,
            engine,
        };
        serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
