//! file_search tool - fuzzy match file paths under the working directory

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::tools::params::required_non_empty_str;
use crate::tools::{Tool, ToolContext, ToolError};

/// Most matches returned by one search
pub const MAX_RESULTS: usize = 10;

const SKIPPED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "o", "a", "jar", "war", "zip", "tar", "gz", "7z", "rar", "jpg", "jpeg", "png",
    "gif", "bmp", "svg", "ico", "mp3", "mp4", "avi", "mov", "wav", "pdf",
];

#[derive(Debug, Serialize)]
struct FileMatch {
    path: String,
    score: f64,
    #[serde(rename = "match")]
    description: String,
}

#[derive(Debug, Serialize)]
struct FileSearchOutput {
    query: String,
    matches: Vec<FileMatch>,
    count: usize,
}

fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Score a workspace-relative path against a query, from 0 to 100
pub fn fuzzy_score(query: &str, path: &str) -> f64 {
    let query = query.to_lowercase();
    let path = path.to_lowercase();
    let file_name = file_name_of(&path);

    if file_name == query {
        return 100.0;
    }

    let query_len = query.chars().count() as f64;
    if file_name.contains(&query) {
        return 80.0 + query_len / file_name.chars().count() as f64 * 20.0;
    }
    if path.contains(&query) {
        return 60.0 + query_len / path.chars().count() as f64 * 20.0;
    }

    let query_chars: Vec<char> = query.chars().collect();
    let name_chars: Vec<char> = file_name.chars().collect();
    let mut score = 0.0;
    let mut qi = 0;
    for (i, c) in name_chars.iter().enumerate() {
        if qi < query_chars.len() && *c == query_chars[qi] {
            score += 1.0;
            qi += 1;
            if qi < query_chars.len() && name_chars.get(i + 1) == Some(&query_chars[qi]) {
                score += 0.5;
            }
        }
    }

    if query_chars.is_empty() {
        return 0.0;
    }
    score / query_len * 50.0
}

fn describe_match(query: &str, path: &str) -> String {
    let query = query.to_lowercase();
    let path = path.to_lowercase();
    let file_name = file_name_of(&path);
    let dir = &path[..path.len() - file_name.len()];

    if file_name.contains(&query) {
        format!("Filename contains '{}'", query)
    } else if dir.contains(&query) {
        format!("Directory path contains '{}'", query)
    } else {
        "Fuzzy match".to_string()
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_skipped_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext.as_str()))
}

/// Collect candidate files as workspace-relative, `/`-separated paths
fn collect_files(ctx: &ToolContext) -> Vec<String> {
    WalkDir::new(&ctx.work_dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_skipped_extension(e.path()))
        .map(|e| ctx.display_path(e.path()))
        .collect()
}

/// Fuzzy file path search
pub struct FileSearchTool;

#[async_trait]
impl Tool for FileSearchTool {
    fn name(&self) -> &'static str {
        "file_search"
    }

    fn description(&self) -> &'static str {
        "Fast file search based on fuzzy matching against file paths. Use it when you know part of \
         a file path but not where it is. Results are capped at 10; make the query more specific \
         to narrow them."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Fuzzy filename to search for"
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
        debug!(?input, "FileSearchTool::execute: called");
        let query = required_non_empty_str(&input, "query")?.to_string();

        let walk_ctx = ctx.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&walk_ctx))
            .await
            .map_err(|e| ToolError::Failed(format!("file walk failed: {}", e)))?;
        debug!(candidates = files.len(), "FileSearchTool::execute: files collected");

        let mut matches: Vec<FileMatch> = files
            .into_iter()
            .filter_map(|path| {
                let score = fuzzy_score(&query, &path);
                (score > 0.0).then(|| FileMatch {
                    description: describe_match(&query, &path),
                    path,
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        matches.truncate(MAX_RESULTS);

        let output = FileSearchOutput {
            query,
            count: matches.len(),
            matches,
        };
        serde_json::to_value(output).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_fuzzy_score_tiers() {
        assert_eq!(fuzzy_score("app.ts", "src/app.ts"), 100.0);
        assert!(fuzzy_score("app", "src/app.ts") >= 80.0);
        let dir_score = fuzzy_score("src", "src/main.rs");
        assert!((60.0..80.0).contains(&dir_score));
        assert_eq!(fuzzy_score("xyz", "readme.md"), 0.0);
    }

    #[test]
    fn test_fuzzy_subsequence() {
        // "mrs" over "main.rs": m, r, s each match once
        let score = fuzzy_score("mrs", "main.rs");
        assert!(score > 0.0 && score < 60.0);
        assert_eq!(describe_match("mrs", "main.rs"), "Fuzzy match");
    }

    proptest! {
        #[test]
        fn prop_fuzzy_score_bounded(query in "[a-z./]{1,12}", path in "[a-z]{1,8}(/[a-z.]{1,10}){0,3}") {
            let score = fuzzy_score(&query, &path);
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }

    #[tokio::test]
    async fn test_file_search_ranks_filename_matches() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/app.ts"), "").unwrap();
        fs::write(temp.path().join("src/app.test.ts"), "").unwrap();
        fs::write(temp.path().join("readme.md"), "").unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = FileSearchTool.execute(json!({"query": "app"}), &ctx).await.unwrap();
        let matches = value["matches"].as_array().unwrap();

        assert_eq!(matches[0]["path"], "src/app.ts");
        assert_eq!(matches[1]["path"], "src/app.test.ts");
        for m in &matches[..2] {
            assert!(m["score"].as_f64().unwrap() >= 80.0);
            assert_eq!(m["match"], "Filename contains 'app'");
        }

        // readme.md only shares the 'a', so it trails as a weak fuzzy match
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[2]["path"], "readme.md");
        assert!(matches[2]["score"].as_f64().unwrap() < 60.0);
    }

    #[tokio::test]
    async fn test_file_search_caps_and_skips() {
        let temp = tempdir().unwrap();
        for i in 0..15 {
            fs::write(temp.path().join(format!("note{}.txt", i)), "").unwrap();
        }
        fs::write(temp.path().join("note.png"), "").unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/note.txt"), "").unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let value = FileSearchTool.execute(json!({"query": "note"}), &ctx).await.unwrap();
        let matches = value["matches"].as_array().unwrap();

        assert_eq!(matches.len(), MAX_RESULTS);
        assert_eq!(value["count"], 10);
        for m in matches {
            let path = m["path"].as_str().unwrap();
            assert!(!path.starts_with(".git"));
            assert!(!path.ends_with(".png"));
        }
    }

    #[tokio::test]
    async fn test_file_search_requires_query() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());
        let err = FileSearchTool.execute(json!({"query": ""}), &ctx).await.unwrap_err();
        assert!(err.is_contract_violation());
    }
}
