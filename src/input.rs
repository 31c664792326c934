//! Input directory scanning.
//!
//! Walks `input.dir`, keeps files matching `include_globs` (case-insensitive,
//! so `REPORT.PDF` is picked up by `**/*.pdf`), drops `exclude_globs`, and
//! returns them sorted by relative path for deterministic document order.

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::error::DocrankError;
use crate::extract::{content_type_for_path, MIME_PDF};

/// A file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated. Used as document id.
    pub id: String,
    pub content_type: &'static str,
}

pub fn scan_inputs(input: &InputConfig) -> Result<Vec<InputFile>> {
    let root = &input.dir;
    if !root.is_dir() {
        return Err(DocrankError::NoInput {
            location: format!("{} (directory does not exist)", root.display()),
        }
        .into());
    }

    let include_set = build_globset(&input.include_globs)?;
    let exclude_set = build_globset(&input.exclude_globs)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(input.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative_id(relative);

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(InputFile {
            path: path.to_path_buf(),
            id: rel_str,
            // Unknown extensions go to the PDF reader, which rejects them
            // per document instead of silently dropping them here.
            content_type: content_type_for_path(path).unwrap_or(MIME_PDF),
        });
    }

    files.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!(root = %root.display(), count = files.len(), "scanned input directory");

    Ok(files)
}

fn relative_id(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MIME_TEXT;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &Path, globs: &[&str]) -> InputConfig {
        InputConfig {
            dir: root.to_path_buf(),
            include_globs: globs.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn picks_pdfs_case_insensitively_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        fs::write(tmp.path().join("A.PDF"), b"x").unwrap();
        fs::write(tmp.path().join("notes.md"), b"x").unwrap();

        let files = scan_inputs(&config_for(tmp.path(), &["**/*.pdf"])).unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["A.PDF", "b.pdf"]);
        assert!(files.iter().all(|f| f.content_type == MIME_PDF));
    }

    #[test]
    fn nested_files_use_relative_ids() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("reports")).unwrap();
        fs::write(tmp.path().join("reports").join("q1.txt"), b"x").unwrap();

        let files = scan_inputs(&config_for(tmp.path(), &["**/*.txt"])).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "reports/q1.txt");
        assert_eq!(files[0].content_type, MIME_TEXT);
    }

    #[test]
    fn excludes_are_applied() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.pdf"), b"x").unwrap();
        fs::write(tmp.path().join("draft.pdf"), b"x").unwrap();

        let mut cfg = config_for(tmp.path(), &["**/*.pdf"]);
        cfg.exclude_globs = vec!["draft*".to_string()];
        let files = scan_inputs(&cfg).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "keep.pdf");
    }

    #[test]
    fn missing_directory_is_no_input() {
        let tmp = TempDir::new().unwrap();
        let err = scan_inputs(&config_for(&tmp.path().join("nope"), &["**/*.pdf"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DocrankError>(),
            Some(DocrankError::NoInput { .. })
        ));
    }
}
