//! Document discovery and loading.
//!
//! Walks `[documents].dir`, keeps the files matching `include_globs` and turns
//! each into [`PageDocument`]s, one per page. Loading is all-or-nothing.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DocumentsConfig;
use crate::extract::{content_type_for, extract_pages};
use crate::models::PageDocument;

/// Find every file under the documents directory matching the include globs,
/// sorted by relative path.
pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<PathBuf>> {
    let root = &config.dir;
    if !root.is_dir() {
        bail!("Document directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to read directory {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Load every matching document and return its pages.
///
/// The load is all-or-nothing: an unreadable or unparseable file fails the
/// whole operation, as does a directory with no matching documents.
pub fn load_documents(config: &DocumentsConfig) -> Result<Vec<PageDocument>> {
    let files = scan_documents(config)?;
    if files.is_empty() {
        bail!(
            "No documents found in {} (patterns: {})",
            config.dir.display(),
            config.include_globs.join(", ")
        );
    }

    let mut pages = Vec::new();
    for path in &files {
        let loaded = load_file(path)?;
        tracing::debug!(file = %path.display(), pages = loaded.len(), "loaded document");
        pages.extend(loaded);
    }
    Ok(pages)
}

fn load_file(path: &Path) -> Result<Vec<PageDocument>> {
    let content_type = content_type_for(path)
        .ok_or_else(|| anyhow::anyhow!("Unsupported document type: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let texts = extract_pages(&bytes, content_type)
        .with_context(|| format!("Failed to extract {}", path.display()))?;

    let source = path.to_string_lossy().to_string();
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageDocument {
            source: source.clone(),
            page: Some(i as u32 + 1),
            text,
        })
        .collect())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
