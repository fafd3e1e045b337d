#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Page texts of the regulation used throughout the tests.
pub const SPO_PAGES: [&str; 2] = [
    "Paragraph 8 Versaeumnis einer Pruefung: die Pruefung gilt als nicht bestanden.",
    "Paragraph 21 Die Bachelorarbeit umfasst 12 LP und wird in acht Wochen bearbeitet.",
];

/// Glob list accepting both PDFs and `pdftotext`-style text dumps.
pub const INCLUDE_GLOBS: &str = r#"["**/*.pdf", "**/*.txt"]"#;

/// Regulation pages as a text dump, one form feed after every page.
pub fn spo_text() -> String {
    SPO_PAGES.iter().map(|p| format!("{}\x0c", p)).collect()
}

/// Temp workspace with `data/spo.txt` holding [`SPO_PAGES`].
pub fn workspace_with_spo() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("spo.txt"), spo_text()).unwrap();
    (tmp, data)
}

pub fn write_config(root: &Path, data_dir: &Path, base_url: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let content = format!(
        r#"[documents]
dir = "{}"
include_globs = {}

[chunking]
chunk_size = 1000
chunk_overlap = 200

[openai]
base_url = "{}"
"#,
        data_dir.display().to_string().replace('\\', "/"),
        INCLUDE_GLOBS,
        base_url
    );
    let path = config_dir.join("spo.toml");
    fs::write(&path, content).unwrap();
    path
}
