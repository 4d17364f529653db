//! On-disk layout of analysis outputs.

use std::path::{Path, PathBuf};

/// Output directories for a run: knowledge bases and summaries under one
/// analysis root.
#[derive(Debug, Clone)]
pub struct AnalysisLayout {
    pub knowledge_dir: PathBuf,
    pub summaries_dir: PathBuf,
}

impl AnalysisLayout {
    /// Standard layout under a root: `knowledge_bases/` and `summaries/`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            knowledge_dir: root.join("knowledge_bases"),
            summaries_dir: root.join("summaries"),
        }
    }

    /// Create the output directories if missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.knowledge_dir)?;
        std::fs::create_dir_all(&self.summaries_dir)?;
        Ok(())
    }

    /// Delete previously generated files for a fresh run. Only files are
    /// removed; the directories themselves and anything nested stay.
    pub fn clean_outputs(&self) -> std::io::Result<()> {
        for dir in [&self.knowledge_dir, &self.summaries_dir] {
            if !dir.exists() {
                continue;
            }
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    std::fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}
