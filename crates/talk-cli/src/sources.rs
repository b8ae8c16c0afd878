//! Source discovery: expand command-line paths into an ordered file list.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::config::TalkConfig;

/// Files are taken as given; directories are walked for sources with the
/// configured extension, sorted by path. Duplicates keep their first position.
pub fn discover(paths: &[PathBuf], config: &TalkConfig) -> Result<Vec<PathBuf>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();

    for path in paths {
        let found = if path.is_dir() {
            walk(path, config)?
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            bail!("no such file or directory: {}", path.display());
        };
        for file in found {
            if seen.insert(file.clone()) {
                out.push(file);
            }
        }
    }

    if out.is_empty() {
        bail!("no .{} sources found", config.source_extension);
    }
    tracing::debug!(files = out.len(), "discovered sources");
    Ok(out)
}

fn walk(root: &Path, config: &TalkConfig) -> Result<Vec<PathBuf>> {
    let max_depth = if config.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !config.exclude_dirs.iter().any(|excluded| *excluded == name)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == config.source_extension.as_str());
        if matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
