//! Project file discovery.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::analysis::AstFile;

/// Directories never descended into when looking for source files.
pub const IGNORED_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "env",
    "dist",
    "build",
    "target",
    "bin",
    "node_modules",
];

/// Compile `--exclude` globs. `**` matches across directories.
pub fn build_excludes(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// `path` relative to `root`, `/`-separated.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

/// Every `*.json` syntax tree under `root`, sorted by relative path.
///
/// If `root` is itself a file it is returned on its own.
pub fn collect_ast_files(root: &Path, excluded: &[String]) -> anyhow::Result<Vec<AstFile>> {
    let excludes = build_excludes(excluded)?;

    if root.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok(vec![AstFile::new(root, &name)]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if !is_json {
            continue;
        }
        let rel = relative_path(root, path);
        if excludes.is_match(&rel) {
            continue;
        }
        files.push(AstFile::new(path, &rel));
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

/// Source files under `root` whose extension `accept` recognizes, sorted.
pub fn collect_source_files<F>(root: &Path, accept: F) -> anyhow::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.depth() > 0 && e.file_type().is_dir() && IGNORED_DIRS.contains(&name.as_ref()))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if accept(ext) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_collect_ast_files_sorted_and_relative() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "routes/user.py.json");
        touch(temp.path(), "app.py.json");
        touch(temp.path(), "README.md");
        touch(temp.path(), ".cache/x.json");

        let files = collect_ast_files(temp.path(), &[]).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["app.py.json", "routes/user.py.json"]);
    }

    #[test]
    fn test_collect_ast_files_excludes() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/a.json");
        touch(temp.path(), "src/vendor/b.json");
        touch(temp.path(), "tests/c.json");

        let excluded = vec!["**/vendor/**".to_string(), "tests/**".to_string()];
        let files = collect_ast_files(temp.path(), &excluded).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["src/a.json"]);
    }

    #[test]
    fn test_invalid_exclude() {
        assert!(build_excludes(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_collect_source_files_skips_ignored_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "app.py");
        touch(temp.path(), "pkg/mod.py");
        touch(temp.path(), "node_modules/lib/index.js");
        touch(temp.path(), "__pycache__/app.py");
        touch(temp.path(), "notes.txt");

        let files = collect_source_files(temp.path(), |ext| ext == "py" || ext == "js").unwrap();
        let rels: Vec<_> = files
            .iter()
            .map(|p| relative_path(temp.path(), p))
            .collect();
        assert_eq!(rels, vec!["app.py", "pkg/mod.py"]);
    }
}
