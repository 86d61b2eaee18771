//! Turns whatever the client passed as `path` into something `go doc`
//! understands.
//!
//! Three shapes are accepted:
//!
//! - relative paths (`.`, `./sub/pkg`), resolved against the module declared
//!   in `<working_dir>/go.mod`;
//! - absolute paths to a module root, resolved to that module's name;
//! - import paths (`io`, `github.com/user/repo`), passed through untouched.

use std::path::{Path, PathBuf};

use tokio::fs;
use walkdir::{DirEntry, WalkDir};

use crate::error::DocError;

pub const GO_MOD: &str = "go.mod";

/// Outcome of looking at a reference before running the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReference {
    /// A package the extractor can be pointed at.
    ImportPath(String),
    /// The directory has no Go files of its own, but these nested ones do.
    SubPackages(Vec<String>),
}

pub async fn resolve(reference: &str, working_dir: Option<&Path>) -> Result<String, DocError> {
    if reference.starts_with('.') {
        let working_dir = working_dir.ok_or(DocError::ContextRequired)?;
        let module = read_module_name(&working_dir.join(GO_MOD)).await?;
        return Ok(join_import_path(&module, reference));
    }

    let path = Path::new(reference);
    if path.is_absolute() {
        if let Some(working_dir) = working_dir {
            if working_dir != path {
                return Err(DocError::ContextMismatch {
                    path: path.to_path_buf(),
                    working_dir: working_dir.to_path_buf(),
                });
            }
        }
        return read_module_name(&path.join(GO_MOD)).await;
    }

    Ok(reference.to_string())
}

/// Reads the module path declared in a `go.mod` file.
pub async fn read_module_name(go_mod: &Path) -> Result<String, DocError> {
    let content = fs::read_to_string(go_mod)
        .await
        .map_err(|e| DocError::ModuleDescriptor {
            path: go_mod.to_path_buf(),
            reason: e.to_string(),
        })?;

    parse_module_name(&content).ok_or_else(|| DocError::ModuleDescriptor {
        path: go_mod.to_path_buf(),
        reason: "no module declaration found".to_string(),
    })
}

fn parse_module_name(content: &str) -> Option<String> {
    content.lines().map(str::trim).find_map(|line| {
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        line.split_whitespace()
            .nth(1)
            .map(|name| name.trim_matches('"').to_string())
    })
}

/// Joins `relative` onto `module` segment by segment, dropping `.` and empty
/// segments and letting `..` climb.
fn join_import_path(module: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = module.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// The directory on disk a local reference points at, if it is local at all.
pub fn local_dir(reference: &str, working_dir: Option<&Path>) -> Option<PathBuf> {
    if reference.starts_with('.') {
        return working_dir.map(|dir| dir.join(reference));
    }
    let path = Path::new(reference);
    path.is_absolute().then(|| path.to_path_buf())
}

/// Lists nested package directories of `dir` when `dir` itself holds no Go
/// files. Returns `None` when `dir` is a package, is missing, or has nothing
/// nested.
///
/// Listed entries are `dir`-relative, slash-separated and sorted.
pub fn find_sub_packages(dir: &Path) -> Option<Vec<String>> {
    if !dir.is_dir() || has_go_files(dir) {
        return None;
    }

    let mut found: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir() && !is_ignored_dir(entry))
        .filter_map(Result::ok)
        .filter(|entry| has_go_files(entry.path()))
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(dir).ok()?;
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .collect();

    if found.is_empty() {
        return None;
    }
    found.sort();
    Some(found)
}

// Same directories the go tool skips when matching `./...`.
fn is_ignored_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor"
}

fn has_go_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(Result::ok).any(|entry| {
                let path = entry.path();
                path.is_file() && path.extension().is_some_and(|ext| ext == "go")
            })
        })
        .unwrap_or(false)
}
