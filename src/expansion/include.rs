//! Include file resolution
//!
//! A name is looked up in the configured directories in order and the first
//! readable regular file wins. The current directory is only searched when the
//! caller lists it. Names must be relative and free of `..`, so an include never
//! reaches outside the search directories. Cycle detection works on canonical paths, so the same file
//! reached through two different directories is still one file.

use super::error::ExpandError;
use crate::stream::{CharSource, ReaderSource};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

/// An include file that was found and opened.
pub struct ResolvedInclude {
    pub path: PathBuf,
    pub source: Box<dyn CharSource>,
}

impl std::fmt::Debug for ResolvedInclude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInclude")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Search `search_paths` in order for a readable file called `name`.
pub fn resolve(name: &str, search_paths: &[PathBuf]) -> Option<ResolvedInclude> {
    if !stays_inside(Path::new(name)) {
        return None;
    }
    search_paths.iter().find_map(|dir| open_candidate(&dir.join(name)))
}

fn stays_inside(name: &Path) -> bool {
    name.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn open_candidate(candidate: &Path) -> Option<ResolvedInclude> {
    if !candidate.is_file() {
        return None;
    }
    let file = File::open(candidate).ok()?;
    let path = candidate
        .canonicalize()
        .unwrap_or_else(|_| candidate.to_path_buf());
    Some(ResolvedInclude {
        path,
        source: Box::new(ReaderSource::new(file)),
    })
}

/// Include search path plus the set of files currently open on the include stack.
#[derive(Debug, Default)]
pub struct IncludeResolver {
    search_paths: Vec<PathBuf>,
    open: HashSet<PathBuf>,
}

impl IncludeResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            open: HashSet::new(),
        }
    }

    /// Resolve `name` and mark it open.
    ///
    /// Fails with `IncludeNotFound` when no directory has the file and with
    /// `CircularInclude` when the file is already being expanded.
    pub fn enter(&mut self, name: &str) -> Result<ResolvedInclude, ExpandError> {
        let resolved = resolve(name, &self.search_paths)
            .ok_or_else(|| ExpandError::IncludeNotFound(name.to_string()))?;
        if !self.open.insert(resolved.path.clone()) {
            return Err(ExpandError::CircularInclude(resolved.path));
        }
        Ok(resolved)
    }

    /// Mark a file as no longer being expanded.
    pub fn leave(&mut self, path: &Path) {
        self.open.remove(path);
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.open.contains(path)
    }

    pub fn reset(&mut self) {
        self.open.clear();
    }
}
