//! Pattern collection.
//!
//! A pattern root is a directory tree whose files are all sub-templates.
//! Each file becomes one [`TemplateSource`] named after its base name, so
//! `web/frontend/service.tmpl` registers as `service.tmpl` and directory
//! segments never take part in the name.
//!
//! The walk is lazy and best-effort: [`PatternWalk`] yields one result per
//! file, an `Err(SkippedEntry)` for anything that could not be read, and
//! keeps going. Only a root that cannot be opened at all is an error.
//!
//! Symlinks are not followed while walking. A symlinked file is still read
//! through the loader, which refuses targets outside the root.
//!
//! `.git` directories are never descended into, so a repository checkout
//! used as a pattern root does not register its git metadata as templates.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, FilterEntry, WalkDir};

use crate::core::XltError;
use crate::source::FileLoader;
use crate::template::TemplateSource;

/// An entry the walk could not turn into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipped pattern {}: {}", self.path.display(), self.reason)
    }
}

type EntryFilter = fn(&DirEntry) -> bool;

fn is_not_git_dir(entry: &DirEntry) -> bool {
    !(entry.file_type().is_dir() && entry.file_name() == ".git")
}

/// Lazy walk over the files of one pattern root.
pub struct PatternWalk<'a> {
    loader: &'a FileLoader,
    entries: FilterEntry<walkdir::IntoIter, EntryFilter>,
}

impl<'a> PatternWalk<'a> {
    /// Starts a walk at the loader's root.
    ///
    /// # Errors
    ///
    /// - [`XltError::InvalidTarget`] if the loader was built from a file
    /// - [`XltError::IoError`] if the root directory cannot be opened
    pub fn new(loader: &'a FileLoader) -> Result<Self, XltError> {
        if let Some(file) = loader.file_path() {
            return Err(XltError::InvalidTarget {
                path: loader.root().join(file).display().to_string(),
                reason: "pattern roots must be directories".to_string(),
            });
        }

        // Fail up front rather than as a skipped first entry
        std::fs::read_dir(loader.root())?;

        let entries = WalkDir::new(loader.root())
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_not_git_dir as EntryFilter);

        Ok(Self {
            loader,
            entries,
        })
    }

    fn read(&self, path: &Path) -> Result<TemplateSource, SkippedEntry> {
        let skipped = |reason: String| SkippedEntry {
            path: path.to_path_buf(),
            reason,
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| skipped("no file name".to_string()))?;
        let text = self.loader.load_to_string(path).map_err(|e| skipped(e.to_string()))?;

        Ok(TemplateSource::new(name, text))
    }
}

impl Iterator for PatternWalk<'_> {
    type Item = Result<TemplateSource, SkippedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    tracing::warn!("Cannot read pattern entry {}: {}", path.display(), e);
                    return Some(Err(SkippedEntry {
                        path,
                        reason: e.to_string(),
                    }));
                }
            };

            if entry.file_type().is_dir() {
                tracing::trace!("Descending into {}", entry.path().display());
                continue;
            }

            let result = self.read(entry.path());
            match &result {
                Ok(source) => tracing::trace!("Collected pattern {}", source.name),
                Err(skipped) => tracing::warn!("{}", skipped),
            }
            return Some(result);
        }
    }
}

/// Collects every readable pattern under the loader's root.
///
/// Returns the templates in walk order together with the skipped entries.
pub fn collect(loader: &FileLoader) -> Result<(Vec<TemplateSource>, Vec<SkippedEntry>), XltError> {
    let mut sources = Vec::new();
    let mut skipped = Vec::new();
    for result in PatternWalk::new(loader)? {
        match result {
            Ok(source) => sources.push(source),
            Err(entry) => skipped.push(entry),
        }
    }
    tracing::debug!(
        "Collected {} patterns from {} ({} skipped)",
        sources.len(),
        loader.root().display(),
        skipped.len()
    );
    Ok((sources, skipped))
}
