//! Filesystem traversal.
//!
//! [`Walker`] lists the entries below a source directory lazily, depth first,
//! with each directory's children sorted by name so that traversal order is
//! deterministic. Symbolic links are reported but never followed. Entries that
//! cannot be stat'ed are still yielded, without metadata; directories that
//! cannot be listed are yielded without their children.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Skip entries whose name starts with a dot (and everything below them)
    pub skip_hidden: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            recursive: true,
            skip_hidden: false,
        }
    }
}

/// One filesystem entry found during traversal.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Path as reached from the source directory
    pub path: PathBuf,
    /// 1 for the source directory's immediate children
    pub depth: usize,
    /// `None` when the entry could not be stat'ed
    pub metadata: Option<Metadata>,
}

impl Entry {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn is_dir(&self) -> bool {
        self.metadata.as_ref().is_some_and(Metadata::is_dir)
    }
}

/// Lazy depth-first iterator over the entries below a root directory.
pub struct Walker {
    /// Pending children per open directory, with their depth
    stack: Vec<(std::vec::IntoIter<PathBuf>, usize)>,
    options: WalkOptions,
}

impl Walker {
    /// Opens the root directory. Failing to list the root is the only error
    /// the walker reports; everything below it is best effort.
    pub fn new(root: &Path, options: WalkOptions) -> io::Result<Self> {
        let children = list_dir(root, options.skip_hidden)?;
        Ok(Walker {
            stack: vec![(children.into_iter(), 1)],
            options,
        })
    }
}

impl Iterator for Walker {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            let (children, depth) = self.stack.last_mut()?;
            let depth = *depth;
            let Some(path) = children.next() else {
                self.stack.pop();
                continue;
            };

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    log::debug!("cannot stat {}: {}", path.display(), e);
                    None
                }
            };

            if self.options.recursive && metadata.as_ref().is_some_and(Metadata::is_dir) {
                match list_dir(&path, self.options.skip_hidden) {
                    Ok(grandchildren) => {
                        log::trace!("entering {}", path.display());
                        self.stack.push((grandchildren.into_iter(), depth + 1));
                    }
                    Err(e) => log::debug!("cannot list {}: {}", path.display(), e),
                }
            }

            return Some(Entry {
                path,
                depth,
                metadata,
            });
        }
    }
}

fn list_dir(dir: &Path, skip_hidden: bool) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if skip_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        children.push(entry.path());
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}
