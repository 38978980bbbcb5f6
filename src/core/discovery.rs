//! Installation discovery.
//!
//! Apache configs → DocumentRoots → directories holding the marker file →
//! probed installations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::apache::{extract_document_roots, ConfigParser, ParseOptions};
use crate::error::{Error, Result};
use crate::notify::{Notifier, Severity};
use crate::probe::{probe, Installation};
use crate::wpcli::WpCli;

/// Where content roots come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sources {
    /// Apache configuration files to parse.
    ConfigFiles(Vec<PathBuf>),
    /// A single directory used directly as the only content root.
    ExplicitPath(PathBuf),
}

impl Sources {
    fn describe(&self) -> Vec<String> {
        match self {
            Sources::ConfigFiles(files) => files.iter().map(|f| f.display().to_string()).collect(),
            Sources::ExplicitPath(path) => vec![path.display().to_string()],
        }
    }
}

/// Union of every DocumentRoot found across `sources`.
///
/// A file that fails to parse contributes nothing; the failure is logged and
/// sent to the notifier. An empty union is fatal.
pub fn content_roots(
    sources: &Sources,
    parser: &dyn ConfigParser,
    notifier: &dyn Notifier,
    task: &str,
) -> Result<BTreeSet<String>> {
    let roots = match sources {
        Sources::ExplicitPath(path) => BTreeSet::from([path.display().to_string()]),
        Sources::ConfigFiles(files) => {
            let mut roots = BTreeSet::new();
            for file in files {
                match parser.parse(file, &ParseOptions::for_file(file)) {
                    Ok(tree) => {
                        let found = extract_document_roots(&tree);
                        tracing::debug!("{}: {} DocumentRoot(s)", file.display(), found.len());
                        roots.extend(found);
                    }
                    Err(err) => {
                        tracing::error!("{}", err);
                        notifier.notify(Severity::Critical, &err.message, task);
                    }
                }
            }
            roots
        }
    };

    if roots.is_empty() {
        return Err(Error::no_content_roots(sources.describe()));
    }
    Ok(roots)
}

/// Every directory under `root` (inclusive, any depth) that holds `marker`.
///
/// Symlinked directories are not descended into, so link cycles terminate.
pub fn marker_dirs(root: &Path, marker: &str) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("Skipping unreadable path: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_name() == marker)
        .filter(|entry| entry.file_type().is_file() || entry.path().is_file())
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .collect()
}

/// Probe every marker directory under every root.
///
/// Directories are collected across all roots first, so nested roots
/// (`/www` and `/www/blog`) yield each installation once.
pub fn discover(wp: &WpCli, roots: &BTreeSet<String>) -> Vec<Installation> {
    let marker = wp.settings().marker_file.clone();
    let mut dirs = BTreeSet::new();

    for root in roots {
        tracing::debug!("Searching {} for {}", root, marker);
        dirs.extend(marker_dirs(Path::new(root), &marker));
    }

    let installations: Vec<Installation> = dirs.iter().filter_map(|dir| probe(wp, dir)).collect();
    tracing::info!("Found {} WordPress installation(s)", installations.len());
    installations
}
