//! Discovery of template groups and scheme files inside a workspace.
//!
//! Layout, relative to the workspace root:
//!
//! ```text
//! templates/<group>/templates/config.yaml
//! templates/<group>/templates/<name>.mustache
//! schemes/<repository>/<scheme>.yaml
//! ```

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::manifest::GroupManifest;
use crate::core::config::Workspace;
use crate::core::utils::selector_to_regex;

/// Extension of scheme files
pub const SCHEME_EXT: &str = "yaml";

/// Selector that matches every scheme
pub const MATCH_ALL: &str = "*";

/// List the immediate subdirectories of `dir`, sorted. A missing `dir` yields none.
async fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every group directory under `<root>/templates` that carries a manifest
pub async fn discover_template_groups(workspace: &Workspace) -> io::Result<Vec<PathBuf>> {
    let mut groups = Vec::new();
    for dir in subdirectories(&workspace.templates_dir()).await? {
        if fs::try_exists(GroupManifest::path_in(&dir)).await? {
            groups.push(dir);
        } else {
            debug!(path = %dir.display(), "Skipping directory without a group manifest");
        }
    }
    debug!(count = groups.len(), "Discovered template groups");
    Ok(groups)
}

/// Directories of the named groups, or of every discovered group when `names` is empty
pub async fn resolve_template_groups(
    workspace: &Workspace,
    names: &[String],
) -> io::Result<Vec<PathBuf>> {
    if names.is_empty() {
        return discover_template_groups(workspace).await;
    }
    Ok(names.iter().map(|name| workspace.group_dir(name)).collect())
}

/// Every directory under `<root>/schemes` that holds at least one scheme file
pub async fn scheme_dirs(workspace: &Workspace) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for dir in subdirectories(&workspace.schemes_dir()).await? {
        if !scheme_files_in(&dir).await?.is_empty() {
            dirs.push(dir);
        }
    }
    Ok(dirs)
}

async fn scheme_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == SCHEME_EXT)
            && entry.file_type().await?.is_file()
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Scheme files whose stem matches any of `selectors` (all schemes when empty).
///
/// Selectors are shell-style patterns matched against the file name without
/// its `.yaml` extension. Hidden files only match selectors that start with a
/// dot. The result is sorted and free of duplicates.
pub async fn find_scheme_files(
    workspace: &Workspace,
    selectors: &[String],
) -> io::Result<Vec<PathBuf>> {
    let default_selectors = [MATCH_ALL.to_string()];
    let selectors = if selectors.is_empty() {
        &default_selectors[..]
    } else {
        selectors
    };

    let mut patterns = Vec::with_capacity(selectors.len());
    for selector in selectors {
        match selector_to_regex(selector) {
            Ok(re) => patterns.push((selector.starts_with('.'), re)),
            Err(e) => warn!(selector = %selector, error = %e, "Ignoring invalid scheme selector"),
        }
    }

    let mut matches = BTreeSet::new();
    for dir in scheme_dirs(workspace).await? {
        for file in scheme_files_in(&dir).await? {
            let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let hidden = stem.starts_with('.');
            if patterns
                .iter()
                .any(|(dotted, re)| (!hidden || *dotted) && re.is_match(&stem))
            {
                matches.insert(file);
            }
        }
    }

    debug!(count = matches.len(), "Resolved scheme files");
    Ok(matches.into_iter().collect())
}
