//! Ignore rules shared by the snapshot reader and the change watcher.
//!
//! Both components are built from the same [`IgnoreRules`] value so their
//! views of the project can never drift apart.

use crate::error::ConfigError;
use regex::RegexSet;
use std::path::{Component, Path};

/// Directory names never descended into.
pub const DEFAULT_IGNORED_DIRECTORIES: &[&str] = &[
    r"^node_modules$",
    r"^\.git$",
    r"^\.hg$",
    r"^\.svn$",
    r"^\.cache$",
    r"^\.parcel-cache$",
    r"^\.yarn$",
];

/// File names never included.
pub const DEFAULT_IGNORED_FILES: &[&str] = &[
    r"^package-lock\.json$",
    r"^yarn\.lock$",
    r"^pnpm-lock\.yaml$",
    r"^\.gitignore$",
    r"^\.DS_Store$",
    r"\.sw[px]$",
    r"~$",
];

/// Name-based ignore predicates.
///
/// Both pattern sets apply to every path component, so anything below an
/// ignored entry is ignored too.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    directories: RegexSet,
    files: RegexSet,
}

impl IgnoreRules {
    /// Build rules from explicit pattern lists.
    pub fn new<D, F>(directories: D, files: F) -> Result<Self, ConfigError>
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Ok(Self {
            directories: compile(directories)?,
            files: compile(files)?,
        })
    }

    /// Build the default rules plus extra patterns.
    pub fn with_extra(extra_directories: &[String], extra_files: &[String]) -> Result<Self, ConfigError> {
        Self::new(
            DEFAULT_IGNORED_DIRECTORIES
                .iter()
                .copied()
                .chain(extra_directories.iter().map(String::as_str)),
            DEFAULT_IGNORED_FILES
                .iter()
                .copied()
                .chain(extra_files.iter().map(String::as_str)),
        )
    }

    /// Check a single directory name.
    pub fn is_ignored_directory(&self, name: &str) -> bool {
        self.directories.is_match(name)
    }

    /// Check a single file name.
    pub fn is_ignored_file(&self, name: &str) -> bool {
        self.files.is_match(name)
    }

    /// Check a root-relative path.
    ///
    /// Every component is matched against both sets. The snapshot reader
    /// prunes with this and the watcher filters with it, so an entry is
    /// ignored the same way whatever its kind or the order events arrive in.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .any(|name| self.is_ignored_directory(name) || self.is_ignored_file(name))
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::with_extra(&[], &[]).expect("default ignore patterns are valid regexes")
    }
}

fn compile<I>(patterns: I) -> Result<RegexSet, ConfigError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let patterns: Vec<String> = patterns
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect();

    // Compile one by one first so the error names the bad pattern
    for pattern in &patterns {
        regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
    }

    RegexSet::new(&patterns).map_err(|source| ConfigError::InvalidPattern {
        pattern: patterns.join(" | "),
        source,
    })
}
