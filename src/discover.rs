//! Finds test files under a project root.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::error::MigrateError;
use crate::TestFile;

pub const DEFAULT_INCLUDE: &[&str] = &["**/*.{test,spec}.{js,jsx,ts,tsx,cjs,mjs,cts,mts}"];

pub const DEFAULT_EXCLUDE: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/cypress/**",
    "**/.{idea,git,cache,output,temp}/**",
    "**/{karma,rollup,webpack,vite,vitest,jest,ava,babel,nyc,cypress,tsup,build}.config.*",
];

/// Glob patterns, relative to the root, selecting the files to migrate.
#[derive(Debug, Clone)]
pub struct Patterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for Patterns {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Patterns {
    /// Custom includes replace the defaults; custom excludes add to them.
    pub fn with_overrides(include: Vec<String>, exclude: Vec<String>) -> Self {
        let mut patterns = Self::default();
        if !include.is_empty() {
            patterns.include = include;
        }
        patterns.exclude.extend(exclude);
        patterns
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, MigrateError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Paths of matching files under `root`, relative to it, sorted.
pub fn find_test_files(root: &Path, patterns: &Patterns) -> Result<Vec<PathBuf>, MigrateError> {
    let include = build_set(&patterns.include)?;
    let exclude = build_set(&patterns.exclude)?;

    let relative = |entry: &DirEntry| -> PathBuf {
        entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf()
    };
    // A directory is skipped when anything inside it would be excluded.
    let pruned = |entry: &DirEntry| -> bool {
        entry.depth() > 0 && entry.file_type().is_dir() && exclude.is_match(relative(entry).join("_"))
    };

    let mut out = vec![];
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !pruned(e)) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative(&entry);
        if include.is_match(&rel) && !exclude.is_match(&rel) {
            out.push(rel);
        }
    }
    out.sort();
    Ok(out)
}

/// Reads every matching file. Paths in the result are relative to `root`.
pub fn load_test_files(root: &Path, patterns: &Patterns) -> Result<Vec<TestFile>, MigrateError> {
    find_test_files(root, patterns)?
        .into_iter()
        .map(|rel| {
            let content = std::fs::read_to_string(root.join(&rel)).map_err(|source| MigrateError::Io {
                path: rel.display().to_string(),
                source,
            })?;
            Ok(TestFile {
                path: rel.display().to_string(),
                content,
            })
        })
        .collect()
}
