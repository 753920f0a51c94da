//! Result file sanitizing.
//!
//! The engine writes absolute, machine-specific paths into its result file.
//! They are stripped with targeted text substitutions; parsing and
//! re-serializing the XML would reformat the file, which downstream baseline
//! consumers diff byte for byte.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Any absolute prefix up to and including `/execroot/<workspace>/`.
static EXEC_ROOT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"(?:/[^\s"'<>]*)?/execroot/[^/\s"'<>]+/"#).expect("exec root pattern is valid")
});

/// Leading `../` runs in `file="..."` attributes.
static PARENT_TRAVERSAL: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"file="(?:\.\./)+"#).expect("parent traversal pattern is valid")
});

/// Errors sanitizing a result file.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// The result file could not be read.
    #[error("Failed to read result file {path}: {source}")]
    Read {
        /// Result file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The result file could not be written back.
    #[error("Failed to write result file {path}: {source}")]
    Write {
        /// Result file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Characters a path may follow in a result file.
const PATH_BOUNDARY: &str = r#"(^|["'=\s>])"#;

/// Rewrites result files so they contain only build-tree relative paths.
#[derive(Debug, Clone, Default)]
pub struct OutputSanitizer {
    roots: Vec<String>,
    literal: Option<Regex>,
}

impl OutputSanitizer {
    /// Creates a sanitizer that only applies the generic rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal directory prefix to strip, such as the execution root
    /// or the invocation's working area.
    #[must_use]
    pub fn root(mut self, path: &Path) -> Self {
        let mut prefix = path.to_string_lossy().into_owned();
        if prefix.is_empty() || prefix == "/" {
            return self;
        }
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        if !self.roots.contains(&prefix) {
            self.roots.push(prefix);
            // Nested roots must be stripped before their parents
            self.roots.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            self.literal = literal_pattern(&self.roots);
        }
        self
    }

    /// Returns `content` with machine-specific path prefixes removed.
    ///
    /// Bytes outside the matched prefixes are left untouched.
    #[must_use]
    pub fn sanitize(&self, content: &str) -> String {
        let text = match &self.literal {
            Some(literal) => literal.replace_all(content, "${1}"),
            None => content.into(),
        };
        let text = EXEC_ROOT_PREFIX.replace_all(&text, "");
        PARENT_TRAVERSAL
            .replace_all(&text, r#"file=""#)
            .into_owned()
    }

    /// Sanitizes the file at `path` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn sanitize_file(&self, path: &Path) -> Result<(), SanitizeError> {
        let content = std::fs::read_to_string(path).map_err(|e| SanitizeError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let sanitized = self.sanitize(&content);
        if sanitized == content {
            debug!("Nothing to sanitize in {}", path.display());
            return Ok(());
        }
        std::fs::write(path, sanitized).map_err(|e| SanitizeError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Sanitized {}", path.display());
        Ok(())
    }
}

/// Matches any of `roots` where a path starts, keeping the boundary.
///
/// Alternation is leftmost-first, so `roots` must be ordered longest first.
fn literal_pattern(roots: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = roots.iter().map(|r| regex::escape(r)).collect();
    let pattern = format!("{PATH_BOUNDARY}(?:{})", alternatives.join("|"));
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Literal roots will not be stripped: {e}");
            None
        }
    }
}
