//! Fatal load errors and the non-fatal diagnostics collector.
//!
//! Two tiers, mirroring how the loader reports problems:
//!
//! - [`LoadError`] — unwinds the whole parse. Structural damage, a platform
//!   mismatch, an unreadable description file, or a missing companion binary
//!   that an `inline:` reference actually needs.
//! - [`Diagnostic`] — accumulated alongside a partially successful
//!   [`Effect`](crate::Effect): unresolved state names, unknown annotation
//!   letters, empty passes. The caller decides whether a load with
//!   diagnostics is acceptable.

use std::collections::HashSet;

use thiserror::Error;

// ── LoadError ─────────────────────────────────────────────────────────────

/// A fatal error from loading a `.cfx` effect description.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The description file (or a file the backend was asked for) could not
    /// be read. Recoverable: the caller may retry with different paths.
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The declared platform tag does not match the backend identity.
    /// Recoverable: the caller may retry against a different backend.
    #[error("effect targets platform {declared:?} but backend is {backend:?}")]
    PlatformMismatch { declared: String, backend: String },

    /// Unbalanced blocks, an unknown directive, or a parse ending away from
    /// top level. 1-based source line number.
    #[error("structural error at line {line}: {message}")]
    Structural { line: usize, message: String },

    /// An `inline:` reference was encountered but the companion binary
    /// artifact could not be opened.
    #[error("companion binary {path} required by inline shader reference: {source}")]
    MissingBinary {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An `inline:(offset,length)` range falls outside the companion binary.
    #[error("inline range 0x{offset:x}+0x{length:x} exceeds companion binary {path} ({size} bytes)")]
    InlineOutOfRange {
        path: String,
        offset: u64,
        length: u64,
        size: u64,
    },

    /// The backend refused to create a shader, render state, or sampler.
    #[error("backend error at line {line}: {message}")]
    Backend { line: usize, message: String },
}

impl LoadError {
    /// True for failures the caller can sensibly retry (different search
    /// path or backend); false for damage inside the file itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LoadError::FileRead { .. } | LoadError::PlatformMismatch { .. }
        )
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────

/// A non-fatal condition noted during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line the condition was detected on.
    pub line: usize,
    pub message: String,
}

/// Per-call diagnostics collector, deduplicated by key.
///
/// Owned by a single load; dropped with it. Duplicate conditions (the same
/// unresolved name referenced on many lines, say) are recorded once and
/// logged once, keyed by a caller-chosen string.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    seen: HashSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (and logs) a diagnostic unless `key` was already reported.
    pub fn warn(&mut self, key: impl Into<String>, line: usize, message: impl Into<String>) {
        let key = key.into();
        if !self.seen.insert(key) {
            return;
        }
        let message = message.into();
        log::warn!("line {line}: {message}");
        self.entries.push(Diagnostic { line, message });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
