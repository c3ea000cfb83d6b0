//! Regex Patcher: reversible pattern-based patching for text files
//!
//! Applies and reverts regular-expression-driven edits: given a pattern, a
//! template and a placement mode, text is appended after, prepended before or
//! substituted for each match. Append and prepend patches can later be undone
//! by locating the "match plus inserted template" signature and stripping the
//! insertion back out.
//!
//! # Architecture
//!
//! The core is [`patch`]: two pure functions over in-memory buffers
//! ([`apply_patch`] and [`revert_patch`]) plus the `\N` capture-group
//! template renderer they share. Everything else is a thin collaborator
//! around that core: [`files`] normalizes target lists and owns the
//! read-patch-write cycle, and [`config`] loads YAML patch records that merge
//! beneath explicit call-site arguments.
//!
//! # Safety
//!
//! - Buffers outside the spliced regions are never touched
//! - Atomic file writes (tempfile + fsync + rename); a failed patch writes
//!   nothing
//! - Reverting a never-patched or already-reverted buffer is a no-op
//! - Linear-time regex engine; no backtracking blowups
//!
//! # Example
//!
//! ```
//! use regex::Regex;
//! use regex_patcher::{apply_patch, revert_patch, Mode};
//!
//! let pattern = Regex::new("beta").unwrap();
//! let patched = apply_patch(
//!     "alpha beta gamma",
//!     &pattern,
//!     " and a half",
//!     Mode::Append,
//!     false,
//!     0,
//! )
//! .unwrap();
//! assert_eq!(patched, "alpha beta and a half gamma");
//!
//! let original = revert_patch(&patched, &pattern, " and a half", Mode::Append, false, 0).unwrap();
//! assert_eq!(original, "alpha beta gamma");
//! ```

pub mod config;
pub mod files;
pub mod patch;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, PatchDocument, ValidationError};
pub use files::{
    files_from_value, patch_file_in_place, split_file_arg, Action, FileError, FileOutcome,
};
pub use patch::{apply_patch, render, revert_patch, Mode, PatchError, PatchRequest};
