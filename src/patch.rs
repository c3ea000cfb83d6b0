use regex::{Captures, Regex};
use serde::de;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placement policy for the template relative to a match.
///
/// `Append` and `Prepend` insert text around the matched span and can be
/// undone with [`revert_patch`]. `Replace` substitutes the template for the
/// matched text; the original text is discarded, so a replace cannot be
/// reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Append,
    Prepend,
    Replace,
}

impl Mode {
    /// Whether a patch applied in this mode can be undone.
    pub fn is_revertible(self) -> bool {
        matches!(self, Mode::Append | Mode::Prepend)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Append => "append",
            Mode::Prepend => "prepend",
            Mode::Replace => "replace",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(Mode::Append),
            "prepend" => Ok(Mode::Prepend),
            "replace" => Ok(Mode::Replace),
            other => Err(PatchError::InvalidMode {
                given: other.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid mode '{given}': specify append, prepend or replace")]
    InvalidMode { given: String },

    #[error("replace patches discard the matched text and cannot be reverted")]
    IrreversibleMode,

    #[error("template reference \\{reference} has no corresponding capture group in the match")]
    Template { reference: String },

    #[error("match at byte {position} makes no forward progress")]
    NoProgress { position: usize },

    #[error("offset {offset} is not a character boundary in a buffer of {len} bytes")]
    OffsetNotCharBoundary { offset: usize, len: usize },
}

/// A fully described patch operation: where to match, what to insert, how to
/// place it.
///
/// This is the value the file driver and CLI hand around; [`apply_patch`] and
/// [`revert_patch`] are the underlying free functions for callers that already
/// hold a buffer.
#[derive(Debug, Clone)]
#[must_use = "PatchRequest does nothing until apply() or revert() is called"]
pub struct PatchRequest {
    /// Pattern locating candidate edit sites.
    pub pattern: Regex,
    /// Text to insert or substitute; may reference capture groups as `\N`.
    pub template: String,
    /// Placement of the template relative to each match.
    pub mode: Mode,
    /// Edit every non-overlapping match from the offset onward, not just the
    /// first.
    pub global: bool,
    /// Byte position at which scanning begins.
    pub offset: usize,
}

impl PatchRequest {
    /// Create a non-global request scanning from the start of the buffer.
    pub fn new(pattern: Regex, template: impl Into<String>, mode: Mode) -> Self {
        Self {
            pattern,
            template: template.into(),
            mode,
            global: false,
            offset: 0,
        }
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Apply this patch to `buffer`, returning the edited copy.
    pub fn apply(&self, buffer: &str) -> Result<String, PatchError> {
        apply_patch(
            buffer,
            &self.pattern,
            &self.template,
            self.mode,
            self.global,
            self.offset,
        )
    }

    /// Undo a previous [`apply`](Self::apply) of the same request.
    pub fn revert(&self, buffer: &str) -> Result<String, PatchError> {
        revert_patch(
            buffer,
            &self.pattern,
            &self.template,
            self.mode,
            self.global,
            self.offset,
        )
    }
}

/// Expand `\N` capture-group references in `template` against a concrete
/// match.
///
/// The template is scanned left to right for a backslash followed by one or
/// more digits; each occurrence is replaced by the text captured by that
/// 1-based group (`\0` is the whole match). Scanning resumes after the
/// inserted capture text, so each reference in the original template expands
/// exactly once even when captured text itself contains `\N` sequences.
///
/// A reference to a group that did not participate in the match fails with
/// [`PatchError::Template`].
pub fn render(template: &str, caps: &Captures<'_>) -> Result<String, PatchError> {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let reference = &template[i + 1..j];
            let group = reference
                .parse::<usize>()
                .ok()
                .and_then(|g| caps.get(g))
                .ok_or_else(|| PatchError::Template {
                    reference: reference.to_string(),
                })?;
            out.push_str(group.as_str());
            i = j;
        } else {
            match template[i..].chars().next() {
                Some(ch) => {
                    out.push(ch);
                    i += ch.len_utf8();
                }
                None => break,
            }
        }
    }
    Ok(out)
}

/// Validate the scan offset. Offsets past the end of the buffer find no
/// matches (`None`); offsets inside a multi-byte character are malformed
/// requests.
fn scan_start(buffer: &str, offset: usize) -> Result<Option<usize>, PatchError> {
    if offset > buffer.len() {
        return Ok(None);
    }
    if !buffer.is_char_boundary(offset) {
        return Err(PatchError::OffsetNotCharBoundary {
            offset,
            len: buffer.len(),
        });
    }
    Ok(Some(offset))
}

/// Apply a pattern-based edit to `buffer`, returning the edited copy.
///
/// Scanning starts at `offset` and locates the leftmost match of `pattern`.
/// The spliced region is the matched text plus the rendered template
/// (`Append`), the rendered template plus the matched text (`Prepend`), or the
/// rendered template alone (`Replace`). With `global` set, scanning resumes
/// immediately after the spliced region and repeats; freshly inserted text is
/// never re-matched. A buffer with no matches is returned unchanged.
pub fn apply_patch(
    buffer: &str,
    pattern: &Regex,
    template: &str,
    mode: Mode,
    global: bool,
    offset: usize,
) -> Result<String, PatchError> {
    let Some(mut search) = scan_start(buffer, offset)? else {
        return Ok(buffer.to_string());
    };
    let mut contents = buffer.to_string();

    loop {
        let (resume, match_len, edited) = {
            let Some(caps) = pattern.captures_at(&contents, search) else {
                break;
            };
            // Group 0 spans the whole match and always participates.
            let Some(m) = caps.get(0) else {
                break;
            };
            let rendered = render(template, &caps)?;
            let spliced = match mode {
                Mode::Append => format!("{}{}", m.as_str(), rendered),
                Mode::Prepend => format!("{}{}", rendered, m.as_str()),
                Mode::Replace => rendered,
            };
            let match_len = m.end() - m.start();
            let resume = m.start() + spliced.len();
            let mut edited = String::with_capacity(contents.len() - match_len + spliced.len());
            edited.push_str(&contents[..m.start()]);
            edited.push_str(&spliced);
            edited.push_str(&contents[m.end()..]);
            (resume, match_len, edited)
        };

        contents = edited;
        if !global {
            break;
        }
        // A stalled scan position is fine as long as the match consumed
        // text: the buffer shrinks and the loop terminates (an empty global
        // replace deletes every match this way). Only a zero-width match
        // with an empty splice would rescan the same position forever.
        if resume <= search && match_len == 0 {
            return Err(PatchError::NoProgress { position: search });
        }
        search = resume;
    }

    Ok(contents)
}

/// Undo a previous [`apply_patch`] with the same arguments.
///
/// Only `Append` and `Prepend` patches carry enough information to be undone;
/// `Replace` fails with [`PatchError::IrreversibleMode`].
///
/// The composite signature "original match plus the inserted template" is
/// located by finding a match of `pattern` and requiring the template,
/// re-rendered against that match's captures, to sit literally adjacent to it
/// (after the match for `Append`, before it for `Prepend`). Within a located
/// signature the first occurrence of the rendered template is removed. A
/// buffer containing no signature is returned unchanged, so reverting an
/// already-reverted or never-patched buffer is a no-op.
///
/// Known limitation inherited from the patch model: a `Prepend` template
/// whose capture references depend on groups that the insertion itself
/// disturbed may fail to locate its signature. Reverts of capture-free
/// templates are exact.
pub fn revert_patch(
    buffer: &str,
    pattern: &Regex,
    template: &str,
    mode: Mode,
    global: bool,
    offset: usize,
) -> Result<String, PatchError> {
    if !mode.is_revertible() {
        return Err(PatchError::IrreversibleMode);
    }
    let Some(mut search) = scan_start(buffer, offset)? else {
        return Ok(buffer.to_string());
    };
    let mut contents = buffer.to_string();

    enum Step {
        Reverted {
            resume: usize,
            removed: usize,
            edited: String,
        },
        Skip(usize),
    }

    loop {
        let step = {
            let Some(caps) = pattern.captures_at(&contents, search) else {
                break;
            };
            let Some(m) = caps.get(0) else {
                break;
            };
            let rendered = render(template, &caps)?;

            let signature = match mode {
                Mode::Append if contents[m.end()..].starts_with(rendered.as_str()) => {
                    Some((m.start(), m.end() + rendered.len()))
                }
                Mode::Prepend => m
                    .start()
                    .checked_sub(rendered.len())
                    .filter(|&start| {
                        start >= search
                            && contents.is_char_boundary(start)
                            && &contents[start..m.start()] == rendered.as_str()
                    })
                    .map(|start| (start, m.end())),
                _ => None,
            };

            match signature {
                Some((start, end)) => {
                    // Left-anchored removal: strip the first occurrence of the
                    // rendered template within the signature span.
                    let reverted = contents[start..end].replacen(rendered.as_str(), "", 1);
                    let removed = (end - start) - reverted.len();
                    let resume = start + reverted.len();
                    let mut edited = String::with_capacity(
                        contents.len() - (end - start) + reverted.len(),
                    );
                    edited.push_str(&contents[..start]);
                    edited.push_str(&reverted);
                    edited.push_str(&contents[end..]);
                    Step::Reverted {
                        resume,
                        removed,
                        edited,
                    }
                }
                None => {
                    // Pattern matched but the inserted template is not
                    // adjacent; keep scanning past this match.
                    match contents[m.start()..].chars().next() {
                        Some(ch) => Step::Skip(m.start() + ch.len_utf8()),
                        None => break,
                    }
                }
            }
        };

        match step {
            Step::Reverted {
                resume,
                removed,
                edited,
            } => {
                contents = edited;
                if !global {
                    break;
                }
                // Same discipline as the apply loop: a stalled position is
                // only fatal when nothing was removed, since a shrinking
                // buffer still terminates.
                if resume <= search && removed == 0 {
                    return Err(PatchError::NoProgress { position: search });
                }
                search = resume;
            }
            Step::Skip(next) => {
                search = next;
            }
        }
    }

    Ok(contents)
}
