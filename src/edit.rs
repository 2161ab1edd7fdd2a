use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with verification of the text being replaced.
///
/// Injection and its reversal both compile down to one of these, applied to
/// the in-memory text of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    pub new_text: String,
    pub expected_before: EditVerification,
}

/// What the span must currently hold for the edit to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    ExactMatch(String),
    /// xxh3 hash of the expected text, used for large spans
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Exact text for small spans, a hash above 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at {byte_start}..{byte_end}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("byte offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    Applied { bytes_changed: usize },
    /// The span already held the new text.
    AlreadyApplied,
}

impl Edit {
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self::with_verification(
            byte_start,
            byte_end,
            new_text,
            EditVerification::from_text(expected_before.as_ref()),
        )
    }

    pub fn with_verification(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: EditVerification,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    /// Pure insertion at `offset`.
    pub fn insertion(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text, "")
    }

    /// Check the span against `content` and return the text it holds.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }
        for offset in [self.byte_start, self.byte_end] {
            if !content.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary(offset));
            }
        }

        let current = &content[self.byte_start..self.byte_end];
        if current != self.new_text && !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }
        Ok(current)
    }

    /// The text `content` would become, without touching it.
    pub fn preview(&self, content: &str) -> Result<String, EditError> {
        self.validate(content)?;
        let mut edited = String::with_capacity(
            content.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        edited.push_str(&content[..self.byte_start]);
        edited.push_str(&self.new_text);
        edited.push_str(&content[self.byte_end..]);
        Ok(edited)
    }

    /// Apply in place.
    pub fn apply_to(&self, content: &mut String) -> Result<EditResult, EditError> {
        if self.validate(content)? == self.new_text {
            return Ok(EditResult::AlreadyApplied);
        }
        content.replace_range(self.byte_start..self.byte_end, &self.new_text);
        Ok(EditResult::Applied {
            bytes_changed: self.new_text.len(),
        })
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
///
/// The mtime is bumped afterwards so cargo notices the change even when the
/// rename lands within the previous timestamp's granularity.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path has no parent directory",
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_by_text_and_hash() {
        let exact = EditVerification::from_text("hello world");
        assert!(matches!(exact, EditVerification::ExactMatch(_)));
        assert!(exact.matches("hello world"));
        assert!(!exact.matches("hello"));

        let large = "x".repeat(2000);
        let hashed = EditVerification::from_text(&large);
        assert!(matches!(hashed, EditVerification::Hash(_)));
        assert!(hashed.matches(&large));
        assert!(!hashed.matches("x"));
    }

    #[test]
    fn apply_replaces_span() {
        let mut text = String::from("fn a() {}\nfn b() {}\n");
        let edit = Edit::new(10, 19, "fn b() { c(); }", "fn b() {}");

        assert_eq!(
            edit.apply_to(&mut text).unwrap(),
            EditResult::Applied { bytes_changed: 15 }
        );
        assert_eq!(text, "fn a() {}\nfn b() { c(); }\n");
        // The span now starts the rewritten item, so the same edit no longer verifies
        assert!(matches!(
            edit.apply_to(&mut text),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn stale_span_is_rejected() {
        let mut text = String::from("let x = 1;");
        let edit = Edit::new(4, 5, "y", "z");
        assert!(matches!(
            edit.apply_to(&mut text),
            Err(EditError::BeforeTextMismatch { .. })
        ));
        assert_eq!(text, "let x = 1;");
    }

    #[test]
    fn already_applied_is_detected() {
        let mut text = String::from("hello world");
        let edit = Edit::new(0, 5, "hello", "howdy");
        assert_eq!(edit.apply_to(&mut text).unwrap(), EditResult::AlreadyApplied);
    }

    #[test]
    fn invalid_ranges() {
        let text = "héllo";
        assert!(matches!(
            Edit::new(3, 1, "", "").preview(text),
            Err(EditError::InvalidByteRange { .. })
        ));
        assert!(matches!(
            Edit::new(0, 40, "", "").preview(text),
            Err(EditError::InvalidByteRange { .. })
        ));
        assert!(matches!(
            Edit::insertion(2, "x").preview(text),
            Err(EditError::NotCharBoundary(2))
        ));
    }

    #[test]
    fn insertion_preview_leaves_input_alone() {
        let text = "fn a() {}";
        let edited = Edit::insertion(8, " b(); ").preview(text).unwrap();
        assert_eq!(edited, "fn a() { b(); }");
        assert_eq!(text, "fn a() {}");
    }

    #[test]
    fn atomic_write_replaces_file() {
        use std::fs;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("lib.rs");
        fs::write(&file_path, "original").unwrap();

        write_atomic(&file_path, b"rewritten").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "rewritten");
    }
}
