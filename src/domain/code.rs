use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

/// A dotted hierarchical WBS code, e.g. `1.3.4.2`.
///
/// Each segment is a positive integer. Codes compare segment-wise as
/// integers, so `1.3.2.9` sorts before `1.3.10.1`, and a code always sorts
/// before its own descendants. Sorting a set of codes therefore yields a
/// depth-first, parent-before-child order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WbsCode {
    segments: Vec<NonZeroUsize>,
}

impl WbsCode {
    /// The code of the project root (`1`).
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: vec![NonZeroUsize::MIN],
        }
    }

    /// Returns the code of the child at position `sequence` below this one.
    #[must_use]
    pub fn child(&self, sequence: NonZeroUsize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(sequence);
        Self { segments }
    }

    /// Returns the parent code, or `None` for a single-segment code.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The trailing sequence number.
    #[must_use]
    pub fn sequence(&self) -> NonZeroUsize {
        // never empty: every constructor produces at least one segment
        self.segments.last().copied().unwrap_or(NonZeroUsize::MIN)
    }

    /// The depth of the code; the root has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns the segments of the code.
    #[must_use]
    pub fn segments(&self) -> &[NonZeroUsize] {
        &self.segments
    }

    /// Whether `other` lies strictly below this code.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.segments.len() > self.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// Whether `other` is a direct child of this code.
    #[must_use]
    pub fn is_parent_of(&self, other: &Self) -> bool {
        other.segments.len() == self.segments.len() + 1 && self.is_ancestor_of(other)
    }
}

impl fmt::Display for WbsCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing a WBS code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodeError {
    /// The code was empty or had an empty segment (`1..2`, `.1`, `1.`).
    #[error("Invalid WBS code '{0}': empty segment")]
    EmptySegment(String),

    /// A segment was not a positive integer.
    #[error("Invalid WBS code '{code}': segment '{segment}' is not a positive integer")]
    Segment {
        /// The code being parsed.
        code: String,
        /// The offending segment.
        segment: String,
    },
}

impl FromStr for WbsCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CodeError::EmptySegment(s.to_string()));
        }

        let segments = trimmed
            .split('.')
            .map(|segment| {
                if segment.is_empty() {
                    return Err(CodeError::EmptySegment(s.to_string()));
                }
                segment
                    .parse::<usize>()
                    .ok()
                    .and_then(NonZeroUsize::new)
                    .ok_or_else(|| CodeError::Segment {
                        code: s.to_string(),
                        segment: segment.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

impl TryFrom<String> for WbsCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for WbsCode {
    type Error = CodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WbsCode> for String {
    fn from(code: WbsCode) -> Self {
        code.to_string()
    }
}
