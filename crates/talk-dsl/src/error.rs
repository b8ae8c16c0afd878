//! Error types for the Talk front end.
//!
//! Two families of failure exist and they are kept apart on purpose:
//!
//! - [`GrammarError`]: the *grammar itself* is malformed (duplicate keys, a
//!   variable-length slot that is not last, ambiguous closing tags). These are
//!   raised while schema classes are being built and indicate a bug in the
//!   declarations, never in user input.
//! - [`ParseError`]: the *input* is malformed. Every parse error is fatal and
//!   carries the owning tag plus the file/line it was raised at.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::grammar::{Key, SchemaId};

/// The classes of input error a parse can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No open scope declares the tag.
    UnsupportedTag,
    /// Too few or too many words for a property.
    PropertyArity,
    /// A property value failed an `allowed` set, a transform, or a validator.
    PropertyValue,
    /// Duplicate singular tag, missing required tag, or duplicate unique key.
    TagCardinality,
    /// The same qualified symbol was registered twice in one namespace.
    RegistrationConflict,
    /// A referenced symbol does not exist once the whole corpus is closed.
    CrossReference,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedTag => "unsupported tag",
            ErrorKind::PropertyArity => "property arity",
            ErrorKind::PropertyValue => "property value",
            ErrorKind::TagCardinality => "tag cardinality",
            ErrorKind::RegistrationConflict => "registration conflict",
            ErrorKind::CrossReference => "cross-reference",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal, localized input error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub kind: ErrorKind,
    /// The tag owning the failing scope, when one is known.
    pub tag: Option<String>,
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(
        kind: ErrorKind,
        tag: Option<Key>,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            tag: tag.map(|t| t.as_str().to_string()),
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach the owning tag if the raising site did not know it.
    pub fn near(mut self, tag: Key) -> Self {
        if self.tag.is_none() {
            self.tag = Some(tag.as_str().to_string());
        }
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}  parse error", self.file, self.line)?;
        if let Some(tag) = &self.tag {
            write!(f, " near @{tag}")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// A defect in the grammar declarations, raised while schema classes are built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("duplicate definition of `{key}` in schema `{schema}`")]
    DuplicateKey { schema: SchemaId, key: Key },

    #[error("schema `{schema}` is not defined")]
    UndefinedSchema { schema: SchemaId },

    #[error("schema `{schema}` has no property `{key}` to validate")]
    UnknownProperty { schema: SchemaId, key: Key },

    #[error("schema `{schema}`: variable-length slot `{key}` must be the last and only one")]
    VariableLengthNotLast { schema: SchemaId, key: Key },

    #[error("schema `{schema}`: tag @{tag} is unique by `{key}`, which `{child}` does not declare as a property")]
    UnknownUniqueKey {
        schema: SchemaId,
        tag: Key,
        child: SchemaId,
        key: Key,
    },

    #[error("ambiguous closing: @{key} means `{outer}` in `{parent}` but `{inner}` inside its child `{child}`")]
    AmbiguousTag {
        parent: SchemaId,
        child: SchemaId,
        key: Key,
        outer: String,
        inner: String,
    },
}

/// Umbrella error for whole-corpus operations.
#[derive(Debug, Error)]
pub enum TalkError {
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
