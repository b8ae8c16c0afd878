//! Talk schema-definition language front end.
//!
//! Talk sources are whitespace-delimited words; `@tag` words open and close
//! nested scopes. This crate parses a corpus of sources into a validated tree
//! of typed [`Context`]s plus a [`Registry`] of every declared symbol:
//!
//! - [`grammar`]: the declarative tag grammar (schema classes) and the
//!   standard Talk grammar built from it;
//! - [`context`]: the parse tree and its close/finalize lifecycle;
//! - [`parser`]: the line/word parser and its implicit-closing scope stack;
//! - [`registry`]: namespaced symbol tables with suffix lookup.
//!
//! ```
//! let mut parser = talk_dsl::Parser::standard()?;
//! parser.parse("shapes.talk", "@class Point\n@field real x\n@end\n@end\n")?;
//! let output = parser.finish()?;
//! assert_eq!(output.results()["class"][0]["name"], "Point");
//! # Ok::<(), talk_dsl::TalkError>(())
//! ```

pub mod context;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod registry;
pub mod value;

use std::path::Path;

pub use context::{Context, Phase};
pub use error::{ErrorKind, GrammarError, ParseError, TalkError};
pub use grammar::{Grammar, Key, SchemaId};
pub use parser::{ParseOutput, Parser};
pub use registry::{Location, Namespace, Registry, Symbol};
pub use value::Value;

/// Parse and finalize a set of files with the standard grammar, in order.
pub fn parse_files<P: AsRef<Path>>(paths: &[P]) -> Result<ParseOutput<'static>, TalkError> {
    let mut parser = Parser::standard()?;
    for path in paths {
        parser.parse_file(path)?;
    }
    Ok(parser.finish()?)
}

/// Parse and finalize one in-memory source with the standard grammar.
pub fn parse_str(file: &str, contents: &str) -> Result<ParseOutput<'static>, TalkError> {
    let mut parser = Parser::standard()?;
    parser.parse(file, contents)?;
    Ok(parser.finish()?)
}
