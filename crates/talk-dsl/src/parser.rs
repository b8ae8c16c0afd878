//! Line/word parser with implicit scope closing.
//!
//! The parser keeps an explicit stack of open contexts above a synthetic
//! `base` root. A tag word opens a child of the nearest open context that
//! declares it, closing every deeper scope on the way; a close marker pops
//! the scope that declares it.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::context::Context;
use crate::error::{ErrorKind, GrammarError, ParseError, TalkError};
use crate::grammar::{Grammar, Key, SchemaId};
use crate::registry::{Location, Registry};

pub struct Parser<'g> {
    grammar: &'g Grammar,
    registry: Registry,
    root: Context<'g>,
    /// Open scopes above the root, innermost last.
    open: Vec<Context<'g>>,
}

impl Parser<'static> {
    /// A parser over the shared standard grammar.
    pub fn standard() -> Result<Self, GrammarError> {
        Parser::new(Grammar::standard()?)
    }
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Result<Self, GrammarError> {
        let root = grammar.root().ok_or(GrammarError::UndefinedSchema {
            schema: SchemaId::Base,
        })?;
        Ok(Self {
            grammar,
            registry: Registry::new(),
            root: Context::new(Key::Base, root, Location::new("", 0)),
            open: Vec::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Innermost open tag, or `base` at the top level.
    pub fn current_tag(&self) -> Key {
        self.top().tag()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<(), TalkError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| TalkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&path.display().to_string(), &contents)?;
        Ok(())
    }

    /// Parse one file's text. Scopes still open at its end are closed.
    pub fn parse(&mut self, file: &str, contents: &str) -> Result<(), ParseError> {
        let mut lines = 0;
        for (index, line) in contents.lines().enumerate() {
            lines = index + 1;
            let mut words = line.split_whitespace().peekable();
            if words.peek().is_some_and(|word| word.starts_with('#')) {
                continue;
            }
            for word in words {
                let location = Location::new(file, lines);
                match word.strip_prefix('@') {
                    Some(name) => self.enter(name, location)?,
                    None => self.push_word(word, location)?,
                }
            }
        }
        self.close_open_scopes()?;
        tracing::debug!(file, lines, "parsed file");
        Ok(())
    }

    /// Close the corpus: close the root, then check every cross-reference.
    pub fn finish(mut self) -> Result<ParseOutput<'g>, ParseError> {
        self.close_open_scopes()?;
        self.root.close(self.grammar, &mut self.registry)?;
        self.root.finalize(&self.registry)?;
        Ok(ParseOutput {
            root: self.root,
            registry: self.registry,
        })
    }

    fn top(&self) -> &Context<'g> {
        self.open.last().unwrap_or(&self.root)
    }

    fn top_mut(&mut self) -> &mut Context<'g> {
        match self.open.last_mut() {
            Some(top) => top,
            None => &mut self.root,
        }
    }

    /// Frame `0` is the root; frame `n` is `open[n - 1]`.
    fn frame(&self, depth: usize) -> &Context<'g> {
        depth
            .checked_sub(1)
            .and_then(|i| self.open.get(i))
            .unwrap_or(&self.root)
    }

    fn push_word(&mut self, word: &str, location: Location) -> Result<(), ParseError> {
        if self.open.is_empty() {
            return Err(ParseError::new(
                ErrorKind::PropertyArity,
                Some(Key::Base),
                location.file,
                location.line,
                format!("unexpected word `{word}` outside of any tag"),
            ));
        }
        self.top_mut().push_word(word);
        Ok(())
    }

    fn enter(&mut self, name: &str, location: Location) -> Result<(), ParseError> {
        let declared = Key::parse(name).and_then(|key| {
            (0..=self.open.len())
                .rev()
                .find(|&depth| self.frame(depth).schema().tag(key).is_some())
                .map(|depth| (key, depth))
        });
        let Some((key, depth)) = declared else {
            let innermost = self.current_tag();
            return Err(ParseError::new(
                ErrorKind::UnsupportedTag,
                Some(innermost),
                location.file,
                location.line,
                format!("tag @{name} not supported in @{innermost}"),
            ));
        };

        while self.open.len() > depth {
            self.close_top()?;
        }

        match self.frame(depth).open_child(self.grammar, key, location)? {
            Some(child) => {
                tracing::trace!(tag = %key, depth = depth + 1, "opened scope");
                self.open.push(child);
            }
            None => self.close_top()?,
        }
        Ok(())
    }

    /// Pop the innermost scope, close it, and fold it into its parent.
    fn close_top(&mut self) -> Result<(), ParseError> {
        let Some(mut context) = self.open.pop() else {
            return Ok(());
        };
        context.close(self.grammar, &mut self.registry)?;
        self.top_mut().close_child(context)
    }

    fn close_open_scopes(&mut self) -> Result<(), ParseError> {
        while !self.open.is_empty() {
            self.close_top()?;
        }
        Ok(())
    }
}

/// A fully closed and cross-checked corpus.
#[derive(Debug)]
pub struct ParseOutput<'g> {
    root: Context<'g>,
    registry: Registry,
}

impl<'g> ParseOutput<'g> {
    pub fn root(&self) -> &Context<'g> {
        &self.root
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Top-level contexts of one kind, in source order.
    pub fn contexts(&self, key: Key) -> &[Context<'g>] {
        self.root.children(key)
    }

    /// Top-level tag name → mappings of its contexts.
    pub fn results(&self) -> BTreeMap<&'static str, Vec<JsonValue>> {
        self.root
            .schema()
            .tags()
            .iter()
            .map(|def| {
                let mappings = self.contexts(def.key).iter().map(Context::to_mapping).collect();
                (def.key.as_str(), mappings)
            })
            .collect()
    }

    pub fn to_json(&self) -> JsonValue {
        self.root.to_mapping()
    }
}
