//! Context tree.
//!
//! A [`Context`] is one parsed instance of a schema class. While open it only
//! buffers raw words and collects closed children; [`Context::close`] turns
//! the words into typed properties and runs the schema's hooks, and
//! [`Context::finalize`] checks cross-references once the whole corpus has
//! been registered.

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{ErrorKind, ParseError};
use crate::grammar::{
    AllowedValues, Arity, FinalCheck, Grammar, Key, PropertyDef, SchemaClass, TagDef, Target,
};
use crate::registry::{Location, Registry};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Closed,
    Finalized,
}

/// What a key holds: a property value, or the closed children of a tag.
#[derive(Debug, Clone)]
pub enum Slot<'g> {
    Value(Value),
    Children(Vec<Context<'g>>),
}

#[derive(Debug, Clone)]
pub struct Context<'g> {
    tag: Key,
    schema: &'g SchemaClass,
    location: Location,
    words: Vec<String>,
    contents: BTreeMap<Key, Slot<'g>>,
    phase: Phase,
}

impl<'g> Context<'g> {
    pub fn new(tag: Key, schema: &'g SchemaClass, location: Location) -> Self {
        Self {
            tag,
            schema,
            location,
            words: Vec::new(),
            contents: BTreeMap::new(),
            phase: Phase::Open,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn tag(&self) -> Key {
        self.tag
    }

    pub fn schema(&self) -> &'g SchemaClass {
        self.schema
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Words buffered since the context was opened; empty once closed.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        match self.contents.get(&key) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self, key: Key) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn children(&self, key: Key) -> &[Context<'g>] {
        match self.contents.get(&key) {
            Some(Slot::Children(children)) => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self, key: Key) -> &mut [Context<'g>] {
        match self.contents.get_mut(&key) {
            Some(Slot::Children(children)) => children,
            _ => &mut [],
        }
    }

    /// The value a scalar schema (`string`, `boolean`) collapses to.
    pub fn scalar(&self) -> Option<&Value> {
        self.schema.scalar().and_then(|key| self.get(key))
    }

    /// Scalar of the first `key` child: `@inherits Shape` yields `Shape`.
    pub fn child_value(&self, key: Key) -> Option<&Value> {
        self.children(key).first().and_then(Context::scalar)
    }

    pub fn set(&mut self, key: Key, value: Value) {
        self.contents.insert(key, Slot::Value(value));
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(
            kind,
            Some(self.tag),
            self.location.file.clone(),
            self.location.line,
            message,
        )
    }

    // ========================================================================
    // Open phase
    // ========================================================================

    pub fn push_word(&mut self, word: impl Into<String>) {
        debug_assert_eq!(self.phase, Phase::Open, "word pushed into a closed @{}", self.tag);
        self.words.push(word.into());
    }

    /// A fresh child for `tag`, or `None` when `tag` is a close marker.
    pub fn open_child(
        &self,
        grammar: &'g Grammar,
        tag: Key,
        location: Location,
    ) -> Result<Option<Context<'g>>, ParseError> {
        let Some(def) = self.schema.tag(tag) else {
            return Err(ParseError::new(
                ErrorKind::UnsupportedTag,
                Some(self.tag),
                location.file,
                location.line,
                format!("tag @{tag} not supported in @{}", self.tag),
            ));
        };
        let Some(id) = def.schema else {
            return Ok(None);
        };
        let schema = grammar.get(id).ok_or_else(|| {
            self.error(ErrorKind::UnsupportedTag, format!("schema {id} is not defined"))
        })?;
        Ok(Some(Context::new(tag, schema, location)))
    }

    /// Attach a closed child, enforcing the tag's allowed values and
    /// sibling uniqueness.
    pub fn close_child(&mut self, mut child: Context<'g>) -> Result<(), ParseError> {
        let Some(def) = self.schema.tag(child.tag) else {
            return Err(child.error(
                ErrorKind::UnsupportedTag,
                format!("tag @{} not supported in @{}", child.tag, self.tag),
            ));
        };

        if let Some(allowed) = &def.allowed {
            child.normalize_scalar(allowed)?;
        }

        if let Some(unique) = def.unique {
            let previous = child.get(unique).and_then(|value| {
                self.children(child.tag)
                    .iter()
                    .find(|sibling| sibling.get(unique) == Some(value))
                    .map(|sibling| sibling.location.line)
            });
            if let Some(line) = previous {
                return Err(child.error(
                    ErrorKind::TagCardinality,
                    format!(
                        "child tag @{} must have unique {unique} value; previously used in sibling at line {line}",
                        child.tag
                    ),
                ));
            }
        }

        let slot = self
            .contents
            .entry(child.tag)
            .or_insert_with(|| Slot::Children(Vec::new()));
        if let Slot::Children(children) = slot {
            children.push(child);
        } else {
            *slot = Slot::Children(vec![child]);
        }
        Ok(())
    }

    fn normalize_scalar(&mut self, allowed: &AllowedValues) -> Result<(), ParseError> {
        let Some(key) = self.schema.scalar() else {
            return Ok(());
        };
        let Some(text) = self.text(key) else {
            return Ok(());
        };
        match allowed.canonical(text) {
            Some(canonical) => {
                self.set(key, Value::Text(canonical.to_string()));
                Ok(())
            }
            None => Err(self.error(
                ErrorKind::PropertyValue,
                format!("illegal {} value `{text}`; must be one of {allowed}", self.tag),
            )),
        }
    }

    // ========================================================================
    // Close phase
    // ========================================================================

    /// Slice words into properties, transform and validate them, materialize
    /// implicit and defaulted tags, run postprocesses and final validators,
    /// then register. Closing twice is a no-op.
    pub fn close(&mut self, grammar: &'g Grammar, registry: &mut Registry) -> Result<(), ParseError> {
        if self.phase != Phase::Open {
            return Ok(());
        }
        let schema = self.schema;

        let words = std::mem::take(&mut self.words);
        self.assign_properties(grammar, registry, words)?;
        self.apply_defaults(grammar, registry)?;

        for hook in &schema.postprocesses {
            hook(self).map_err(|message| self.error(ErrorKind::PropertyValue, message))?;
        }

        for validator in &schema.final_validators {
            let (ok, kind) = match validator.check {
                FinalCheck::RequiredProperty(key) => {
                    (self.contents.contains_key(&key), ErrorKind::PropertyArity)
                }
                FinalCheck::RequiredTag(key) => {
                    (!self.children(key).is_empty(), ErrorKind::TagCardinality)
                }
                FinalCheck::SingularTag(key) => {
                    (self.children(key).len() <= 1, ErrorKind::TagCardinality)
                }
                FinalCheck::Predicate(check) => (check(self), ErrorKind::PropertyValue),
            };
            if !ok {
                return Err(self.error(kind, validator.message.clone()));
            }
        }

        for registration in &schema.registrations {
            let Some(name) = self.get(registration.key).and_then(Value::symbol) else {
                continue;
            };
            registry
                .register(
                    name,
                    registration.namespace,
                    self.location.clone(),
                    registration.delimiter,
                )
                .map_err(|err| err.near(self.tag))?;
        }

        self.phase = Phase::Closed;
        tracing::trace!(
            tag = %self.tag,
            file = %self.location.file,
            line = self.location.line,
            "closed context"
        );
        Ok(())
    }

    fn assign_properties(
        &mut self,
        grammar: &'g Grammar,
        registry: &mut Registry,
        words: Vec<String>,
    ) -> Result<(), ParseError> {
        let schema = self.schema;
        let mut rest = words.as_slice();

        for property in &schema.properties {
            let key = property.key;
            let take = match property.arity {
                Arity::Fixed(n) if rest.len() >= n => n,
                Arity::Fixed(_) if rest.is_empty() && !property.required => continue,
                Arity::Fixed(n) => {
                    return Err(self.arity_error(key, n, rest.len(), "exactly"));
                }
                Arity::Range { min, max } => {
                    let take = rest.len().min(max.unwrap_or(usize::MAX));
                    if take < min {
                        return Err(self.arity_error(key, min, take, "at least"));
                    }
                    if take == 0 {
                        continue;
                    }
                    take
                }
            };

            let (used, remaining) = rest.split_at(take);
            let value = self.convert(property, Value::Text(used.join(" ")))?;
            self.set(key, value);
            rest = remaining;
        }

        if rest.is_empty() {
            return Ok(());
        }
        let Some(implicit) = schema.tags.iter().find(|t| t.implicit) else {
            return Err(self.error(
                ErrorKind::PropertyArity,
                format!(
                    "@{} has unexpected trailing words: {}",
                    self.tag,
                    rest.join(" ")
                ),
            ));
        };
        if !self.children(implicit.key).is_empty() {
            return Err(self.error(
                ErrorKind::TagCardinality,
                format!(
                    "@{} given both as a tag and as trailing words",
                    implicit.key
                ),
            ));
        }
        self.materialize(grammar, registry, implicit, rest.to_vec())
    }

    fn arity_error(&self, key: Key, wanted: usize, got: usize, bound: &str) -> ParseError {
        let message = if got == 0 {
            format!("@{} property '{key}' cannot be omitted", self.tag)
        } else {
            format!(
                "@{} property '{key}' needs {bound} {wanted} words, got {got}",
                self.tag
            )
        };
        self.error(ErrorKind::PropertyArity, message)
    }

    fn convert(&self, property: &PropertyDef, mut value: Value) -> Result<Value, ParseError> {
        for transform in &property.transforms {
            value = transform.apply(value).map_err(|message| {
                self.error(ErrorKind::PropertyValue, format!("{}: {message}", property.key))
            })?;
        }
        for validator in &property.validators {
            if !validator.accepts(&value) {
                return Err(self.error(
                    ErrorKind::PropertyValue,
                    format!("{} (got `{value}`)", validator.message),
                ));
            }
        }
        Ok(value)
    }

    fn apply_defaults(&mut self, grammar: &'g Grammar, registry: &mut Registry) -> Result<(), ParseError> {
        let schema = self.schema;
        for def in &schema.tags {
            let Some(words) = def.default else { continue };
            if self.children(def.key).is_empty() {
                let words = words.split_whitespace().map(str::to_string).collect();
                self.materialize(grammar, registry, def, words)?;
            }
        }
        Ok(())
    }

    /// Synthesize a child for `def` from `words`, at this context's location.
    fn materialize(
        &mut self,
        grammar: &'g Grammar,
        registry: &mut Registry,
        def: &TagDef,
        words: Vec<String>,
    ) -> Result<(), ParseError> {
        let Some(id) = def.schema else {
            return Ok(());
        };
        let schema = grammar.get(id).ok_or_else(|| {
            self.error(ErrorKind::UnsupportedTag, format!("schema {id} is not defined"))
        })?;
        let mut child = Context::new(def.key, schema, self.location.clone());
        child.words = words;
        child.close(grammar, registry)?;
        self.close_child(child)
    }

    // ========================================================================
    // Finalize phase
    // ========================================================================

    /// Check every cross-reference in this subtree, children first.
    pub fn finalize(&mut self, registry: &Registry) -> Result<(), ParseError> {
        if self.phase == Phase::Finalized {
            return Ok(());
        }
        for slot in self.contents.values_mut() {
            if let Slot::Children(children) = slot {
                for child in children.iter_mut() {
                    child.finalize(registry)?;
                }
            }
        }

        let schema = self.schema;
        for reference in &schema.references {
            let namespace = match reference.target {
                Target::Fixed(namespace) => Some(namespace),
                Target::Computed(select) => select(self),
            };
            let Some(namespace) = namespace else { continue };

            for name in self.reference_symbols(reference.key) {
                if reference.skip.iter().any(|skip| *skip == name) {
                    continue;
                }
                if !registry.is_registered(name, namespace) {
                    return Err(self.error(
                        ErrorKind::CrossReference,
                        format!("cross-reference failed: no symbol {name} in {namespace}"),
                    ));
                }
            }
        }

        self.phase = Phase::Finalized;
        Ok(())
    }

    fn reference_symbols(&self, key: Key) -> Vec<&str> {
        match self.contents.get(&key) {
            Some(Slot::Value(value)) => value.symbol().into_iter().collect(),
            Some(Slot::Children(children)) => children
                .iter()
                .filter_map(Context::scalar)
                .filter_map(Value::symbol)
                .collect(),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Properties in declaration order, then tags. Multi tags are always
    /// arrays; absent singular tags are omitted; scalar children collapse to
    /// their value.
    pub fn to_mapping(&self) -> JsonValue {
        let mut map = JsonMap::new();
        for property in &self.schema.properties {
            if let Some(value) = self.get(property.key) {
                map.insert(property.key.to_string(), value.to_json());
            }
        }
        for def in self.schema.tags.iter().filter(|t| !t.is_close_marker()) {
            let mut rendered = self.children(def.key).iter().map(Context::render);
            if def.multi {
                map.insert(def.key.to_string(), JsonValue::Array(rendered.collect()));
            } else if let Some(first) = rendered.next() {
                map.insert(def.key.to_string(), first);
            }
        }
        JsonValue::Object(map)
    }

    fn render(&self) -> JsonValue {
        match self.schema.scalar() {
            Some(key) => self.get(key).map_or(JsonValue::Null, Value::to_json),
            None => self.to_mapping(),
        }
    }
}
