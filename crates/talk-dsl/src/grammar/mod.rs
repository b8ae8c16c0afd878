//! Tag grammar: schema classes, their declarations, and the grammar cache.
//!
//! A [`Grammar`] maps every [`SchemaId`] reachable from the root to its built
//! [`SchemaClass`]. Classes are constructed on first definition and cached;
//! each class is inserted before its children are visited, so recursive tag
//! structures terminate.

mod key;
mod schema;
mod talk;
mod transform;

use std::collections::HashMap;
use std::sync::OnceLock;

pub use key::{Key, SchemaId};
pub use schema::{
    Arity, Check, FinalCheck, FinalValidator, Postprocess, PropertyDef, Reference, Registration,
    SchemaBuilder, SchemaClass, TagDef, Target, Validator,
};
pub use talk::PRIMITIVE_TYPES;
pub use transform::{dissect_type, parse_boolean, parse_integer, AllowedValues, Transform};

use crate::error::GrammarError;

#[derive(Debug, Default)]
pub struct Grammar {
    schemas: HashMap<SchemaId, SchemaClass>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide standard grammar, built once and shared read-only.
    pub fn standard() -> Result<&'static Grammar, GrammarError> {
        static STANDARD: OnceLock<Result<Grammar, GrammarError>> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                let mut grammar = Grammar::new();
                grammar.define(SchemaId::Base)?;
                grammar.check()?;
                tracing::debug!(schemas = grammar.schemas.len(), "built standard grammar");
                Ok(grammar)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Build `id` and everything reachable from it. Idempotent.
    pub fn define(&mut self, id: SchemaId) -> Result<&SchemaClass, GrammarError> {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if self.schemas.contains_key(&next) {
                continue;
            }
            let class = talk::declare(next).build()?;
            pending.extend(class.child_schemas());
            self.schemas.insert(next, class);
        }
        self.get(id).ok_or(GrammarError::UndefinedSchema { schema: id })
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaClass> {
        self.schemas.get(&id)
    }

    pub fn root(&self) -> Option<&SchemaClass> {
        self.get(SchemaId::Base)
    }

    /// Cross-schema consistency of everything defined so far.
    ///
    /// - a tag's unique key must be a property of the child schema;
    /// - a tag key declared by both a schema and one of its direct children
    ///   must mean the same thing in both, otherwise closing is ambiguous.
    pub fn check(&self) -> Result<(), GrammarError> {
        let mut ids: Vec<SchemaId> = self.schemas.keys().copied().collect();
        ids.sort();

        for id in ids {
            let Some(parent) = self.get(id) else { continue };
            for tag in parent.tags() {
                let Some(child) = tag.schema.and_then(|c| self.get(c)) else {
                    continue;
                };
                if let Some(unique) = tag.unique {
                    if child.property(unique).is_none() {
                        return Err(GrammarError::UnknownUniqueKey {
                            schema: id,
                            tag: tag.key,
                            child: child.id(),
                            key: unique,
                        });
                    }
                }
                for inner in child.tags() {
                    let Some(outer) = parent.tag(inner.key) else {
                        continue;
                    };
                    if outer.schema != inner.schema {
                        return Err(GrammarError::AmbiguousTag {
                            parent: id,
                            child: child.id(),
                            key: inner.key,
                            outer: describe(outer),
                            inner: describe(inner),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn describe(tag: &TagDef) -> String {
    match tag.schema {
        Some(id) => id.to_string(),
        None => "close".to_string(),
    }
}
