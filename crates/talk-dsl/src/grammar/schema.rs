//! Schema classes and the builder that declares them.

use std::fmt;

use crate::context::Context;
use crate::error::GrammarError;
use crate::registry::Namespace;
use crate::value::Value;

use super::key::{Key, SchemaId};
use super::transform::{AllowedValues, Transform};

// ============================================================================
// Properties
// ============================================================================

/// How many words a property consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// `max: None` is unbounded. A schema has at most one range slot, last.
    Range { min: usize, max: Option<usize> },
}

impl Arity {
    pub fn is_variable(self) -> bool {
        matches!(self, Arity::Range { .. })
    }
}

#[derive(Clone)]
pub enum Check {
    OneOf(AllowedValues),
    Predicate(fn(&Value) -> bool),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::OneOf(allowed) => f.debug_tuple("OneOf").field(allowed).finish(),
            Check::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A per-value check; `message` is reported verbatim on failure.
#[derive(Debug, Clone)]
pub struct Validator {
    pub message: String,
    pub check: Check,
}

impl Validator {
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.check {
            Check::OneOf(allowed) => value.as_text().is_some_and(|s| allowed.contains(s)),
            Check::Predicate(f) => f(value),
        }
    }
}

/// A positional word slot of a schema class.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub key: Key,
    pub arity: Arity,
    pub required: bool,
    pub transforms: Vec<Transform>,
    pub validators: Vec<Validator>,
}

impl PropertyDef {
    pub fn fixed(key: Key, words: usize) -> Self {
        Self {
            key,
            arity: Arity::Fixed(words),
            required: true,
            transforms: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// A variable-length slot; required only when it needs at least one word.
    pub fn range(key: Key, min: usize, max: Option<usize>) -> Self {
        Self {
            key,
            arity: Arity::Range { min, max },
            required: min > 0,
            transforms: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Restrict the value to `groups`; synonyms normalize to the first member
    /// of their group.
    pub fn allowed(mut self, groups: &[&[&'static str]]) -> Self {
        let allowed = AllowedValues::new(groups);
        self.transforms.push(Transform::Alias(allowed.clone()));
        self.validators.push(Validator {
            message: format!("illegal {} value; must be one of {allowed}", self.key),
            check: Check::OneOf(allowed),
        });
        self
    }
}

// ============================================================================
// Tags
// ============================================================================

/// A child tag a schema class accepts.
///
/// A tag without a schema is a close marker: it ends the current scope.
#[derive(Debug, Clone)]
pub struct TagDef {
    pub key: Key,
    pub schema: Option<SchemaId>,
    pub multi: bool,
    pub required: bool,
    /// Siblings must carry distinct values of this child property.
    pub unique: Option<Key>,
    /// Words synthesized for the tag when it is absent at close.
    pub default: Option<&'static str>,
    /// Allowed values for the child's scalar.
    pub allowed: Option<AllowedValues>,
    /// Trailing words after the parent's properties fill this tag.
    pub implicit: bool,
}

impl TagDef {
    pub fn new(key: Key, schema: SchemaId) -> Self {
        Self {
            key,
            schema: Some(schema),
            multi: false,
            required: false,
            unique: None,
            default: None,
            allowed: None,
            implicit: false,
        }
    }

    /// Shorthand for a tag holding free text.
    pub fn string(key: Key) -> Self {
        Self::new(key, SchemaId::String)
    }

    pub fn boolean(key: Key) -> Self {
        Self::new(key, SchemaId::Boolean)
    }

    pub fn close(key: Key) -> Self {
        Self {
            schema: None,
            ..Self::new(key, SchemaId::String)
        }
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self, key: Key) -> Self {
        self.unique = Some(key);
        self
    }

    pub fn default_words(mut self, words: &'static str) -> Self {
        self.default = Some(words);
        self
    }

    pub fn allowed(mut self, groups: &[&[&'static str]]) -> Self {
        self.allowed = Some(AllowedValues::new(groups));
        self
    }

    pub fn implicit(mut self) -> Self {
        self.implicit = true;
        self
    }

    pub fn is_close_marker(&self) -> bool {
        self.schema.is_none()
    }
}

// ============================================================================
// Registration, references, whole-context checks
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub key: Key,
    pub namespace: Namespace,
    pub delimiter: Option<char>,
}

#[derive(Clone, Copy)]
pub enum Target {
    Fixed(Namespace),
    /// Chosen from the referencing context; `None` skips the check.
    Computed(fn(&Context<'_>) -> Option<Namespace>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Fixed(ns) => f.debug_tuple("Fixed").field(ns).finish(),
            Target::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub key: Key,
    pub target: Target,
    /// Values that never need to resolve (built-in type names, `none`).
    pub skip: &'static [&'static str],
}

#[derive(Clone)]
pub enum FinalCheck {
    RequiredProperty(Key),
    RequiredTag(Key),
    SingularTag(Key),
    Predicate(fn(&Context<'_>) -> bool),
}

impl fmt::Debug for FinalCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalCheck::RequiredProperty(k) => f.debug_tuple("RequiredProperty").field(k).finish(),
            FinalCheck::RequiredTag(k) => f.debug_tuple("RequiredTag").field(k).finish(),
            FinalCheck::SingularTag(k) => f.debug_tuple("SingularTag").field(k).finish(),
            FinalCheck::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinalValidator {
    pub message: String,
    pub check: FinalCheck,
}

/// Mutates a closing context; an `Err` message becomes a property-value error.
pub type Postprocess = fn(&mut Context<'_>) -> Result<(), String>;

// ============================================================================
// Schema class
// ============================================================================

/// The grammar of one tag: its properties, child tags and closing hooks.
#[derive(Clone)]
pub struct SchemaClass {
    pub(crate) id: SchemaId,
    pub(crate) properties: Vec<PropertyDef>,
    pub(crate) tags: Vec<TagDef>,
    pub(crate) registrations: Vec<Registration>,
    pub(crate) references: Vec<Reference>,
    pub(crate) final_validators: Vec<FinalValidator>,
    pub(crate) postprocesses: Vec<Postprocess>,
    pub(crate) scalar: Option<Key>,
}

impl fmt::Debug for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaClass")
            .field("id", &self.id)
            .field(
                "properties",
                &self.properties.iter().map(|p| p.key).collect::<Vec<_>>(),
            )
            .field("tags", &self.tags.iter().map(|t| t.key).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SchemaClass {
    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn tags(&self) -> &[TagDef] {
        &self.tags
    }

    pub fn property(&self, key: Key) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.key == key)
    }

    pub fn tag(&self, key: Key) -> Option<&TagDef> {
        self.tags.iter().find(|t| t.key == key)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn final_validators(&self) -> &[FinalValidator] {
        &self.final_validators
    }

    /// The property a tag of this schema collapses to in mappings.
    pub fn scalar(&self) -> Option<Key> {
        self.scalar
    }

    /// Ids of every schema reachable through one child tag.
    pub fn child_schemas(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.tags.iter().filter_map(|t| t.schema)
    }

    fn uses(&self, key: Key) -> bool {
        self.property(key).is_some() || self.tag(key).is_some()
    }
}

/// Declares a [`SchemaClass`]. The first declaration error is kept and
/// returned by [`SchemaBuilder::build`].
pub struct SchemaBuilder {
    class: SchemaClass,
    error: Option<GrammarError>,
}

impl SchemaBuilder {
    pub fn new(id: SchemaId) -> Self {
        Self {
            class: SchemaClass {
                id,
                properties: Vec::new(),
                tags: Vec::new(),
                registrations: Vec::new(),
                references: Vec::new(),
                final_validators: Vec::new(),
                postprocesses: Vec::new(),
                scalar: None,
            },
            error: None,
        }
    }

    fn fail(&mut self, err: GrammarError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn claim(&mut self, key: Key) -> bool {
        if self.class.uses(key) {
            let schema = self.class.id;
            self.fail(GrammarError::DuplicateKey { schema, key });
            return false;
        }
        true
    }

    pub fn property(mut self, def: PropertyDef) -> Self {
        if self.claim(def.key) {
            self.class.properties.push(def);
        }
        self
    }

    pub fn tag(mut self, def: TagDef) -> Self {
        if self.claim(def.key) {
            self.class.tags.push(def);
        }
        self
    }

    /// Attach a value check to an already declared property.
    pub fn validate(mut self, key: Key, message: &str, check: fn(&Value) -> bool) -> Self {
        let schema = self.class.id;
        match self.class.properties.iter_mut().find(|p| p.key == key) {
            Some(def) => def.validators.push(Validator {
                message: message.to_string(),
                check: Check::Predicate(check),
            }),
            None => self.fail(GrammarError::UnknownProperty { schema, key }),
        }
        self
    }

    pub fn validate_final(mut self, message: &str, check: fn(&Context<'_>) -> bool) -> Self {
        self.class.final_validators.push(FinalValidator {
            message: message.to_string(),
            check: FinalCheck::Predicate(check),
        });
        self
    }

    pub fn postprocess(mut self, hook: Postprocess) -> Self {
        self.class.postprocesses.push(hook);
        self
    }

    pub fn register(self, key: Key, namespace: Namespace) -> Self {
        self.register_delimited(key, namespace, None)
    }

    pub fn register_delimited(
        mut self,
        key: Key,
        namespace: Namespace,
        delimiter: Option<char>,
    ) -> Self {
        self.class.registrations.push(Registration {
            key,
            namespace,
            delimiter,
        });
        self
    }

    pub fn reference(self, key: Key, namespace: Namespace) -> Self {
        self.reference_skipping(key, namespace, &[])
    }

    pub fn reference_skipping(
        mut self,
        key: Key,
        namespace: Namespace,
        skip: &'static [&'static str],
    ) -> Self {
        self.class.references.push(Reference {
            key,
            target: Target::Fixed(namespace),
            skip,
        });
        self
    }

    pub fn reference_computed(
        mut self,
        key: Key,
        target: fn(&Context<'_>) -> Option<Namespace>,
    ) -> Self {
        self.class.references.push(Reference {
            key,
            target: Target::Computed(target),
            skip: &[],
        });
        self
    }

    pub fn scalar(mut self, key: Key) -> Self {
        self.class.scalar = Some(key);
        self
    }

    pub fn build(mut self) -> Result<SchemaClass, GrammarError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.check_variable_slot()?;

        let mut class = self.class;
        let schema = class.id;
        let mut implied = Vec::new();
        for property in class.properties.iter().filter(|p| p.required) {
            implied.push(FinalValidator {
                message: format!("{schema}.{}: required property cannot be omitted", property.key),
                check: FinalCheck::RequiredProperty(property.key),
            });
        }
        for tag in class.tags.iter().filter(|t| !t.is_close_marker()) {
            if !tag.multi {
                implied.push(FinalValidator {
                    message: format!("{schema}->@{}: tag may only be added once", tag.key),
                    check: FinalCheck::SingularTag(tag.key),
                });
            }
            if tag.required {
                implied.push(FinalValidator {
                    message: format!("{schema}->@{}: required tag cannot be omitted", tag.key),
                    check: FinalCheck::RequiredTag(tag.key),
                });
            }
        }
        implied.append(&mut class.final_validators);
        class.final_validators = implied;
        Ok(class)
    }

    fn check_variable_slot(&self) -> Result<(), GrammarError> {
        let schema = self.class.id;
        let implicit: Vec<Key> = self
            .class
            .tags
            .iter()
            .filter(|t| t.implicit)
            .map(|t| t.key)
            .collect();
        if let Some(&key) = implicit.get(1) {
            return Err(GrammarError::VariableLengthNotLast { schema, key });
        }

        let last = self.class.properties.len().saturating_sub(1);
        for (i, property) in self.class.properties.iter().enumerate() {
            if property.arity.is_variable() && (i != last || !implicit.is_empty()) {
                return Err(GrammarError::VariableLengthNotLast {
                    schema,
                    key: property.key,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_between_property_and_tag() {
        let err = SchemaBuilder::new(SchemaId::Extra)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(TagDef::string(Key::Name))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateKey {
                schema: SchemaId::Extra,
                key: Key::Name
            }
        );
    }

    #[test]
    fn variable_slot_must_be_last() {
        let err = SchemaBuilder::new(SchemaId::Term)
            .property(PropertyDef::range(Key::Value, 0, None))
            .property(PropertyDef::fixed(Key::Name, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::VariableLengthNotLast { key: Key::Value, .. }));

        let err = SchemaBuilder::new(SchemaId::Term)
            .property(PropertyDef::range(Key::Value, 0, None))
            .tag(TagDef::string(Key::Description).implicit())
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::VariableLengthNotLast { .. }));
    }

    #[test]
    fn implied_final_validators_follow_declarations() {
        let class = SchemaBuilder::new(SchemaId::Method)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(TagDef::string(Key::Description).required())
            .tag(TagDef::string(Key::Caveat).multi())
            .tag(TagDef::close(Key::End))
            .validate_final("custom", |_| true)
            .build()
            .unwrap();

        let messages: Vec<&str> = class
            .final_validators()
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "method.name: required property cannot be omitted",
                "method->@description: tag may only be added once",
                "method->@description: required tag cannot be omitted",
                "custom",
            ]
        );
    }

    #[test]
    fn validate_needs_a_declared_property() {
        let err = SchemaBuilder::new(SchemaId::Field)
            .validate(Key::Name, "nope", |_| true)
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::UnknownProperty { key: Key::Name, .. }));
    }

    #[test]
    fn allowed_rejects_unknown_and_accepts_synonyms() {
        let def = PropertyDef::fixed(Key::Type, 1).allowed(&[&["class"], &["enumeration", "enum"]]);
        let validator = &def.validators[0];
        assert!(validator.accepts(&Value::Text("enum".into())));
        assert!(!validator.accepts(&Value::Text("struct".into())));
        assert_eq!(
            validator.message,
            "illegal type value; must be one of class, enumeration (enum)"
        );
    }
}
