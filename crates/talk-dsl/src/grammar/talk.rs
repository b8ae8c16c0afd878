//! The standard Talk grammar.

use crate::context::Context;
use crate::registry::Namespace;
use crate::value::Value;

use super::key::{Key, SchemaId};
use super::schema::{PropertyDef, SchemaBuilder, TagDef};
use super::transform::Transform;

/// Built-in field types that never resolve against the class namespace.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "int8",
    "int16",
    "int32",
    "int64",
    "string",
    "real",
    "bool",
    "object",
    "talkobject",
];

/// Declaration of one schema class. Unbuilt; [`super::Grammar::define`]
/// builds and caches it.
pub(super) fn declare(id: SchemaId) -> SchemaBuilder {
    let schema = SchemaBuilder::new(id);
    match id {
        SchemaId::Base => schema
            .tag(TagDef::new(Key::Class, SchemaId::Class).multi())
            .tag(TagDef::new(Key::Enumeration, SchemaId::Enumeration).multi())
            .tag(TagDef::new(Key::Glossary, SchemaId::Glossary).multi())
            .tag(TagDef::new(Key::Protocol, SchemaId::Protocol).multi()),

        SchemaId::Class => schema
            .register_delimited(Key::Name, Namespace::Classes, Some('.'))
            .reference(Key::Inherits, Namespace::Classes)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(description())
            .tag(TagDef::string(Key::Version).default_words("0"))
            .tag(TagDef::new(Key::Field, SchemaId::Field).multi().unique(Key::Name))
            .tag(TagDef::boolean(Key::Implement).default_words("true"))
            .tag(TagDef::string(Key::Inherits))
            .tag(extras())
            .tag(TagDef::close(Key::End))
            .validate_final("class cannot inherit from itself", inherits_another),

        SchemaId::Field => schema
            .reference_skipping(Key::Type, Namespace::Classes, PRIMITIVE_TYPES)
            .property(PropertyDef::fixed(Key::Type, 1).transform(Transform::TypeChain))
            .property(PropertyDef::fixed(Key::Name, 1))
            .validate(Key::Name, "field name cannot start with __", |name| {
                !name.as_text().is_some_and(|s| s.starts_with("__"))
            })
            .tag(description())
            .tag(TagDef::string(Key::Version))
            .tag(TagDef::string(Key::Caveat).multi())
            .tag(TagDef::string(Key::Deprecated))
            .tag(TagDef::new(Key::See, SchemaId::Reference).multi())
            .tag(TagDef::close(Key::End)),

        SchemaId::Reference => schema
            .property(
                PropertyDef::fixed(Key::Type, 1)
                    .transform(Transform::Lowercase)
                    .allowed(&[&["class"], &["enumeration", "enum"], &["glossary"]]),
            )
            .property(PropertyDef::fixed(Key::Name, 1))
            .reference_computed(Key::Name, referenced_namespace),

        SchemaId::Enumeration => schema
            .register(Key::Name, Namespace::Enumerations)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(description())
            .tag(TagDef::new(Key::Constant, SchemaId::Constant).multi().unique(Key::Name))
            .tag(TagDef::close(Key::End))
            .postprocess(number_constants),

        SchemaId::Constant => schema
            .property(PropertyDef::fixed(Key::Name, 1))
            .property(
                PropertyDef::fixed(Key::Value, 1)
                    .optional()
                    .transform(Transform::Integer),
            )
            .tag(description())
            .tag(TagDef::close(Key::End)),

        SchemaId::Glossary => schema
            .register(Key::Name, Namespace::Glossaries)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(description())
            .tag(TagDef::new(Key::Term, SchemaId::Term).multi().unique(Key::Name))
            .tag(TagDef::close(Key::End)),

        SchemaId::Term => schema
            .property(PropertyDef::fixed(Key::Name, 1))
            .property(PropertyDef::range(Key::Value, 0, None))
            .tag(TagDef::string(Key::Description))
            .tag(extras())
            .tag(TagDef::close(Key::End))
            .postprocess(default_term_value),

        SchemaId::Protocol => schema
            .register(Key::Name, Namespace::Protocols)
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(description())
            .tag(TagDef::string(Key::Scheme).multi())
            .tag(
                TagDef::new(Key::Method, SchemaId::Method)
                    .multi()
                    .required()
                    .unique(Key::Name),
            )
            .tag(TagDef::string(Key::Source))
            .tag(extras())
            .tag(TagDef::close(Key::End)),

        SchemaId::Method => schema
            .reference_skipping(Key::Request, Namespace::Classes, &["none"])
            .reference_skipping(Key::Response, Namespace::Classes, &["none"])
            .property(PropertyDef::fixed(Key::Name, 1))
            .tag(TagDef::string(Key::Description))
            .tag(TagDef::string(Key::Request))
            .tag(TagDef::string(Key::Response))
            .tag(TagDef::string(Key::Requirements))
            .tag(TagDef::string(Key::Followup))
            .tag(TagDef::string(Key::Origin).allowed(&[&["client"], &["server"], &["both"]]))
            .tag(
                TagDef::string(Key::Needs).allowed(&[&["nothing"], &["connection"], &["both"]]),
            )
            .tag(extras())
            .tag(TagDef::close(Key::End)),

        SchemaId::Extra => schema
            .property(PropertyDef::fixed(Key::Name, 1))
            .property(PropertyDef::range(Key::Value, 0, None))
            .tag(TagDef::close(Key::End)),

        SchemaId::String => schema
            .property(PropertyDef::range(Key::Value, 1, None))
            .scalar(Key::Value),

        SchemaId::Boolean => schema
            .property(
                PropertyDef::fixed(Key::Value, 1)
                    .transform(Transform::Lowercase)
                    .transform(Transform::Boolean),
            )
            .scalar(Key::Value),
    }
}

/// Either `@description` or whatever follows the last property.
fn description() -> TagDef {
    TagDef::string(Key::Description).implicit()
}

fn extras() -> TagDef {
    TagDef::new(Key::Extra, SchemaId::Extra).multi().unique(Key::Name)
}

fn inherits_another(class: &Context<'_>) -> bool {
    let (Some(name), Some(parent)) = (
        class.text(Key::Name),
        class.child_value(Key::Inherits).and_then(Value::as_text),
    ) else {
        return true;
    };
    name != parent
}

fn referenced_namespace(reference: &Context<'_>) -> Option<Namespace> {
    match reference.text(Key::Type)? {
        "class" => Some(Namespace::Classes),
        "enumeration" => Some(Namespace::Enumerations),
        "glossary" => Some(Namespace::Glossaries),
        _ => None,
    }
}

/// C-style numbering: an omitted value is the previous constant plus one,
/// or zero for the first.
fn number_constants(enumeration: &mut Context<'_>) -> Result<(), String> {
    let mut next = Some(0i64);
    for constant in enumeration.children_mut(Key::Constant) {
        let value = match constant.get(Key::Value).and_then(Value::as_integer) {
            Some(explicit) => explicit,
            None => {
                let implicit = next.ok_or_else(|| {
                    format!(
                        "constant {} overflows the enumeration counter",
                        constant.text(Key::Name).unwrap_or("?")
                    )
                })?;
                constant.set(Key::Value, Value::Integer(implicit));
                implicit
            }
        };
        next = value.checked_add(1);
    }
    Ok(())
}

fn default_term_value(term: &mut Context<'_>) -> Result<(), String> {
    if term.get(Key::Value).is_none() {
        if let Some(name) = term.get(Key::Name).cloned() {
            term.set(Key::Value, name);
        }
    }
    Ok(())
}
