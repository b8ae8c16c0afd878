//! Closed vocabularies: property/tag keys and schema class identifiers.

use std::fmt;

use serde::Serialize;

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum! {
    /// Every property and tag identifier the grammar knows.
    ///
    /// Properties and child tags share this vocabulary; within one schema
    /// class a key is used by at most one of them.
    pub enum Key {
        Base => "base",
        Class => "class",
        Enumeration => "enumeration",
        Glossary => "glossary",
        Protocol => "protocol",
        Name => "name",
        Description => "description",
        Version => "version",
        Field => "field",
        Implement => "implement",
        Inherits => "inherits",
        Extra => "extra",
        End => "end",
        Type => "type",
        Caveat => "caveat",
        Deprecated => "deprecated",
        See => "see",
        Constant => "constant",
        Value => "value",
        Term => "term",
        Scheme => "scheme",
        Method => "method",
        Source => "source",
        Request => "request",
        Response => "response",
        Requirements => "requirements",
        Followup => "followup",
        Origin => "origin",
        Needs => "needs",
    }
}

keyword_enum! {
    /// Identifiers of the schema classes in the standard grammar.
    pub enum SchemaId {
        Base => "base",
        Class => "class",
        Field => "field",
        Reference => "reference",
        Enumeration => "enumeration",
        Constant => "constant",
        Glossary => "glossary",
        Term => "term",
        Protocol => "protocol",
        Method => "method",
        Extra => "extra",
        String => "string",
        Boolean => "boolean",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_words_are_case_sensitive() {
        assert_eq!(Key::parse("field"), Some(Key::Field));
        assert_eq!(Key::parse("Field"), None);
        assert_eq!(Key::parse(""), None);
    }
}
