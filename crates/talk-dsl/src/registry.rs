//! Symbol registry: namespaced, hierarchical, suffix-searchable.
//!
//! Each [`Namespace`] is an independent trie. A registration with a delimiter
//! (classes use `.`) splits its name into segments: intermediate segments
//! become container entries, the final one becomes a leaf carrying the
//! defining location. A container may later be promoted to a leaf.
//!
//! Besides the trie, every namespace keeps a reverse index from each
//! delimiter-joined *suffix* of a qualified name to the symbols that end with
//! it, so `Point` resolves `geometry.Point` without spelling the package.
//!
//! The registry is plain owned state: one parse invocation owns one registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ParseError};

/// Independent symbol tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Classes,
    Enumerations,
    Glossaries,
    Protocols,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Classes,
        Namespace::Enumerations,
        Namespace::Glossaries,
        Namespace::Protocols,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Classes => "classes",
            Namespace::Enumerations => "enumerations",
            Namespace::Glossaries => "glossaries",
            Namespace::Protocols => "protocols",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a symbol (or a context) was defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A registered leaf: its fully-qualified name and definition site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    /// `Some` for leaves; `None` for pure containers.
    location: Option<Location>,
    children: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone, Default)]
struct NamespaceTree {
    root: BTreeMap<String, Entry>,
    delimiter: Option<char>,
    suffixes: HashMap<String, Vec<Symbol>>,
}

impl NamespaceTree {
    fn split<'a>(&self, name: &'a str) -> Vec<&'a str> {
        match self.delimiter {
            Some(d) => name.split(d).collect(),
            None => vec![name],
        }
    }

    fn exact(&self, segments: &[&str]) -> Option<&Location> {
        let (last, parents) = segments.split_last()?;
        let mut level = &self.root;
        for segment in parents {
            level = &level.get(*segment)?.children;
        }
        level.get(*last)?.location.as_ref()
    }

    fn join(&self, segments: &[&str]) -> String {
        match self.delimiter {
            Some(d) => {
                let mut buf = [0u8; 4];
                let separator: &str = d.encode_utf8(&mut buf);
                segments.join(separator)
            }
            None => segments.concat(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    namespaces: BTreeMap<Namespace, NamespaceTree>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every namespace.
    pub fn reset(&mut self) {
        self.namespaces.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(|tree| tree.root.is_empty())
    }

    /// Register `name` in `namespace`.
    ///
    /// The first registration into a namespace fixes its delimiter; later
    /// lookups split queries with it. Registering the same exact path twice
    /// fails with a [`ErrorKind::RegistrationConflict`] raised at `location`
    /// and naming the earlier definition site.
    pub fn register(
        &mut self,
        name: &str,
        namespace: Namespace,
        location: Location,
        delimiter: Option<char>,
    ) -> Result<(), ParseError> {
        let tree = self.namespaces.entry(namespace).or_default();
        if tree.delimiter.is_none() {
            tree.delimiter = delimiter;
        }

        let segments = tree.split(name);
        if let Some(previous) = tree.exact(&segments) {
            return Err(ParseError::new(
                ErrorKind::RegistrationConflict,
                None,
                location.file,
                location.line,
                format!(
                    "duplicate registration {name} in {namespace}; previously defined at {previous}"
                ),
            ));
        }

        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };
        let mut level = &mut tree.root;
        for segment in parents {
            level = &mut level.entry(segment.to_string()).or_default().children;
        }
        level.entry(last.to_string()).or_default().location = Some(location.clone());

        let symbol = Symbol {
            name: tree.join(&segments),
            location,
        };
        for start in (0..segments.len()).rev() {
            let suffix = tree.join(&segments[start..]);
            tree.suffixes.entry(suffix).or_default().push(symbol.clone());
        }

        tracing::trace!(%namespace, name = %symbol.name, "registered symbol");
        Ok(())
    }

    /// `true` when `name` is an exact qualified path, or the suffix of one.
    pub fn is_registered(&self, name: &str, namespace: Namespace) -> bool {
        let Some(tree) = self.namespaces.get(&namespace) else {
            return false;
        };
        let segments = tree.split(name);
        tree.exact(&segments).is_some() || tree.suffixes.contains_key(name)
    }

    /// The symbols `name` resolves to; exact matches win over suffix matches.
    pub fn lookup(&self, name: &str, namespace: Namespace) -> Vec<&Symbol> {
        let Some(candidates) = self
            .namespaces
            .get(&namespace)
            .and_then(|tree| tree.suffixes.get(name))
        else {
            return Vec::new();
        };

        let exact: Vec<&Symbol> = candidates.iter().filter(|s| s.name == name).collect();
        if exact.is_empty() {
            candidates.iter().collect()
        } else {
            exact
        }
    }

    /// Every leaf in `namespace`, sorted by qualified name.
    pub fn symbols(&self, namespace: Namespace) -> Vec<&Symbol> {
        let Some(tree) = self.namespaces.get(&namespace) else {
            return Vec::new();
        };
        let mut out: Vec<&Symbol> = tree
            .suffixes
            .iter()
            .flat_map(|(suffix, symbols)| symbols.iter().filter(move |s| &s.name == suffix))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

fn render_level(
    f: &mut fmt::Formatter<'_>,
    level: &BTreeMap<String, Entry>,
    depth: usize,
) -> fmt::Result {
    for (segment, entry) in level {
        write!(f, "{}{segment}", "    ".repeat(depth))?;
        if let Some(location) = &entry.location {
            write!(f, " (entry from {location})")?;
        }
        writeln!(f)?;
        render_level(f, &entry.children, depth + 1)?;
    }
    Ok(())
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Empty registry");
        }
        for (namespace, tree) in &self.namespaces {
            if tree.root.is_empty() {
                continue;
            }
            writeln!(f, "Namespace {namespace}:")?;
            render_level(f, &tree.root, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize) -> Location {
        Location::new("defs.talk", line)
    }

    #[test]
    fn exact_and_suffix_lookup() {
        let mut registry = Registry::new();
        registry
            .register("geometry.shapes.Point", Namespace::Classes, at(3), Some('.'))
            .unwrap();

        assert!(registry.is_registered("geometry.shapes.Point", Namespace::Classes));
        assert!(registry.is_registered("shapes.Point", Namespace::Classes));
        assert!(registry.is_registered("Point", Namespace::Classes));
        assert!(!registry.is_registered("geometry", Namespace::Classes));
        assert!(!registry.is_registered("Point", Namespace::Enumerations));
    }

    #[test]
    fn duplicate_exact_path_reports_original_site() {
        let mut registry = Registry::new();
        registry
            .register("a.Point", Namespace::Classes, at(3), Some('.'))
            .unwrap();
        let err = registry
            .register("a.Point", Namespace::Classes, Location::new("other.talk", 9), Some('.'))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::RegistrationConflict);
        assert_eq!(err.file, "other.talk");
        assert_eq!(err.line, 9);
        assert!(err.message.contains("defs.talk:3"), "{}", err.message);
    }

    #[test]
    fn same_local_name_in_different_packages_is_not_a_conflict() {
        let mut registry = Registry::new();
        registry
            .register("a.Point", Namespace::Classes, at(1), Some('.'))
            .unwrap();
        registry
            .register("b.Point", Namespace::Classes, at(2), Some('.'))
            .unwrap();

        assert_eq!(registry.lookup("Point", Namespace::Classes).len(), 2);
        let exact = registry.lookup("b.Point", Namespace::Classes);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].location.line, 2);
    }

    #[test]
    fn container_can_become_a_leaf() {
        let mut registry = Registry::new();
        registry
            .register("net.Packet", Namespace::Classes, at(1), Some('.'))
            .unwrap();
        registry
            .register("net", Namespace::Classes, at(5), Some('.'))
            .unwrap();

        assert!(registry.is_registered("net", Namespace::Classes));
        assert!(registry.is_registered("net.Packet", Namespace::Classes));
    }

    #[test]
    fn undelimited_names_are_single_segments() {
        let mut registry = Registry::new();
        registry
            .register("Color", Namespace::Enumerations, at(1), None)
            .unwrap();

        assert!(registry.is_registered("Color", Namespace::Enumerations));
        assert_eq!(registry.symbols(Namespace::Enumerations).len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut registry = Registry::new();
        registry
            .register("Color", Namespace::Enumerations, at(1), None)
            .unwrap();
        registry.reset();

        assert!(registry.is_empty());
        assert!(!registry.is_registered("Color", Namespace::Enumerations));
        assert_eq!(registry.to_string(), "Empty registry\n");
    }

    #[test]
    fn display_renders_tree_with_locations() {
        let mut registry = Registry::new();
        registry
            .register("geo.Point", Namespace::Classes, at(4), Some('.'))
            .unwrap();

        let rendered = registry.to_string();
        assert_eq!(
            rendered,
            "Namespace classes:\n    geo\n        Point (entry from defs.talk:4)\n"
        );
    }
}
