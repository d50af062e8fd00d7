//! Identifier Catalogue
//!
//! Maps the small integer ids of one instrumentation run (and their
//! `extra_slots` aliases) to qualified method names such as
//! `org.demo.Parser.parse(String;int)`.
//!
//! Built once from the authoritative result file, then shared read-only by
//! every per-file parse.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info};

use crate::markup::{self, TagKind};
use crate::reader::ReaderConfig;
use crate::result::{TraceError, TraceResult};
use crate::signature::Signature;

/// Tag of a method-entry coverage line
pub const METHOD_PREFIX: &str = "meth";

/// Caller name recorded when neither an id nor a slot resolves
pub const UNKNOWN_CALLER: &str = "None";

/// One method identity with its two equally valid lookup keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodIdentity {
    /// Primary (canonical) id
    pub id: i64,
    /// Alias slot, `None` when the agent reported `-1` or nothing
    pub extra_slot: Option<i64>,
}

impl MethodIdentity {
    /// Create an identity, treating negative slots as absent
    #[must_use]
    pub const fn new(id: i64, extra_slot: i64) -> Self {
        Self {
            id,
            extra_slot: if extra_slot < 0 { None } else { Some(extra_slot) },
        }
    }
}

/// Build the qualified name of a method from its declaring package and class.
///
/// Constructors are named after their class, static initializers become
/// `<Class>_init`.
#[must_use]
pub fn qualified_method_name(package: &str, class: &str, method: &str, args: &str) -> String {
    let method = match method {
        "<init>" => class.to_string(),
        "<clinit>" => format!("{class}_init"),
        other => other.to_string(),
    };
    if package.is_empty() {
        format!("{class}.{method}({args})")
    } else {
        format!("{package}.{class}.{method}({args})")
    }
}

/// Id and slot tables of one instrumentation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCatalogue {
    names: BTreeMap<i64, String>,
    slots: BTreeMap<i64, i64>,
    prefixes: BTreeSet<String>,
}

impl MethodCatalogue {
    /// Create an empty catalogue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the structural header of a result file
    pub fn from_file(path: &Path, config: &ReaderConfig) -> TraceResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TraceError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let catalogue = Self::from_markup(&text, config)?;
        info!(
            path = %path.display(),
            methods = catalogue.len(),
            prefixes = ?catalogue.prefixes,
            "built method catalogue"
        );
        Ok(catalogue)
    }

    /// Walk the `package` → `class` → `meth` nesting of a dump document
    pub fn from_markup(text: &str, config: &ReaderConfig) -> TraceResult<Self> {
        let mut catalogue = Self::new();
        if config.method_only {
            catalogue.prefixes.insert(METHOD_PREFIX.to_string());
        }

        let mut stack: Vec<(String, Option<String>)> = Vec::new();
        let mut current_method: Option<String> = None;
        // Depth of the block element currently being registered; its
        // descendants belong to it and are not registered on their own.
        let mut block_depth: Option<usize> = None;

        for tag in markup::tags(text) {
            let tag = tag?;
            if tag.kind == TagKind::Close {
                stack.pop();
                if tag.name == METHOD_PREFIX {
                    current_method = None;
                }
                if block_depth.is_some_and(|depth| stack.len() < depth) {
                    block_depth = None;
                }
                continue;
            }

            if tag.name == METHOD_PREFIX {
                let package = enclosing(&stack, "package");
                let class = enclosing(&stack, "class");
                if let (Some(package), Some(class)) = (package, class) {
                    let name = method_name(&tag, package, class, config.short_type)?;
                    if config.method_only {
                        let identity = MethodIdentity::new(
                            required_int(&tag, "id")?,
                            optional_int(&tag, "extra_slots")?.unwrap_or(-1),
                        );
                        catalogue.insert(identity, name.clone());
                    }
                    if tag.kind == TagKind::Open {
                        current_method = Some(name);
                    }
                }
            } else if !config.method_only && block_depth.is_none() {
                if let (Some(method), Some(id)) = (&current_method, tag.attr("id")) {
                    let id = parse_int(id, "id", &tag.name)?;
                    catalogue
                        .names
                        .insert(id, format!("{method}.{}", tag.name));
                    if catalogue.prefixes.insert(tag.name.clone()) {
                        debug!(prefix = %tag.name, "discovered coverage prefix");
                    }
                    if tag.kind == TagKind::Open {
                        block_depth = Some(stack.len() + 1);
                    }
                }
            }

            if tag.kind == TagKind::Open {
                stack.push((tag.name.clone(), tag.attr("name").map(str::to_string)));
            }
        }

        Ok(catalogue)
    }

    /// Register a method under its id and, when present, its alias slot
    pub fn insert(&mut self, identity: MethodIdentity, name: impl Into<String>) {
        self.names.insert(identity.id, name.into());
        if let Some(slot) = identity.extra_slot {
            self.slots.insert(slot, identity.id);
        }
    }

    /// Name registered under a primary id
    #[must_use]
    pub fn name_by_id(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Name registered under an alias slot
    #[must_use]
    pub fn name_by_slot(&self, slot: i64) -> Option<&str> {
        self.slots.get(&slot).and_then(|id| self.name_by_id(*id))
    }

    /// Canonical id for a raw identifier: id lookup first, then slot alias
    #[must_use]
    pub fn canonical_id(&self, raw: i64) -> Option<i64> {
        if self.names.contains_key(&raw) {
            Some(raw)
        } else {
            self.slots.get(&raw).copied()
        }
    }

    /// Resolve a raw caller identifier to a name
    #[must_use]
    pub fn resolve(&self, raw: i64) -> Option<&str> {
        self.canonical_id(raw).and_then(|id| self.name_by_id(id))
    }

    /// Resolve a raw caller identifier, falling back to [`UNKNOWN_CALLER`]
    #[must_use]
    pub fn resolve_or_unknown(&self, raw: i64) -> &str {
        self.resolve(raw).unwrap_or(UNKNOWN_CALLER)
    }

    /// Coverage line prefixes (tag names) of this run
    #[must_use]
    pub fn prefixes(&self) -> &BTreeSet<String> {
        &self.prefixes
    }

    /// Iterate `(id, name)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Number of registered ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing was registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of registered alias slots
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

fn enclosing<'a>(stack: &'a [(String, Option<String>)], tag: &str) -> Option<&'a str> {
    stack
        .iter()
        .rev()
        .find(|(name, _)| name == tag)
        .and_then(|(_, attr)| attr.as_deref())
}

fn method_name(
    tag: &markup::Tag,
    package: &str,
    class: &str,
    short_type: bool,
) -> TraceResult<String> {
    let name = tag
        .attr("name")
        .ok_or_else(|| TraceError::configuration("method element without a name"))?;
    let vmsig = tag.attr("vmsig").ok_or_else(|| {
        TraceError::configuration(format!("method {package}.{class}.{name} has no vmsig"))
    })?;
    let signature = Signature::parse(vmsig, short_type)?;
    Ok(qualified_method_name(package, class, name, &signature.args()))
}

fn parse_int(value: &str, key: &str, tag: &str) -> TraceResult<i64> {
    value.trim().parse().map_err(|_| {
        TraceError::configuration(format!("invalid {key}=\"{value}\" on <{tag}>"))
    })
}

fn required_int(tag: &markup::Tag, key: &str) -> TraceResult<i64> {
    let value = tag.attr(key).ok_or_else(|| {
        TraceError::configuration(format!("<{}> is missing attribute {key}", tag.name))
    })?;
    parse_int(value, key, &tag.name)
}

fn optional_int(tag: &markup::Tag, key: &str) -> TraceResult<Option<i64>> {
    tag.attr(key)
        .map(|value| parse_int(value, key, &tag.name))
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<coverage xmlns="http://java.sun.com/jcov/namespace">
<package name="org.demo">
  <class name="Parser">
    <meth name="&lt;init&gt;" vmsig="()V" id="1" extra_slots="11" count="0"/>
    <meth name="&lt;clinit&gt;" vmsig="()V" id="2" extra_slots="12" count="0"/>
    <meth name="parse" vmsig="(Ljava/lang/String;I)Z" id="3" extra_slots="13" count="4"/>
  </class>
  <class name="ParserTest">
    <meth name="testParse" vmsig="()V" id="4" extra_slots="-1" count="1"/>
  </class>
</package>
</coverage>"#;

    const BLOCK_HEADER: &str = r#"<coverage>
<package name="org.demo">
  <class name="Parser">
    <meth name="parse" vmsig="()V">
      <bl s="0" e="4">
        <methenter s="0" e="2" id="21" count="1"/>
      </bl>
      <exit s="3" e="4" id="22" count="1"/>
    </meth>
  </class>
</package>
</coverage>"#;

    #[test]
    fn test_method_names_and_synthesized_names() {
        let catalogue = MethodCatalogue::from_markup(HEADER, &ReaderConfig::default()).unwrap();
        assert_eq!(catalogue.len(), 4);
        assert_eq!(catalogue.name_by_id(1), Some("org.demo.Parser.Parser()"));
        assert_eq!(catalogue.name_by_id(2), Some("org.demo.Parser.Parser_init()"));
        assert_eq!(catalogue.name_by_id(3), Some("org.demo.Parser.parse(String;int)"));
        assert_eq!(catalogue.name_by_slot(13), Some("org.demo.Parser.parse(String;int)"));
    }

    #[test]
    fn test_negative_slot_not_registered() {
        let catalogue = MethodCatalogue::from_markup(HEADER, &ReaderConfig::default()).unwrap();
        assert_eq!(catalogue.slot_count(), 3);
        assert_eq!(catalogue.name_by_slot(-1), None);
    }

    #[test]
    fn test_resolution_prefers_id_then_slot() {
        let catalogue = MethodCatalogue::from_markup(HEADER, &ReaderConfig::default()).unwrap();
        assert_eq!(catalogue.canonical_id(3), Some(3));
        assert_eq!(catalogue.canonical_id(13), Some(3));
        assert_eq!(catalogue.resolve_or_unknown(99), UNKNOWN_CALLER);
    }

    #[test]
    fn test_long_types() {
        let config = ReaderConfig::builder().short_type(false).build();
        let catalogue = MethodCatalogue::from_markup(HEADER, &config).unwrap();
        assert_eq!(
            catalogue.name_by_id(3),
            Some("org.demo.Parser.parse(java.lang.String;int)")
        );
    }

    #[test]
    fn test_method_prefix_only_in_method_mode() {
        let catalogue = MethodCatalogue::from_markup(HEADER, &ReaderConfig::default()).unwrap();
        assert!(catalogue.prefixes().contains(METHOD_PREFIX));
        assert_eq!(catalogue.prefixes().len(), 1);
    }

    #[test]
    fn test_block_mode_registers_nested_ids() {
        let config = ReaderConfig::builder().method_only(false).build();
        let catalogue = MethodCatalogue::from_markup(BLOCK_HEADER, &config).unwrap();
        assert_eq!(catalogue.name_by_id(21), Some("org.demo.Parser.parse().methenter"));
        assert_eq!(catalogue.name_by_id(22), Some("org.demo.Parser.parse().exit"));
        let prefixes: Vec<&str> = catalogue.prefixes().iter().map(String::as_str).collect();
        assert_eq!(prefixes, ["exit", "methenter"]);
    }

    #[test]
    fn test_unknown_primitive_aborts() {
        let bad = r#"<package name="p"><class name="C">
<meth name="m" vmsig="(Q)V" id="1" extra_slots="2"/></class></package>"#;
        let err = MethodCatalogue::from_markup(bad, &ReaderConfig::default()).unwrap_err();
        assert!(matches!(err, TraceError::Configuration { .. }));
    }

    #[test]
    fn test_missing_id_aborts() {
        let bad = r#"<package name="p"><class name="C">
<meth name="m" vmsig="()V"/></class></package>"#;
        assert!(MethodCatalogue::from_markup(bad, &ReaderConfig::default()).is_err());
    }

    #[test]
    fn test_character_references_quotes_and_comments() {
        let text = r#"<coverage>
<package name="org.demo">
  <class name='Parser'>
    <meth name="&#60;init&#62;" vmsig="()V" id="1" extra_slots="11"/>
    <meth name='parse' vmsig='(I)Z' id='2' extra_slots='12'/>
    <!-- <meth name="ghost" vmsig="()V" id="3" extra_slots="13"/> -->
  </class>
</package>
</coverage>"#;
        let catalogue = MethodCatalogue::from_markup(text, &ReaderConfig::default()).unwrap();
        assert_eq!(catalogue.name_by_id(1), Some("org.demo.Parser.Parser()"));
        assert_eq!(catalogue.name_by_id(2), Some("org.demo.Parser.parse(int)"));
        assert_eq!(catalogue.name_by_id(3), None);
        assert_eq!(catalogue.len(), 2);
    }

    #[test]
    fn test_mismatched_nesting_aborts() {
        let bad = r#"<package name="p"><class name="C">
<meth name="m" vmsig="()V" id="1"/></package></class>"#;
        let err = MethodCatalogue::from_markup(bad, &ReaderConfig::default()).unwrap_err();
        assert!(matches!(err, TraceError::Configuration { .. }));
    }

    #[test]
    fn test_qualified_method_name_default_package() {
        assert_eq!(qualified_method_name("", "Main", "run", "int"), "Main.run(int)");
    }
}
