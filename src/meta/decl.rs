//! Algorithm and parameter declarations.
//!
//! A declaration describes the *shape* of an algorithm (name, type,
//! parameters, tags, input restrictions), independent of any configured
//! values.  Declarations are collected into a [`DeclLib`] per registry, which
//! the config resolver uses for name lookup and type checking.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use crate::io::restrict::InputRestrictions;

use super::ast::NodeRef;

/// Declaration-time failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DeclError(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// TypeDesc
// ─────────────────────────────────────────────────────────────────────────────

/// A named algorithm type with an optional super type.
///
/// The subtype relation is reflexive and transitive along the super chain;
/// it governs which algorithms may be bound to a strategy parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDesc {
    name: String,
    super_type: Option<Arc<TypeDesc>>,
}

impl TypeDesc {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDesc { name: name.into(), super_type: None }
    }

    pub fn subtype(name: impl Into<String>, super_type: TypeDesc) -> Self {
        TypeDesc { name: name.into(), super_type: Some(Arc::new(super_type)) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subtype_of(&self, other: &TypeDesc) -> bool {
        if self.name == other.name {
            return true;
        }
        match &self.super_type {
            Some(sup) => sup.subtype_of(other),
            None => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Takes a string literal.
    Primitive,
    /// Requires a specific sub-algorithm whose concrete type is compiled in.
    Bound,
    /// Permits any algorithm of the declared type.
    Unbound,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub desc: String,
    pub kind: ParamKind,
    pub is_list: bool,
    /// Algorithm type for strategy parameters; `None` for primitives.
    pub algo_type: Option<TypeDesc>,
    pub default: Option<NodeRef>,
}

impl ParamDecl {
    pub fn is_primitive(&self) -> bool {
        self.kind == ParamKind::Primitive
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AlgorithmDecl
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct AlgorithmDecl {
    pub name: String,
    pub algo_type: TypeDesc,
    pub desc: String,
    pub params: Vec<ParamDecl>,
    pub tags: BTreeSet<String>,
    pub input_restrictions: InputRestrictions,
}

impl AlgorithmDecl {
    pub fn new(name: impl Into<String>, algo_type: TypeDesc, desc: impl Into<String>) -> Self {
        AlgorithmDecl {
            name: name.into(),
            algo_type,
            desc: desc.into(),
            params: Vec::new(),
            tags: BTreeSet::new(),
            input_restrictions: InputRestrictions::none(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DeclLib
// ─────────────────────────────────────────────────────────────────────────────

/// Library of declarations, indexed by name and scoped by algorithm type.
///
/// Names are unique only within a type (a coder and a trie may both be
/// called `binary`), so lookups take the expected type.
#[derive(Clone, Debug, Default)]
pub struct DeclLib {
    entries: HashMap<String, Vec<Arc<AlgorithmDecl>>>,
}

impl DeclLib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a declaration; re-registering the same declaration is a no-op,
    /// registering a *different* declaration under an existing `(name, type)`
    /// pair is an error.
    pub fn insert(&mut self, decl: Arc<AlgorithmDecl>) -> Result<(), DeclError> {
        let candidates = self.entries.entry(decl.name.clone()).or_default();
        if let Some(existing) =
            candidates.iter().find(|c| c.algo_type.name() == decl.algo_type.name())
        {
            if **existing != *decl {
                return Err(DeclError(format!(
                    "conflicting declarations registered for algorithm '{}' of type {}",
                    decl.name,
                    decl.algo_type.name()
                )));
            }
            return Ok(());
        }
        candidates.push(decl);
        Ok(())
    }

    pub fn merge(&mut self, other: &DeclLib) -> Result<(), DeclError> {
        for decls in other.entries.values() {
            for decl in decls {
                self.insert(Arc::clone(decl))?;
            }
        }
        Ok(())
    }

    /// All declarations registered under `name`, any type.
    pub fn candidates(&self, name: &str) -> &[Arc<AlgorithmDecl>] {
        self.entries.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The declaration of `name` whose type fits `expected`.
    pub fn find(&self, name: &str, expected: &TypeDesc) -> Option<&Arc<AlgorithmDecl>> {
        self.candidates(name).iter().find(|c| c.algo_type.subtype_of(expected))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_relation_is_transitive() {
        let base = TypeDesc::new("compressor");
        let mid = TypeDesc::subtype("lz", base.clone());
        let leaf = TypeDesc::subtype("lz78_family", mid.clone());
        assert!(leaf.subtype_of(&base));
        assert!(leaf.subtype_of(&mid));
        assert!(leaf.subtype_of(&leaf));
        assert!(!base.subtype_of(&leaf));
        assert!(!TypeDesc::new("coder").subtype_of(&base));
    }

    #[test]
    fn duplicate_registration_must_match() {
        let t = TypeDesc::new("coder");
        let a = Arc::new(AlgorithmDecl::new("ascii", t.clone(), "ascii coder"));
        let same = Arc::new(AlgorithmDecl::new("ascii", t.clone(), "ascii coder"));
        let differing = Arc::new(AlgorithmDecl::new("ascii", t, "a different description"));

        let mut lib = DeclLib::new();
        lib.insert(a).unwrap();
        lib.insert(same).unwrap();
        assert!(lib.insert(differing).is_err());
    }

    #[test]
    fn same_name_in_different_types_coexists() {
        let coder = Arc::new(AlgorithmDecl::new("binary", TypeDesc::new("coder"), "bit packing"));
        let trie = Arc::new(AlgorithmDecl::new("binary", TypeDesc::new("lz_trie"), "fc/ns trie"));

        let mut lib = DeclLib::new();
        lib.insert(coder).unwrap();
        lib.insert(trie).unwrap();

        assert_eq!(lib.find("binary", &TypeDesc::new("coder")).unwrap().algo_type.name(), "coder");
        assert_eq!(
            lib.find("binary", &TypeDesc::new("lz_trie")).unwrap().algo_type.name(),
            "lz_trie"
        );
        assert!(lib.find("binary", &TypeDesc::new("generator")).is_none());
    }
}
