//! Meta information builder.
//!
//! Every algorithm class exposes `fn meta() -> Meta` describing its name,
//! type, parameters and input restrictions.  Binding a strategy parameter
//! records the bound algorithm's declaration tree in the parent's known
//! library, merges its tags and input restrictions upward, and contributes
//! its signature to the parent's signature — the key under which the
//! registry later finds the monomorphised implementation.

use std::sync::Arc;

use crate::io::restrict::InputRestrictions;

use super::ast::{Node, NodeRef, ParamNode};
use super::decl::{AlgorithmDecl, DeclLib, ParamDecl, ParamKind, TypeDesc};

/// Implemented by every declarable algorithm class.
pub trait Algorithm {
    fn meta() -> Meta;
}

/// Tag marking algorithms that require a trailing `0` sentinel.
pub const TAG_REQUIRE_SENTINEL: &str = "require_sentinel";

pub struct Meta {
    decl: AlgorithmDecl,
    /// Bound-strategy structure only: `name(param=sub_signature, ...)`.
    sig_params: Vec<ParamNode>,
    known: DeclLib,
}

impl Meta {
    pub fn new(algo_type: TypeDesc, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Meta {
            decl: AlgorithmDecl::new(name, algo_type, desc),
            sig_params: Vec::new(),
            known: DeclLib::new(),
        }
    }

    /// Starts declaring a parameter.
    pub fn param(&mut self, name: impl Into<String>, desc: impl Into<String>) -> ParamBuilder<'_> {
        ParamBuilder { meta: self, name: name.into(), desc: desc.into() }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.decl.tags.insert(tag.into());
    }

    pub fn input_restrictions(&mut self, r: InputRestrictions) {
        self.decl.input_restrictions = self.decl.input_restrictions.union(&r);
    }

    /// Declares the sentinel requirement: input must end with a single `0`
    /// and contain no other `0` byte.
    pub fn require_sentinel(&mut self) {
        self.add_tag(TAG_REQUIRE_SENTINEL);
        self.input_restrictions(InputRestrictions::sentinel());
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn decl(&self) -> Arc<AlgorithmDecl> {
        Arc::new(self.decl.clone())
    }

    /// The signature object: this algorithm plus its bound sub-structure.
    pub fn signature_node(&self) -> NodeRef {
        Node::object(self.decl.name.clone(), self.sig_params.clone())
    }

    pub fn known(&self) -> &DeclLib {
        &self.known
    }

    fn absorb(&mut self, child: &Meta) {
        self.known
            .merge(child.known())
            .and_then(|_| self.known.insert(child.decl()))
            .unwrap_or_else(|e| panic!("declaration error in '{}': {e}", self.decl.name));
        // restrictions propagate upward so the driver escapes before the
        // sub-algorithm ever sees the input
        self.decl.input_restrictions =
            self.decl.input_restrictions.union(&child.decl.input_restrictions);
        for tag in &child.decl.tags {
            self.decl.tags.insert(tag.clone());
        }
    }
}

/// Builder for a single parameter declaration.
pub struct ParamBuilder<'a> {
    meta: &'a mut Meta,
    name: String,
    desc: String,
}

impl ParamBuilder<'_> {
    fn push(self, kind: ParamKind, is_list: bool, algo_type: Option<TypeDesc>, default: Option<NodeRef>) {
        assert!(
            self.meta.decl.param(&self.name).is_none(),
            "parameter '{}' declared twice on '{}'",
            self.name,
            self.meta.decl.name
        );
        self.meta.decl.params.push(ParamDecl {
            name: self.name,
            desc: self.desc,
            kind,
            is_list,
            algo_type,
            default,
        });
    }

    fn checked(meta: &Meta, binding: &Meta, ty: &TypeDesc, param: &str) -> bool {
        if !binding.decl.algo_type.subtype_of(ty) {
            panic!(
                "algorithm type mismatch for parameter '{param}' of '{}': expected {}, got {} ('{}')",
                meta.decl.name,
                ty.name(),
                binding.decl.algo_type.name(),
                binding.decl.name
            );
        }
        true
    }

    // ── primitives ───────────────────────────────────────────────────────────

    /// A required string-literal parameter.
    pub fn primitive(self) {
        self.push(ParamKind::Primitive, false, None, None);
    }

    /// A string-literal parameter with a default.
    pub fn primitive_default(self, default: impl ToString) {
        let node = Node::value(default.to_string());
        self.push(ParamKind::Primitive, false, None, Some(node));
    }

    pub fn primitive_list(self) {
        self.push(ParamKind::Primitive, true, None, None);
    }

    pub fn primitive_list_default<T: ToString>(self, defaults: impl IntoIterator<Item = T>) {
        let items = defaults.into_iter().map(|v| Node::value(v.to_string())).collect();
        self.push(ParamKind::Primitive, true, None, Some(Node::list(items)));
    }

    // ── bound strategies ─────────────────────────────────────────────────────

    /// A sub-algorithm parameter whose concrete type is compiled in.
    ///
    /// `binding` is the meta of the monomorphised type argument; `default`
    /// supplies the configuration used when the parameter is omitted.
    pub fn strategy(self, binding: Meta, ty: TypeDesc, default: Option<Meta>) {
        Self::checked(self.meta, &binding, &ty, &self.name);
        self.meta.absorb(&binding);
        self.meta.sig_params.push(ParamNode {
            name: Some(self.name.clone()),
            value: binding.signature_node(),
        });

        let default_node = default.map(|d| {
            Self::checked(self.meta, &d, &ty, &self.name);
            self.meta.absorb(&d);
            d.signature_node()
        });
        self.push(ParamKind::Bound, false, Some(ty), default_node);
    }

    /// A list of bound sub-algorithms.
    pub fn strategy_list(self, bindings: Vec<Meta>, ty: TypeDesc, defaults: Option<Vec<Meta>>) {
        let mut sigs = Vec::new();
        for b in &bindings {
            Self::checked(self.meta, b, &ty, &self.name);
            sigs.push(b.signature_node());
        }
        for b in &bindings {
            self.meta.absorb(b);
        }
        self.meta.sig_params.push(ParamNode {
            name: Some(self.name.clone()),
            value: Node::list(sigs),
        });

        let default_node = defaults.map(|ds| {
            let mut items = Vec::new();
            for d in &ds {
                Self::checked(self.meta, d, &ty, &self.name);
                items.push(d.signature_node());
            }
            for d in &ds {
                self.meta.absorb(d);
            }
            Node::list(items)
        });
        self.push(ParamKind::Bound, true, Some(ty), default_node);
    }

    // ── unbound strategies ───────────────────────────────────────────────────

    /// A sub-algorithm parameter accepting any algorithm of `ty`.
    pub fn unbound_strategy(self, ty: TypeDesc, default: Option<Meta>) {
        let default_node = default.map(|d| {
            Self::checked(self.meta, &d, &ty, &self.name);
            self.meta.absorb(&d);
            d.signature_node()
        });
        self.push(ParamKind::Unbound, false, Some(ty), default_node);
    }

    pub fn unbound_strategy_list(self, ty: TypeDesc, defaults: Option<Vec<Meta>>) {
        let default_node = defaults.map(|ds| {
            let mut items = Vec::new();
            for d in &ds {
                Self::checked(self.meta, d, &ty, &self.name);
                items.push(d.signature_node());
            }
            for d in &ds {
                self.meta.absorb(d);
            }
            Node::list(items)
        });
        self.push(ParamKind::Unbound, true, Some(ty), default_node);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn coder_type() -> TypeDesc {
        TypeDesc::new("coder")
    }

    struct FakeCoder;
    impl Algorithm for FakeCoder {
        fn meta() -> Meta {
            Meta::new(coder_type(), "fake", "a test coder")
        }
    }

    #[test]
    fn signature_contains_bound_structure_only() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "comp", "test compressor");
        m.param("coder", "the coder").strategy(FakeCoder::meta(), coder_type(), Some(FakeCoder::meta()));
        m.param("threshold", "cutoff").primitive_default(3);
        assert_eq!(m.signature_node().to_string(), "comp(coder=fake())");
    }

    #[test]
    fn restrictions_and_tags_propagate_from_bindings() {
        let mut child = Meta::new(coder_type(), "sentinel_coder", "");
        child.require_sentinel();

        let mut m = Meta::new(TypeDesc::new("compressor"), "comp", "");
        m.param("coder", "").strategy(child, coder_type(), None);
        let decl = m.decl();
        assert!(decl.has_tag(TAG_REQUIRE_SENTINEL));
        assert!(decl.input_restrictions.null_terminate());
        assert_eq!(decl.input_restrictions.forbidden(), &[0]);
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn wrong_binding_type_panics() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "comp", "");
        let wrong = Meta::new(TypeDesc::new("generator"), "gen", "");
        m.param("coder", "").strategy(wrong, coder_type(), None);
    }
}
