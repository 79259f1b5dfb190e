//! Resolved algorithm configurations.
//!
//! A [`Config`] is the result of walking a declaration and an AST in
//! parallel: every declared parameter ends up with a value (explicit or
//! default), unknown and duplicate parameters are rejected, and strategy
//! parameters carry nested configs resolved against the declaration library.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::io::restrict::InputRestrictions;

use super::ast::{Node, NodeRef, ParamNode};
use super::decl::{AlgorithmDecl, DeclLib, ParamDecl, ParamKind};

/// Config-resolution failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

fn err<T>(msg: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError(msg.into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct ConfigParam {
    decl: ParamDecl,
    value: NodeRef,
    /// Resolved sub-algorithm configs; empty for primitives.
    subs: Vec<Config>,
}

#[derive(Clone, Debug)]
pub struct Config {
    decl: Arc<AlgorithmDecl>,
    params: Vec<ConfigParam>,
}

impl Config {
    /// Resolves `node` against `decl`, looking sub-algorithms up in `lib`.
    pub fn resolve(
        decl: Arc<AlgorithmDecl>,
        node: &NodeRef,
        lib: &DeclLib,
    ) -> Result<Config, ConfigError> {
        // a bare identifier is shorthand for a zero-argument object
        let empty: Vec<ParamNode> = Vec::new();
        let (name, given) = match &**node {
            Node::Object(o) => (o.name.as_str(), &o.params),
            Node::Value(v) => (v.as_str(), &empty),
            Node::List(_) => return err("algorithm expected, found a list"),
        };
        if name != decl.name {
            return err(format!(
                "algorithm name mismatch: expected '{}', got '{name}'",
                decl.name
            ));
        }

        // split positional and keyword params, rejecting interleavings
        let mut positional: Vec<&ParamNode> = Vec::new();
        let mut keyword: Vec<&ParamNode> = Vec::new();
        for p in given {
            if p.name.is_some() {
                keyword.push(p);
            } else {
                if !keyword.is_empty() {
                    return err("unnamed parameters need to be listed first");
                }
                positional.push(p);
            }
        }

        if decl.params.len() < positional.len() + keyword.len() {
            return err(format!("too many parameters for algorithm '{}'", decl.name));
        }

        let mut values: Vec<Option<NodeRef>> = vec![None; decl.params.len()];

        for (i, p) in positional.iter().enumerate() {
            values[i] = Some(Arc::clone(&p.value));
        }
        for p in &keyword {
            let pname = p.name.as_deref().unwrap();
            match decl.params.iter().position(|dp| dp.name == pname) {
                Some(i) => {
                    if values[i].is_some() {
                        return err(format!("parameter '{pname}' already set"));
                    }
                    values[i] = Some(Arc::clone(&p.value));
                }
                None => return err(format!("undefined parameter: '{pname}'")),
            }
        }

        let mut params = Vec::with_capacity(decl.params.len());
        for (dp, value) in decl.params.iter().zip(values) {
            let value = match value.or_else(|| dp.default.clone()) {
                Some(v) => v,
                None => {
                    return err(format!(
                        "parameter was given no value and has no default: '{}'",
                        dp.name
                    ))
                }
            };
            let subs = Self::resolve_param(dp, &value, lib)?;
            params.push(ConfigParam { decl: dp.clone(), value, subs });
        }

        Ok(Config { decl, params })
    }

    fn resolve_param(
        dp: &ParamDecl,
        value: &NodeRef,
        lib: &DeclLib,
    ) -> Result<Vec<Config>, ConfigError> {
        if dp.is_list {
            let items = match value.as_list() {
                Some(items) => items,
                None => {
                    return err(format!(
                        "type mismatch for parameter '{}': expected a list",
                        dp.name
                    ))
                }
            };
            let mut subs = Vec::new();
            for item in items {
                match dp.kind {
                    ParamKind::Primitive => {
                        if item.as_value().is_none() {
                            return err(format!(
                                "type mismatch for list item of parameter '{}'",
                                dp.name
                            ));
                        }
                    }
                    _ => subs.push(Self::resolve_sub(dp, item, lib)?),
                }
            }
            return Ok(subs);
        }

        match dp.kind {
            ParamKind::Primitive => {
                if value.as_value().is_none() {
                    return err(format!(
                        "type mismatch for parameter '{}': expected a value",
                        dp.name
                    ));
                }
                Ok(Vec::new())
            }
            ParamKind::Bound | ParamKind::Unbound => Ok(vec![Self::resolve_sub(dp, value, lib)?]),
        }
    }

    fn resolve_sub(dp: &ParamDecl, value: &NodeRef, lib: &DeclLib) -> Result<Config, ConfigError> {
        let name = match value.name() {
            Some(n) => n,
            None => return err(format!("type mismatch for parameter '{}'", dp.name)),
        };
        let expected = dp.algo_type.as_ref().expect("strategy parameter without a type");
        let sub_decl = match lib.find(name, expected) {
            Some(d) => Arc::clone(d),
            None => {
                // distinguish a type mismatch from a completely unknown name
                return if let Some(other) = lib.candidates(name).first() {
                    err(format!(
                        "algorithm type mismatch for parameter '{}': expected {}, got {}",
                        dp.name,
                        expected.name(),
                        other.algo_type.name()
                    ))
                } else {
                    err(format!("unknown algorithm type: '{name}'"))
                };
            }
        };
        Config::resolve(sub_decl, value, lib)
    }

    pub fn decl(&self) -> &Arc<AlgorithmDecl> {
        &self.decl
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    fn get(&self, name: &str) -> &ConfigParam {
        self.params
            .iter()
            .find(|p| p.decl.name == name)
            .unwrap_or_else(|| panic!("no such parameter: '{name}'"))
    }

    /// Accessor for a primitive parameter value.
    pub fn param(&self, name: &str) -> ParamValue<'_> {
        let p = self.get(name);
        ParamValue { name: &p.decl.name, value: &p.value }
    }

    /// The configuration of a single sub-algorithm parameter.
    pub fn sub_config(&self, name: &str) -> &Config {
        let p = self.get(name);
        match p.subs.as_slice() {
            [sub] => sub,
            [] => panic!("parameter '{name}' has no sub configurations"),
            _ => panic!("parameter '{name}' has multiple sub configurations"),
        }
    }

    /// The configurations of a sub-algorithm list parameter.
    pub fn sub_configs(&self, name: &str) -> &[Config] {
        &self.get(name).subs
    }

    /// Union of the declared input restrictions over the resolved tree.
    pub fn aggregate_restrictions(&self) -> InputRestrictions {
        let mut r = self.decl.input_restrictions.clone();
        for p in &self.params {
            for sub in &p.subs {
                r = r.union(&sub.aggregate_restrictions());
            }
        }
        r
    }

    /// The signature: bound sub-algorithm structure only.
    ///
    /// This is the key for static dispatch — it identifies which
    /// monomorphised implementation a configuration belongs to.
    pub fn signature(&self) -> NodeRef {
        let mut params = Vec::new();
        for p in &self.params {
            if p.decl.kind != ParamKind::Bound {
                continue;
            }
            let value = if p.decl.is_list {
                Node::list(p.subs.iter().map(|s| s.signature()).collect())
            } else {
                p.subs[0].signature()
            };
            params.push(ParamNode { name: Some(p.decl.name.clone()), value });
        }
        Node::object(self.decl.name.clone(), params)
    }

    fn param_str(&self, p: &ConfigParam) -> String {
        let rendered = if p.decl.is_primitive() {
            p.value.to_string()
        } else if p.decl.is_list {
            let items: Vec<String> = p.subs.iter().map(|s| s.str()).collect();
            format!("[{}]", items.join(", "))
        } else {
            p.subs[0].str()
        };
        rendered
    }

    /// Normalised textual form: `name(k=v, ...)`, keyword syntax throughout,
    /// omitting parameters whose value renders identically to their default.
    pub fn str(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.decl.name);
        out.push('(');
        let mut first = true;
        for p in &self.params {
            let rendered = self.param_str(p);
            if let Some(default) = &p.decl.default {
                let default_rendered = if p.decl.is_primitive() {
                    default.to_string()
                } else {
                    // defaults for strategies are signature objects; resolve
                    // them to the same normal form for a fair comparison
                    default.to_string()
                };
                if rendered == default_rendered {
                    continue;
                }
            }
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&p.decl.name);
            out.push('=');
            out.push_str(&rendered);
        }
        out.push(')');
        out
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParamValue
// ─────────────────────────────────────────────────────────────────────────────

/// Typed access to a primitive parameter, with lexical casting.
pub struct ParamValue<'a> {
    name: &'a str,
    value: &'a NodeRef,
}

impl ParamValue<'_> {
    pub fn ast(&self) -> &NodeRef {
        self.value
    }

    fn token(&self) -> Result<&str, ConfigError> {
        self.value
            .as_value()
            .ok_or_else(|| ConfigError(format!("parameter '{}' has no primitive value", self.name)))
    }

    fn cast<T: FromStr>(&self, token: &str) -> Result<T, ConfigError> {
        token.parse().map_err(|_| {
            ConfigError(format!(
                "cannot convert value '{token}' of parameter '{}'",
                self.name
            ))
        })
    }

    pub fn as_str(&self) -> Result<&str, ConfigError> {
        self.token()
    }

    pub fn as_string(&self) -> Result<String, ConfigError> {
        Ok(self.token()?.to_owned())
    }

    pub fn as_int(&self) -> Result<i64, ConfigError> {
        let token = self.token()?;
        self.cast(token)
    }

    pub fn as_uint(&self) -> Result<u64, ConfigError> {
        let token = self.token()?;
        self.cast(token)
    }

    pub fn as_f64(&self) -> Result<f64, ConfigError> {
        let token = self.token()?;
        self.cast(token)
    }

    /// Recognises `true`, `1`, `yes` and `on`, case-insensitively.
    pub fn as_bool(&self) -> Result<bool, ConfigError> {
        let token = self.token()?.to_ascii_lowercase();
        Ok(matches!(token.as_str(), "true" | "1" | "yes" | "on"))
    }

    /// Elements of a primitive list parameter, lexically cast.
    pub fn as_vec<T: FromStr>(&self) -> Result<Vec<T>, ConfigError> {
        let items = self.value.as_list().ok_or_else(|| {
            ConfigError(format!("parameter '{}' has no list value", self.name))
        })?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let token = item.as_value().ok_or_else(|| {
                ConfigError(format!("list item of parameter '{}' is not primitive", self.name))
            })?;
            out.push(self.cast(token)?);
        }
        Ok(out)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::decl::TypeDesc;
    use super::super::meta_builder::Meta;
    use super::super::parser::parse;
    use super::*;

    fn coder_type() -> TypeDesc {
        TypeDesc::new("coder")
    }

    fn ascii_meta() -> Meta {
        Meta::new(coder_type(), "ascii", "human readable coder")
    }

    fn binary_meta() -> Meta {
        Meta::new(coder_type(), "binary", "bit packed coder")
    }

    /// `comp(coder=<bound, default binary>, threshold=<default 3>, names=<list>)`
    fn comp_meta() -> Meta {
        let mut m = Meta::new(TypeDesc::new("compressor"), "comp", "test compressor");
        m.param("coder", "output coder").strategy(binary_meta(), coder_type(), Some(binary_meta()));
        m.param("threshold", "factor threshold").primitive_default(3);
        m.param("names", "list param").primitive_list_default(["a", "b"]);
        m
    }

    fn lib_for(meta: &Meta) -> DeclLib {
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        // an extra coder that is NOT bound anywhere
        lib.insert(ascii_meta().decl()).unwrap();
        lib
    }

    fn resolve(spec: &str) -> Result<Config, ConfigError> {
        let meta = comp_meta();
        let lib = lib_for(&meta);
        Config::resolve(meta.decl(), &parse(spec).unwrap(), &lib)
    }

    #[test]
    fn defaults_fill_missing_parameters() {
        let cfg = resolve("comp").unwrap();
        assert_eq!(cfg.param("threshold").as_uint().unwrap(), 3);
        assert_eq!(cfg.sub_config("coder").name(), "binary");
        assert_eq!(cfg.param("names").as_vec::<String>().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn positional_then_keyword() {
        let cfg = resolve("comp(ascii, threshold=5)").unwrap();
        assert_eq!(cfg.sub_config("coder").name(), "ascii");
        assert_eq!(cfg.param("threshold").as_uint().unwrap(), 5);
    }

    #[test]
    fn error_messages_are_specific() {
        let e = resolve("comp(threshold=5, ascii)").unwrap_err();
        assert!(e.0.contains("listed first"), "{e}");

        let e = resolve("comp(bogus=1)").unwrap_err();
        assert!(e.0.contains("undefined parameter"), "{e}");

        let e = resolve("comp(threshold=1, threshold=2)").unwrap_err();
        assert!(e.0.contains("already set"), "{e}");

        let e = resolve("comp(1,2,3,4)").unwrap_err();
        assert!(e.0.contains("too many"), "{e}");

        let e = resolve("comp(coder=unheard_of)").unwrap_err();
        assert!(e.0.contains("unknown algorithm type"), "{e}");
    }

    #[test]
    fn missing_required_parameter_reports_name() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "strict", "");
        m.param("must", "required").primitive();
        let mut lib = DeclLib::new();
        lib.insert(m.decl()).unwrap();
        let e = Config::resolve(m.decl(), &parse("strict").unwrap(), &lib).unwrap_err();
        assert_eq!(e.0, "parameter was given no value and has no default: 'must'");
    }

    #[test]
    fn signature_keeps_bound_params_only() {
        let cfg = resolve("comp(ascii, threshold=9)").unwrap();
        assert_eq!(cfg.signature().to_string(), "comp(coder=ascii())");
    }

    #[test]
    fn str_omits_defaulted_parameters() {
        assert_eq!(resolve("comp").unwrap().str(), "comp()");
        assert_eq!(resolve("comp(ascii)").unwrap().str(), "comp(coder=ascii())");
        assert_eq!(
            resolve("comp(threshold=9)").unwrap().str(),
            "comp(threshold=9)"
        );
        // explicitly passing the default value still collapses
        assert_eq!(resolve("comp(threshold=3)").unwrap().str(), "comp()");
    }

    #[test]
    fn bool_casting() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "b", "");
        m.param("flag", "").primitive_default("yes");
        let mut lib = DeclLib::new();
        lib.insert(m.decl()).unwrap();
        let cfg = Config::resolve(m.decl(), &parse("b(flag=TRUE)").unwrap(), &lib).unwrap();
        assert!(cfg.param("flag").as_bool().unwrap());
        let cfg = Config::resolve(m.decl(), &parse("b(flag=off)").unwrap(), &lib).unwrap();
        assert!(!cfg.param("flag").as_bool().unwrap());
    }

    #[test]
    fn strategy_lists_resolve_each_element() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "multi", "");
        m.param("coders", "coder chain").strategy_list(
            vec![ascii_meta(), binary_meta()],
            coder_type(),
            Some(vec![ascii_meta(), binary_meta()]),
        );
        let mut lib = m.known().clone();
        lib.insert(m.decl()).unwrap();

        // explicit list
        let cfg =
            Config::resolve(m.decl(), &parse("multi(coders=[binary, ascii])").unwrap(), &lib)
                .unwrap();
        let subs = cfg.sub_configs("coders");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].name(), "binary");
        assert_eq!(subs[1].name(), "ascii");

        // defaults
        let cfg = Config::resolve(m.decl(), &parse("multi").unwrap(), &lib).unwrap();
        let subs = cfg.sub_configs("coders");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].name(), "ascii");

        // a scalar where a list is required
        let e = Config::resolve(m.decl(), &parse("multi(coders=ascii)").unwrap(), &lib)
            .unwrap_err();
        assert!(e.0.contains("expected a list"), "{e}");

        // the signature reduces the whole list
        let cfg =
            Config::resolve(m.decl(), &parse("multi(coders=[binary])").unwrap(), &lib).unwrap();
        assert_eq!(cfg.signature().to_string(), "multi(coders=[binary()])");
    }

    #[test]
    fn type_mismatch_for_sub_algorithm() {
        let mut m = Meta::new(TypeDesc::new("compressor"), "outer", "");
        m.param("gen", "").unbound_strategy(TypeDesc::new("generator"), None);
        let mut lib = DeclLib::new();
        lib.insert(m.decl()).unwrap();
        lib.insert(ascii_meta().decl()).unwrap();
        let e = Config::resolve(m.decl(), &parse("outer(gen=ascii)").unwrap(), &lib).unwrap_err();
        assert!(e.0.contains("algorithm type mismatch"), "{e}");
    }
}
