//! Maps algorithm signatures to compiled implementations.
//!
//! Registration stores, per monomorphised type, the declaration tree and a
//! factory keyed by the *signature* — the bound-strategy structure of the
//! meta.  Selection parses a user string, resolves it to a [`Config`],
//! reduces the config to its signature, and invokes the matching factory.

use std::sync::Arc;

use crate::compressor::{Compressor, FromConfig};
use crate::generators::Generator;
use crate::io::restrict::InputRestrictions;
use crate::meta::ast::NodeRef;
use crate::meta::config::{Config, ConfigError};
use crate::meta::decl::{AlgorithmDecl, DeclError, DeclLib, TypeDesc};
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::meta::parser::{self, ParseError};

/// Errors raised while selecting an algorithm from a textual specification.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Decl(#[from] DeclError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown algorithm: '{name}'. known algorithms: [{known}]")]
    UnknownAlgorithm { name: String, known: String },
    #[error("No implementation found for algorithm {0}")]
    NoImplementation(String),
    #[error("failed to construct algorithm instance: {0}")]
    Construction(String),
}

type Factory<T> = Box<dyn Fn(&Config) -> anyhow::Result<Box<T>> + Send + Sync>;

struct RegistryEntry<T: ?Sized> {
    decl: Arc<AlgorithmDecl>,
    signature: String,
    factory: Factory<T>,
}

/// A registry of algorithms sharing a root type.
pub struct Registry<T: ?Sized> {
    root_type: TypeDesc,
    lib: DeclLib,
    entries: Vec<RegistryEntry<T>>,
}

/// A selected algorithm: resolved config, constructed instance, and the
/// aggregated input restrictions of the whole configuration tree.
pub struct Selection<T: ?Sized> {
    config: Config,
    instance: Box<T>,
    restrictions: InputRestrictions,
}

impl<T: ?Sized> std::fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("config", &self.config)
            .field("restrictions", &self.restrictions)
            .finish()
    }
}

impl<T: ?Sized> Selection<T> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    pub fn restrictions(&self) -> &InputRestrictions {
        &self.restrictions
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn with_root_type(root_type: TypeDesc) -> Self {
        Registry { root_type, lib: DeclLib::new(), entries: Vec::new() }
    }

    fn add_meta(&mut self, meta: &Meta, factory: Factory<T>) -> Result<(), DeclError> {
        let decl = meta.decl();
        if !decl.algo_type.subtype_of(&self.root_type) {
            return Err(DeclError(format!(
                "cannot register '{}': type {} is not a {}",
                decl.name,
                decl.algo_type.name(),
                self.root_type.name()
            )));
        }
        self.lib.merge(meta.known())?;
        self.lib.insert(Arc::clone(&decl))?;

        let signature = meta.signature_node().to_string();
        if self.entries.iter().any(|e| e.signature == signature) {
            return Err(DeclError(format!(
                "signature '{signature}' registered twice"
            )));
        }
        self.entries.push(RegistryEntry { decl, signature, factory });
        Ok(())
    }

    /// Parses and resolves `spec` without constructing an instance.
    pub fn resolve(&self, spec: &str) -> Result<Config, RegistryError> {
        let ast = parser::parse(spec)?;
        self.resolve_ast(&ast)
    }

    fn resolve_ast(&self, ast: &NodeRef) -> Result<Config, RegistryError> {
        let name = ast.name().unwrap_or("");
        let decl = self.lib.find(name, &self.root_type).ok_or_else(|| {
            RegistryError::UnknownAlgorithm {
                name: name.to_owned(),
                known: {
                    let mut names: Vec<&str> =
                        self.entries.iter().map(|e| e.decl.name.as_str()).collect();
                    names.sort_unstable();
                    names.dedup();
                    names.join(", ")
                },
            }
        })?;
        Ok(Config::resolve(Arc::clone(decl), ast, &self.lib)?)
    }

    /// Selects and constructs the implementation for `spec`.
    pub fn select(&self, spec: &str) -> Result<Selection<T>, RegistryError> {
        let config = self.resolve(spec)?;
        let signature = config.signature().to_string();
        let entry = self
            .entries
            .iter()
            .find(|e| e.signature == signature)
            .ok_or_else(|| RegistryError::NoImplementation(signature.clone()))?;
        let instance = (entry.factory)(&config)
            .map_err(|e| RegistryError::Construction(e.to_string()))?;
        let restrictions = config.aggregate_restrictions();
        Ok(Selection { config, instance, restrictions })
    }

    /// One line per registered entry, for `--list`.
    pub fn doc_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("  {}  —  {}", e.signature, e.decl.desc))
            .collect();
        lines.sort();
        lines
    }
}

impl Registry<dyn Compressor + Send + Sync> {
    /// Registers a monomorphised compressor type.
    pub fn register<C>(&mut self) -> Result<(), DeclError>
    where
        C: Compressor + Algorithm + FromConfig + Send + Sync + 'static,
    {
        let meta = C::meta();
        self.add_meta(&meta, Box::new(|cfg| Ok(Box::new(C::from_config(cfg)?))))
    }
}

impl Registry<dyn Generator + Send + Sync> {
    /// Registers a string generator type.
    pub fn register<G>(&mut self) -> Result<(), DeclError>
    where
        G: Generator + Algorithm + FromConfig + Send + Sync + 'static,
    {
        let meta = G::meta();
        self.add_meta(&meta, Box::new(|cfg| Ok(Box::new(G::from_config(cfg)?))))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{coder_type, compressor_type};
    use std::io::Write;

    struct EchoCompressor;

    impl Algorithm for EchoCompressor {
        fn meta() -> Meta {
            let mut m = Meta::new(compressor_type(), "echo", "copies input to output");
            m.param("tag", "an arbitrary marker").primitive_default("x");
            m
        }
    }

    impl FromConfig for EchoCompressor {
        fn from_config(_cfg: &Config) -> anyhow::Result<Self> {
            Ok(EchoCompressor)
        }
    }

    impl Compressor for EchoCompressor {
        fn compress(&self, input: &crate::io::input::Input, out: &mut dyn Write) -> anyhow::Result<()> {
            out.write_all(input.as_view())?;
            Ok(())
        }
        fn decompress(&self, input: &crate::io::input::Input, out: &mut dyn Write) -> anyhow::Result<()> {
            out.write_all(input.as_view())?;
            Ok(())
        }
    }

    #[test]
    fn select_constructs_registered_implementation() {
        let mut reg: Registry<dyn Compressor + Send + Sync> =
            Registry::with_root_type(compressor_type());
        reg.register::<EchoCompressor>().unwrap();

        let sel = reg.select("echo(tag=hello)").unwrap();
        assert_eq!(sel.config().param("tag").as_str().unwrap(), "hello");

        let mut out = Vec::new();
        sel.instance()
            .compress(&crate::io::input::Input::from_bytes(b"abc"), &mut out)
            .unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn unknown_names_and_signatures_are_distinct_errors() {
        let mut reg: Registry<dyn Compressor + Send + Sync> =
            Registry::with_root_type(compressor_type());
        reg.register::<EchoCompressor>().unwrap();

        let err = reg.select("nope").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownAlgorithm { .. }), "{err}");
    }

    #[test]
    fn wrong_type_cannot_register() {
        struct NotACompressor;
        impl Algorithm for NotACompressor {
            fn meta() -> Meta {
                Meta::new(coder_type(), "rogue", "")
            }
        }
        impl FromConfig for NotACompressor {
            fn from_config(_: &Config) -> anyhow::Result<Self> {
                Ok(NotACompressor)
            }
        }
        impl Compressor for NotACompressor {
            fn compress(&self, _: &crate::io::input::Input, _: &mut dyn Write) -> anyhow::Result<()> {
                Ok(())
            }
            fn decompress(&self, _: &crate::io::input::Input, _: &mut dyn Write) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let mut reg: Registry<dyn Compressor + Send + Sync> =
            Registry::with_root_type(compressor_type());
        assert!(reg.register::<NotACompressor>().is_err());
    }
}
