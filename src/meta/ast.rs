//! Immutable AST for algorithm configuration strings.
//!
//! Two value-carrying node kinds exist: a bare string token ([`Node::Value`])
//! and a named object with an ordered parameter list ([`Node::Object`]).
//! Lists of values are a third kind used by list-typed parameters.  Nodes are
//! shared (`Arc`) and never mutated after parsing.

use std::fmt;
use std::sync::Arc;

pub type NodeRef = Arc<Node>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A bare token: identifier or number.
    Value(String),
    /// `name(param, ...)`.
    Object(ObjectNode),
    /// `[value, ...]`.
    List(Vec<NodeRef>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
    pub name: String,
    pub params: Vec<ParamNode>,
}

/// A `(name?, value)` pair; positional parameters have no name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamNode {
    pub name: Option<String>,
    pub value: NodeRef,
}

impl Node {
    pub fn value(token: impl Into<String>) -> NodeRef {
        Arc::new(Node::Value(token.into()))
    }

    pub fn object(name: impl Into<String>, params: Vec<ParamNode>) -> NodeRef {
        Arc::new(Node::Object(ObjectNode { name: name.into(), params }))
    }

    pub fn list(items: Vec<NodeRef>) -> NodeRef {
        Arc::new(Node::List(items))
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Node::Value(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NodeRef]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// The object name, or the token itself for a bare value.
    ///
    /// A bare identifier in algorithm position is shorthand for a no-argument
    /// object (`ascii` ≡ `ascii()`), so both forms have a name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Value(s) => Some(s),
            Node::Object(o) => Some(&o.name),
            Node::List(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(s) => f.write_str(s),
            Node::Object(o) => {
                f.write_str(&o.name)?;
                f.write_str("(")?;
                for (i, p) in o.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(name) = &p.name {
                        write!(f, "{name}=")?;
                    }
                    write!(f, "{}", p.value)?;
                }
                f.write_str(")")
            }
            Node::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrips_structure() {
        let node = Node::object(
            "lz78",
            vec![
                ParamNode { name: Some("coder".into()), value: Node::object("ascii", vec![]) },
                ParamNode { name: None, value: Node::value("42") },
            ],
        );
        assert_eq!(node.to_string(), "lz78(coder=ascii(), 42)");
    }

    #[test]
    fn list_display() {
        let node = Node::list(vec![Node::value("a"), Node::value("b")]);
        assert_eq!(node.to_string(), "[a, b]");
    }
}
