//! Recursive-descent parser for the algorithm configuration grammar.
//!
//! ```text
//! Spec    ::= Ident ( '(' ArgList? ')' )?
//! ArgList ::= Arg (',' Arg)*
//! Arg     ::= Ident '=' Value | Value
//! Value   ::= Spec | Number | '[' (Value (',' Value)*)? ']'
//! ```
//!
//! Identifiers start with `[A-Za-z_]` and continue with `[A-Za-z0-9_]`;
//! numbers are digit runs (an optional leading `-` is accepted so primitive
//! parameters can carry signed values).  Whitespace is insignificant.
//! Positional arguments must precede keyword arguments; the resolver enforces
//! that, the parser only records the shape.

use super::ast::{Node, NodeRef, ParamNode};

/// Position-annotated parse failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, bytes: input.as_bytes(), pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { position: self.pos, message: message.into() }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!(
                "expected '{}', found '{}'",
                expected as char, c as char
            ))),
            None => Err(self.error(format!("expected '{}', found end of input", expected as char))),
        }
    }

    fn try_eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        let start = self.pos;
        match self.bytes.get(self.pos) {
            Some(c) if c.is_ascii_alphabetic() || *c == b'_' => self.pos += 1,
            _ => return Err(self.error("expected an identifier")),
        }
        while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_alphanumeric() || *c == b'_')
        {
            self.pos += 1;
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn number(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        let start = self.pos;
        if self.bytes.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.error("expected a number"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    /// `Value`: a spec, a number, or a list.
    fn value(&mut self) -> Result<NodeRef, ParseError> {
        match self.peek() {
            Some(b'[') => self.list(),
            Some(c) if c.is_ascii_digit() || c == b'-' => Ok(Node::value(self.number()?)),
            _ => self.spec(),
        }
    }

    fn list(&mut self) -> Result<NodeRef, ParseError> {
        self.eat(b'[')?;
        let mut items = Vec::new();
        if self.peek() != Some(b']') {
            loop {
                items.push(self.value()?);
                if !self.try_eat(b',') {
                    break;
                }
            }
        }
        self.eat(b']')?;
        Ok(Node::list(items))
    }

    /// `Spec`: identifier with an optional parenthesised argument list.
    ///
    /// A bare identifier stays a `Value` node; the resolver treats it as a
    /// zero-argument object where an algorithm is expected.
    fn spec(&mut self) -> Result<NodeRef, ParseError> {
        let name = self.ident()?;
        if !self.try_eat(b'(') {
            return Ok(Node::value(name));
        }
        let mut params = Vec::new();
        if self.peek() != Some(b')') {
            loop {
                params.push(self.arg()?);
                if !self.try_eat(b',') {
                    break;
                }
            }
        }
        self.eat(b')')?;
        Ok(Node::object(name, params))
    }

    /// `Arg`: `ident '=' value` or a positional value.
    fn arg(&mut self) -> Result<ParamNode, ParseError> {
        let checkpoint = self.pos;
        if let Ok(name) = self.ident() {
            if self.try_eat(b'=') {
                let value = self.value()?;
                return Ok(ParamNode { name: Some(name), value });
            }
            self.pos = checkpoint;
        }
        let value = self.value()?;
        Ok(ParamNode { name: None, value })
    }

    fn end(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(self.error("trailing input after algorithm specification"));
        }
        Ok(())
    }
}

/// Parses a complete algorithm specification string.
pub fn parse(input: &str) -> Result<NodeRef, ParseError> {
    let mut p = Parser::new(input);
    let node = p.spec()?;
    p.end()?;
    Ok(node)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifier() {
        let node = parse("lz78").unwrap();
        assert_eq!(node.as_value(), Some("lz78"));
    }

    #[test]
    fn nested_with_keyword_and_positional() {
        let node = parse("lz78(coder = huffman, 42, trie=ternary())").unwrap();
        let obj = node.as_object().unwrap();
        assert_eq!(obj.name, "lz78");
        assert_eq!(obj.params.len(), 3);
        assert_eq!(obj.params[0].name.as_deref(), Some("coder"));
        assert_eq!(obj.params[0].value.as_value(), Some("huffman"));
        assert_eq!(obj.params[1].name, None);
        assert_eq!(obj.params[1].value.as_value(), Some("42"));
        assert_eq!(obj.params[2].value.as_object().unwrap().name, "ternary");
    }

    #[test]
    fn whitespace_is_insignificant() {
        let a = parse("a(b=c(d),e)").unwrap();
        let b = parse("  a ( b = c ( d ) , e )  ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lists_parse() {
        let node = parse("x(ys=[a, b(c)], n=[1,2,3])").unwrap();
        let obj = node.as_object().unwrap();
        assert_eq!(obj.params[0].value.as_list().unwrap().len(), 2);
        assert_eq!(obj.params[1].value.as_list().unwrap().len(), 3);
    }

    #[test]
    fn negative_numbers() {
        let node = parse("x(-5)").unwrap();
        let obj = node.as_object().unwrap();
        assert_eq!(obj.params[0].value.as_value(), Some("-5"));
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse("x(").unwrap_err();
        assert_eq!(err.position, 2);

        let err = parse("x(a=)").unwrap_err();
        assert!(err.position >= 4);

        let err = parse("x() y").unwrap_err();
        assert!(err.message.contains("trailing"));

        assert!(parse("9bad").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn empty_parens_are_an_object() {
        let node = parse("ascii()").unwrap();
        let obj = node.as_object().unwrap();
        assert_eq!(obj.name, "ascii");
        assert!(obj.params.is_empty());
    }
}
