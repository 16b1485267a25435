//! Wire schema annotations.
//!
//! An RPC function declares its contract in its doc comment:
//!
//! ```text
//! /// @rpc (id: string, filter?: {active: boolean, tags: string[]}) -> User | null
//! ```
//!
//! Tags describe shapes in the Serializable Value grammar:
//!
//! | Tag | Shape |
//! |---|---|
//! | `string`, `number`, `boolean`, `null` | primitives |
//! | `date` | timestamp |
//! | `any`, `object` | any value / any mapping |
//! | `{a: tag, b?: tag}` | mapping with known fields |
//! | `tag[]` | ordered sequence |
//! | `tag \| null` | nullable |
//! | `Name` | a named serde type |

use crate::config::CompilerConfig;
use crate::error::{CompilerError, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Shape of one value in a function's contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Null,
    Date,
    Any,
    Object,
    Array(Box<TypeTag>),
    Record(Vec<FieldTag>),
    Nullable(Box<TypeTag>),
    Named(String),
}

/// One field of a [`TypeTag::Record`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldTag {
    pub name: String,
    pub tag: TypeTag,
    pub optional: bool,
}

impl TypeTag {
    /// Named types referenced anywhere inside this tag.
    pub fn named_types(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeTag::Named(name) => {
                out.insert(name.clone());
            }
            TypeTag::Array(inner) | TypeTag::Nullable(inner) => inner.named_types(out),
            TypeTag::Record(fields) => {
                for field in fields {
                    field.tag.named_types(out);
                }
            }
            _ => {}
        }
    }

    /// Whether every named type inside the tag satisfies `known`.
    pub fn resolves(&self, known: &impl Fn(&str) -> bool) -> bool {
        let mut names = BTreeSet::new();
        self.named_types(&mut names);
        names.iter().all(|name| known(name))
    }

    pub fn contains_named(&self) -> bool {
        let mut names = BTreeSet::new();
        self.named_types(&mut names);
        !names.is_empty()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::String => f.write_str("string"),
            TypeTag::Number => f.write_str("number"),
            TypeTag::Boolean => f.write_str("boolean"),
            TypeTag::Null => f.write_str("null"),
            TypeTag::Date => f.write_str("date"),
            TypeTag::Any => f.write_str("any"),
            TypeTag::Object => f.write_str("object"),
            TypeTag::Array(inner) => match inner.as_ref() {
                TypeTag::Nullable(_) => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            TypeTag::Record(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let mark = if field.optional { "?" } else { "" };
                    write!(f, "{}{}: {}", field.name, mark, field.tag)?;
                }
                f.write_str("}")
            }
            TypeTag::Nullable(inner) => write!(f, "{} | null", inner),
            TypeTag::Named(name) => f.write_str(name),
        }
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for TypeTag {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let tag = parser.tag()?;
        parser.end()?;
        Ok(tag)
    }
}

/// One parameter of a parsed schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaParam {
    pub name: String,
    pub tag: TypeTag,
    pub optional: bool,
}

/// A parsed `@rpc (...) -> tag` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub params: Vec<SchemaParam>,
    pub returns: TypeTag,
}

impl FromStr for Schema {
    type Err = CompilerError;

    /// Parse the text after the `@rpc` marker.
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        parser.expect('(')?;
        let mut params = Vec::new();
        if !parser.eat(')') {
            loop {
                let name = parser.ident()?;
                let optional = parser.eat('?');
                parser.expect(':')?;
                let tag = parser.tag()?;
                params.push(SchemaParam {
                    name,
                    tag,
                    optional,
                });
                if parser.eat(')') {
                    break;
                }
                parser.expect(',')?;
            }
        }
        parser.expect('-')?;
        parser.expect('>')?;
        let returns = parser.tag()?;
        parser.end()?;
        Ok(Schema { params, returns })
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn end(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error("unexpected trailing input")),
        }
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(rest[..len].to_string())
    }

    /// `tag := postfix ('|' 'null')?`
    fn tag(&mut self) -> Result<TypeTag> {
        if self.depth >= CompilerConfig::MAX_SCHEMA_DEPTH {
            return Err(self.error(&format!(
                "nesting exceeds {} levels",
                CompilerConfig::MAX_SCHEMA_DEPTH
            )));
        }
        self.depth += 1;
        let tag = self.union();
        self.depth -= 1;
        tag
    }

    fn union(&mut self) -> Result<TypeTag> {
        let tag = self.postfix()?;
        if self.eat('|') {
            let start = self.pos;
            match self.ident()?.as_str() {
                "null" => Ok(TypeTag::Nullable(Box::new(tag))),
                _ => {
                    self.pos = start;
                    Err(self.error("only '| null' unions are supported"))
                }
            }
        } else {
            Ok(tag)
        }
    }

    /// `postfix := primary ('[' ']')*`
    fn postfix(&mut self) -> Result<TypeTag> {
        let mut tag = self.primary()?;
        while self.eat('[') {
            self.expect(']')?;
            tag = TypeTag::Array(Box::new(tag));
        }
        Ok(tag)
    }

    fn primary(&mut self) -> Result<TypeTag> {
        if self.eat('(') {
            let tag = self.tag()?;
            self.expect(')')?;
            return Ok(tag);
        }
        if self.eat('{') {
            return self.record();
        }
        Ok(match self.ident()?.as_str() {
            "string" => TypeTag::String,
            "number" => TypeTag::Number,
            "boolean" => TypeTag::Boolean,
            "null" => TypeTag::Null,
            "date" => TypeTag::Date,
            "any" => TypeTag::Any,
            "object" => TypeTag::Object,
            name => TypeTag::Named(name.to_string()),
        })
    }

    fn record(&mut self) -> Result<TypeTag> {
        let mut fields: Vec<FieldTag> = Vec::new();
        if self.eat('}') {
            return Ok(TypeTag::Record(fields));
        }
        loop {
            let name = self.ident()?;
            if fields.iter().any(|f| f.name == name) {
                return Err(self.error(&format!("duplicate field '{}'", name)));
            }
            let optional = self.eat('?');
            self.expect(':')?;
            let tag = self.tag()?;
            fields.push(FieldTag {
                name,
                tag,
                optional,
            });
            if self.eat('}') {
                return Ok(TypeTag::Record(fields));
            }
            self.expect(',')?;
        }
    }

    fn error(&self, message: &str) -> CompilerError {
        CompilerError::Schema(format!("{} at column {} in '{}'", message, self.pos + 1, self.src.trim()))
    }
}
