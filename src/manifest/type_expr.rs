//! Type expressions used in manifests.
//!
//! ```text
//! expr  := term ('|' term)*
//! term  := name ('[' expr (',' expr)* ']')?  |  '...'
//! ```
//!
//! `optional[T]` and `T | none` are the same type. `...` is only valid as
//! the second argument of `tuple`.

use crate::schema::{Origin, Primitive, TypeDesc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeExprError {
    #[error("unexpected end of type expression '{0}'")]
    UnexpectedEnd(String),
    #[error("unexpected '{found}' at offset {offset} in type expression '{expr}'")]
    Unexpected {
        expr: String,
        found: String,
        offset: usize,
    },
    #[error("'{name}' takes {expected} type argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("'...' is only allowed as the last argument of tuple[T, ...]")]
    MisplacedRepeat,
}

/// Parsed type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Name(String),
    Apply(String, Vec<TypeExpr>),
    Union(Vec<TypeExpr>),
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'s> {
    Ident(&'s str),
    Open,
    Close,
    Comma,
    Pipe,
    Ellipsis,
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token<'_>)>, TypeExprError> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let tok = match c {
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            b'[' => Token::Open,
            b']' => Token::Close,
            b',' => Token::Comma,
            b'|' => Token::Pipe,
            b'.' if src[i..].starts_with("...") => {
                tokens.push((i, Token::Ellipsis));
                i += 3;
                continue;
            }
            c if c.is_ascii_alphanumeric() || c == b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-' | b'.'))
                {
                    i += 1;
                }
                tokens.push((start, Token::Ident(&src[start..i])));
                continue;
            }
            _ => {
                let found = src[i..].chars().next().map(String::from).unwrap_or_default();
                return Err(TypeExprError::Unexpected {
                    expr: src.to_string(),
                    found,
                    offset: i,
                });
            }
        };
        tokens.push((i, tok));
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<(usize, Token<'s>)>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn unexpected(&self) -> TypeExprError {
        match self.tokens.get(self.pos) {
            None => TypeExprError::UnexpectedEnd(self.src.to_string()),
            Some((offset, tok)) => TypeExprError::Unexpected {
                expr: self.src.to_string(),
                found: match tok {
                    Token::Ident(s) => (*s).to_string(),
                    Token::Open => "[".into(),
                    Token::Close => "]".into(),
                    Token::Comma => ",".into(),
                    Token::Pipe => "|".into(),
                    Token::Ellipsis => "...".into(),
                },
                offset: *offset,
            },
        }
    }

    fn expect(&mut self, tok: Token<'s>) -> Result<(), TypeExprError> {
        if self.peek() == Some(&tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expr(&mut self) -> Result<TypeExpr, TypeExprError> {
        let mut members = vec![self.term()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            members.push(self.term()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            TypeExpr::Union(members)
        })
    }

    fn term(&mut self) -> Result<TypeExpr, TypeExprError> {
        let name = match self.peek() {
            Some(Token::Ident(name)) => (*name).to_string(),
            Some(Token::Ellipsis) => {
                self.pos += 1;
                return Ok(TypeExpr::Repeat);
            }
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        if self.peek() != Some(&Token::Open) {
            return Ok(TypeExpr::Name(name));
        }
        self.pos += 1;
        let mut args = vec![self.expr()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::Close)?;
        Ok(TypeExpr::Apply(name, args))
    }
}

impl TypeExpr {
    pub fn parse(src: &str) -> Result<Self, TypeExprError> {
        let mut parser = Parser {
            src,
            tokens: tokenize(src)?,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.unexpected());
        }
        expr.check()?;
        Ok(expr)
    }

    fn check(&self) -> Result<(), TypeExprError> {
        match self {
            TypeExpr::Repeat => Err(TypeExprError::MisplacedRepeat),
            TypeExpr::Name(_) => Ok(()),
            TypeExpr::Union(members) => members.iter().try_for_each(TypeExpr::check),
            TypeExpr::Apply(name, args) => {
                let arity = |expected: &'static str, ok: bool| {
                    if ok {
                        Ok(())
                    } else {
                        Err(TypeExprError::Arity {
                            name: name.clone(),
                            expected,
                            got: args.len(),
                        })
                    }
                };
                match name.to_ascii_lowercase().as_str() {
                    "list" | "sequence" | "vec" | "set" | "optional" => arity("1", args.len() == 1)?,
                    "dict" | "map" | "mapping" => arity("2", args.len() == 2)?,
                    "union" => arity("at least 1", !args.is_empty())?,
                    "tuple" if args.len() == 2 && args[1] == TypeExpr::Repeat => {
                        return args[0].check();
                    }
                    _ => {}
                }
                args.iter().try_for_each(TypeExpr::check)
            }
        }
    }

    /// Build the descriptor, turning plain names into types through `named`.
    ///
    /// Built-in containers applied to the wrong number of arguments (only
    /// possible for expressions built by hand, [`parse`](Self::parse) rejects
    /// them) become opaque generics, which fail at schema rendering.
    pub fn to_desc(&self, named: &dyn Fn(&str) -> TypeDesc) -> TypeDesc {
        match self {
            TypeExpr::Repeat => TypeDesc::Repeat,
            TypeExpr::Name(name) => match Primitive::parse(name) {
                Some(p) => TypeDesc::Primitive(p),
                None => named(name),
            },
            TypeExpr::Union(members) => {
                TypeDesc::Union(members.iter().map(|m| m.to_desc(named)).collect())
            }
            TypeExpr::Apply(name, args) => {
                let mut descs: Vec<TypeDesc> = args.iter().map(|a| a.to_desc(named)).collect();
                match (name.to_ascii_lowercase().as_str(), descs.len()) {
                    ("list" | "sequence" | "vec", 1) => TypeDesc::list(descs.swap_remove(0)),
                    ("set", 1) => TypeDesc::set(descs.swap_remove(0)),
                    ("dict" | "map" | "mapping", 2) => {
                        let value = descs.swap_remove(1);
                        TypeDesc::map(descs.swap_remove(0), value)
                    }
                    ("tuple", _) => TypeDesc::tuple(descs),
                    ("optional", 1) => TypeDesc::optional(descs.swap_remove(0)),
                    ("union", n) if n > 0 => TypeDesc::Union(descs),
                    _ => TypeDesc::Generic {
                        origin: Origin::Other(name.clone()),
                        args: descs,
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{render_model, rewrite, SchemaModel, TypeRegistry};

    fn opaque(name: &str) -> TypeDesc {
        TypeDesc::external(name)
    }

    fn desc(src: &str) -> TypeDesc {
        TypeExpr::parse(src).unwrap().to_desc(&opaque)
    }

    #[test]
    fn test_primitives_and_containers() {
        assert_eq!(desc("str"), TypeDesc::string());
        assert_eq!(desc("list[int]"), TypeDesc::list(TypeDesc::integer()));
        assert_eq!(
            desc("dict[str, list[float]]"),
            TypeDesc::map(TypeDesc::string(), TypeDesc::list(TypeDesc::number()))
        );
        assert_eq!(desc("tuple[int, ...]"), TypeDesc::var_tuple(TypeDesc::integer()));
        assert_eq!(
            desc("tuple[int, bool]"),
            TypeDesc::tuple(vec![TypeDesc::integer(), TypeDesc::boolean()])
        );
    }

    #[test]
    fn test_optional_and_unions() {
        assert_eq!(desc("optional[str]"), TypeDesc::optional(TypeDesc::string()));
        assert_eq!(desc("str | none"), TypeDesc::optional(TypeDesc::string()));
        assert_eq!(
            desc("union[int, str]"),
            TypeDesc::Union(vec![TypeDesc::integer(), TypeDesc::string()])
        );
    }

    #[test]
    fn test_unknown_names_are_delegated() {
        assert_eq!(desc("User"), opaque("User"));
        assert_eq!(
            desc("callable[User]"),
            TypeDesc::Generic {
                origin: Origin::Other("callable".into()),
                args: vec![opaque("User")]
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TypeExpr::parse("list[int"),
            Err(TypeExprError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            TypeExpr::parse("list[int, str]"),
            Err(TypeExprError::Arity { got: 2, .. })
        ));
        assert_eq!(TypeExpr::parse("list[...]"), Err(TypeExprError::MisplacedRepeat));
        assert!(matches!(
            TypeExpr::parse("int int"),
            Err(TypeExprError::Unexpected { offset: 4, .. })
        ));
        assert!(matches!(
            TypeExpr::parse("dict<str>"),
            Err(TypeExprError::Unexpected { offset: 4, .. })
        ));
    }

    #[test]
    fn test_unchecked_arity_becomes_opaque_generic() {
        let empty = TypeExpr::Apply("list".into(), vec![]);
        assert_eq!(
            empty.to_desc(&opaque),
            TypeDesc::Generic {
                origin: Origin::Other("list".into()),
                args: vec![]
            }
        );
        let short = TypeExpr::Apply("dict".into(), vec![TypeExpr::Name("str".into())]);
        assert_eq!(
            short.to_desc(&opaque),
            TypeDesc::Generic {
                origin: Origin::Other("dict".into()),
                args: vec![TypeDesc::string()]
            }
        );
        assert!(matches!(
            TypeExpr::Apply("optional".into(), vec![]).to_desc(&opaque),
            TypeDesc::Generic { .. }
        ));

        let reg = TypeRegistry::new();
        let model =
            SchemaModel::new("BadPayload").field("items", rewrite(&empty.to_desc(&opaque), &reg, None));
        assert!(render_model(&model, Some(&reg)).is_err());
    }
}
