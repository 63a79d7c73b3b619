//! Socket type expressions
//!
//! Grammar (whitespace ignored):
//!
//! ```text
//! type  := "any" | "null" | "bool" | "int" | "float" | "str"
//!        | "list[" type "]" | "map[" type "]"
//!        | "union[" type ("," type)* "]" | "optional[" type "]"
//!        | IDENT                       (named, opaque to the engine)
//! ```
//!
//! `optional[T]` is sugar for `union[T, null]`. `string`, `dict` and `none`
//! are accepted as aliases of `str`, `map` and `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::WaveError;
use crate::util::is_valid_identifier;

/// Type tag attached to every socket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SocketType {
    Any,
    Null,
    Bool,
    Int,
    Float,
    Str,
    List(Box<SocketType>),
    Map(Box<SocketType>),
    /// Flattened, deduplicated, at least two members
    Union(Vec<SocketType>),
    /// User-defined structured type, compared by name only
    Named(String),
}

impl SocketType {
    pub fn list(item: SocketType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn map(value: SocketType) -> Self {
        Self::Map(Box::new(value))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn optional(inner: SocketType) -> Self {
        Self::union([inner, Self::Null])
    }

    /// Build a union, flattening nested unions and dropping duplicates
    ///
    /// A union containing `any` collapses to `any`; a single member collapses
    /// to that member.
    pub fn union(members: impl IntoIterator<Item = SocketType>) -> Self {
        let mut flat: Vec<SocketType> = Vec::new();
        for member in members {
            match member {
                Self::Any => return Self::Any,
                Self::Union(inner) => {
                    for m in inner {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Self::Null,
            1 => flat.remove(0),
            _ => Self::Union(flat),
        }
    }

    /// Can a value produced as `self` be delivered to a socket of type `receiver`?
    ///
    /// `any` on either side matches. A union sender needs every member to
    /// fit; a union receiver needs one member to fit. Containers are covariant.
    /// Numbers never widen: `int` does not connect to `float`.
    pub fn is_compatible_with(&self, receiver: &SocketType) -> bool {
        if self == receiver {
            return true;
        }
        match (self, receiver) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Union(members), _) => members.iter().all(|m| m.is_compatible_with(receiver)),
            (_, Self::Union(members)) => members.iter().any(|m| self.is_compatible_with(m)),
            (Self::List(a), Self::List(b)) | (Self::Map(a), Self::Map(b)) => a.is_compatible_with(b),
            _ => false,
        }
    }

    /// Does a concrete value conform to this type?
    ///
    /// Used on caller-supplied run inputs. Named types are opaque and accept
    /// any value; components deserialize them.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any | Self::Named(_) => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Str => value.is_string(),
            Self::List(item) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| item.accepts(v))),
            Self::Map(inner) => value
                .as_object()
                .is_some_and(|map| map.values().all(|v| inner.accepts(v))),
            Self::Union(members) => members.iter().any(|m| m.accepts(value)),
        }
    }

    /// Accepts `null`
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Any | Self::Null => true,
            Self::Union(members) => members.iter().any(Self::is_nullable),
            _ => false,
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::List(item) => write!(f, "list[{}]", item),
            Self::Map(value) => write!(f, "map[{}]", value),
            Self::Union(members) => {
                f.write_str("union[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                f.write_str("]")
            }
            Self::Named(name) => f.write_str(name),
        }
    }
}

// ═══════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════

struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn error(&self, reason: impl Into<String>) -> WaveError {
        WaveError::InvalidTypeExpr {
            expr: self.src.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.src[self.pos..].chars().next().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<&'a str, WaveError> {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..len];
        if !is_valid_identifier(word) {
            return Err(self.error(format!("expected a type name at offset {}", self.pos)));
        }
        self.pos += len;
        Ok(word)
    }

    fn args(&mut self, name: &str) -> Result<Vec<SocketType>, WaveError> {
        if !self.eat('[') {
            return Err(self.error(format!("'{}' needs type arguments in brackets", name)));
        }
        let mut args = vec![self.parse_type()?];
        while self.eat(',') {
            args.push(self.parse_type()?);
        }
        if !self.eat(']') {
            return Err(self.error(format!("unclosed '[' after '{}'", name)));
        }
        Ok(args)
    }

    fn single_arg(&mut self, name: &str) -> Result<SocketType, WaveError> {
        let mut args = self.args(name)?;
        if args.len() != 1 {
            return Err(self.error(format!("'{}' takes exactly one type argument", name)));
        }
        Ok(args.remove(0))
    }

    fn parse_type(&mut self) -> Result<SocketType, WaveError> {
        let name = self.ident()?;
        let ty = match name {
            "any" => SocketType::Any,
            "null" | "none" => SocketType::Null,
            "bool" => SocketType::Bool,
            "int" => SocketType::Int,
            "float" => SocketType::Float,
            "str" | "string" => SocketType::Str,
            "list" => SocketType::list(self.single_arg(name)?),
            "map" | "dict" => SocketType::map(self.single_arg(name)?),
            "optional" => SocketType::optional(self.single_arg(name)?),
            "union" => SocketType::union(self.args(name)?),
            other => SocketType::Named(other.to_string()),
        };
        Ok(ty)
    }
}

impl FromStr for SocketType {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { src: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error(format!("unexpected trailing input at offset {}", parser.pos)));
        }
        Ok(ty)
    }
}

impl Serialize for SocketType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SocketType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        expr.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ty(s: &str) -> SocketType {
        s.parse().unwrap()
    }

    #[test]
    fn parses_scalars_and_aliases() {
        assert_eq!(ty("int"), SocketType::Int);
        assert_eq!(ty("string"), SocketType::Str);
        assert_eq!(ty("none"), SocketType::Null);
        assert_eq!(ty(" float "), SocketType::Float);
    }

    #[test]
    fn parses_nested_containers() {
        assert_eq!(ty("list[map[int]]"), SocketType::list(SocketType::map(SocketType::Int)));
        assert_eq!(ty("dict[ str ]"), SocketType::map(SocketType::Str));
        assert_eq!(ty("list[ToolCall]"), SocketType::list(SocketType::named("ToolCall")));
    }

    #[test]
    fn optional_is_union_with_null() {
        assert_eq!(
            ty("optional[int]"),
            SocketType::Union(vec![SocketType::Int, SocketType::Null])
        );
        assert_eq!(ty("optional[int]").to_string(), "union[int, null]");
    }

    #[test]
    fn union_flattens_and_collapses() {
        assert_eq!(ty("union[int, union[str, int]]").to_string(), "union[int, str]");
        assert_eq!(ty("union[int]"), SocketType::Int);
        assert_eq!(ty("union[int, any]"), SocketType::Any);
    }

    #[test]
    fn display_reparses_to_same_type() {
        for expr in ["list[union[int, str]]", "map[list[Document]]", "optional[bool]"] {
            let parsed = ty(expr);
            assert_eq!(ty(&parsed.to_string()), parsed);
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["", "list", "list[int", "list[int, str]", "int]", "map[]", "1abc"] {
            let err = expr.parse::<SocketType>().unwrap_err();
            assert!(matches!(err, WaveError::InvalidTypeExpr { .. }), "{expr}");
        }
    }

    #[test]
    fn compatibility_rules() {
        assert!(ty("int").is_compatible_with(&ty("int")));
        assert!(ty("int").is_compatible_with(&ty("any")));
        assert!(ty("any").is_compatible_with(&ty("str")));
        assert!(ty("int").is_compatible_with(&ty("optional[int]")));
        assert!(ty("union[int, str]").is_compatible_with(&ty("union[str, int, null]")));
        assert!(ty("list[int]").is_compatible_with(&ty("list[union[int, str]]")));
        assert!(ty("Document").is_compatible_with(&ty("Document")));

        assert!(!ty("int").is_compatible_with(&ty("float")));
        assert!(!ty("int").is_compatible_with(&ty("str")));
        assert!(!ty("optional[int]").is_compatible_with(&ty("int")));
        assert!(!ty("list[int]").is_compatible_with(&ty("map[int]")));
        assert!(!ty("Document").is_compatible_with(&ty("Answer")));
    }

    #[test]
    fn accepts_values() {
        assert!(ty("int").accepts(&json!(3)));
        assert!(!ty("int").accepts(&json!(3.5)));
        assert!(ty("float").accepts(&json!(3)));
        assert!(ty("list[str]").accepts(&json!(["a", "b"])));
        assert!(!ty("list[str]").accepts(&json!(["a", 1])));
        assert!(ty("map[int]").accepts(&json!({"a": 1})));
        assert!(ty("optional[str]").accepts(&json!(null)));
        assert!(ty("Document").accepts(&json!({"content": "x"})));
        assert!(!ty("bool").accepts(&json!("true")));
    }

    #[test]
    fn serde_uses_expression_strings() {
        let json = serde_json::to_value(ty("list[optional[int]]")).unwrap();
        assert_eq!(json, json!("list[union[int, null]]"));
        let back: SocketType = serde_json::from_value(json).unwrap();
        assert_eq!(back, ty("list[optional[int]]"));
    }
}
