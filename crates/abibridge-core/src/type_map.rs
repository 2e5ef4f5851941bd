//! ABI type tokens and their TypeScript renderings.
//!
//! `Primitive::class` is the single table deciding how a built-in ABI type is
//! represented on the host side. The three `HostClass::Reinterpreted` entries
//! are exactly the kinds the runtime row coercer converts, so the generated
//! types and the coerced values are driven by the same data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names;
use crate::resolve::ResolvedGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Primitive {
    String,
    Bytes,
    Checksum,
    Checksum160,
    Checksum256,
    Checksum512,
    Symbol,
    SymbolCode,
    PublicKey,
    Signature,
    Bool,
    Name,
    ActionName,
    ScopeName,
    AccountName,
    PermissionName,
    TableName,
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Uint8T,
    Uint16T,
    Uint32T,
    Varint32,
    Varuint32,
    Int64,
    Int128,
    Int256,
    Uint64,
    Uint128,
    Uint256,
    Uint64T,
    Uint128T,
    Uint256T,
    Float32,
    Float64,
    Float128,
    Asset,
    ExtendedAsset,
    ExtendedSymbol,
    TimePointSec,
    TimePoint,
    BlockTimestampType,
}

const PRIMITIVES: &[(&str, Primitive)] = &[
    ("string", Primitive::String),
    ("bytes", Primitive::Bytes),
    ("checksum", Primitive::Checksum),
    ("checksum160", Primitive::Checksum160),
    ("checksum256", Primitive::Checksum256),
    ("checksum512", Primitive::Checksum512),
    ("symbol", Primitive::Symbol),
    ("symbol_code", Primitive::SymbolCode),
    ("public_key", Primitive::PublicKey),
    ("signature", Primitive::Signature),
    ("bool", Primitive::Bool),
    ("name", Primitive::Name),
    ("action_name", Primitive::ActionName),
    ("scope_name", Primitive::ScopeName),
    ("account_name", Primitive::AccountName),
    ("permission_name", Primitive::PermissionName),
    ("table_name", Primitive::TableName),
    ("int8", Primitive::Int8),
    ("int16", Primitive::Int16),
    ("int32", Primitive::Int32),
    ("uint8", Primitive::Uint8),
    ("uint16", Primitive::Uint16),
    ("uint32", Primitive::Uint32),
    ("uint8_t", Primitive::Uint8T),
    ("uint16_t", Primitive::Uint16T),
    ("uint32_t", Primitive::Uint32T),
    ("varint32", Primitive::Varint32),
    ("varuint32", Primitive::Varuint32),
    ("int64", Primitive::Int64),
    ("int128", Primitive::Int128),
    ("int256", Primitive::Int256),
    ("uint64", Primitive::Uint64),
    ("uint128", Primitive::Uint128),
    ("uint256", Primitive::Uint256),
    ("uint64_t", Primitive::Uint64T),
    ("uint128_t", Primitive::Uint128T),
    ("uint256_t", Primitive::Uint256T),
    ("float32", Primitive::Float32),
    ("float64", Primitive::Float64),
    ("float128", Primitive::Float128),
    ("asset", Primitive::Asset),
    ("extended_asset", Primitive::ExtendedAsset),
    ("extended_symbol", Primitive::ExtendedSymbol),
    ("time_point_sec", Primitive::TimePointSec),
    ("time_point", Primitive::TimePoint),
    ("block_timestamp_type", Primitive::BlockTimestampType),
];

/// Primitive kinds whose wire form is converted into a richer host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Reinterpret {
    /// `0`/`1` on the wire, `boolean` on the host.
    Bool,
    /// `YYYY-MM-DDTHH:MM:SS` (UTC, no offset) on the wire, `Date` on the host.
    TimePointSec,
    /// `"10.0000 EOS"` on the wire, `Asset` on the host.
    Asset,
}

impl Reinterpret {
    pub const ALL: [Reinterpret; 3] = [
        Reinterpret::Bool,
        Reinterpret::TimePointSec,
        Reinterpret::Asset,
    ];

    pub fn host_type(self) -> &'static str {
        match self {
            Reinterpret::Bool => "boolean",
            Reinterpret::TimePointSec => "Date",
            Reinterpret::Asset => "Asset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    Text,
    NameLike,
    /// Fits in an IEEE double without loss.
    SmallNumber,
    /// 64 bits or wider; callers may pass the decimal text instead.
    WideNumber,
    ExtendedAsset,
    ExtendedSymbol,
    Reinterpreted(Reinterpret),
}

impl Primitive {
    pub fn parse_named(name: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(abi_name, _)| *abi_name == name)
            .map(|(_, p)| *p)
    }

    pub fn all() -> impl Iterator<Item = Primitive> {
        PRIMITIVES.iter().map(|(_, p)| *p)
    }

    pub fn abi_name(self) -> &'static str {
        PRIMITIVES
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(abi_name, _)| *abi_name)
            .unwrap_or("")
    }

    pub fn class(self) -> HostClass {
        use Primitive::*;
        match self {
            String | Bytes | Checksum | Checksum160 | Checksum256 | Checksum512 | Symbol
            | SymbolCode | PublicKey | Signature | Float128 | TimePoint | BlockTimestampType => {
                HostClass::Text
            }
            Name | ActionName | ScopeName | AccountName | PermissionName | TableName => {
                HostClass::NameLike
            }
            Int8 | Int16 | Int32 | Uint8 | Uint16 | Uint32 | Uint8T | Uint16T | Uint32T
            | Varint32 | Varuint32 | Float32 | Float64 => HostClass::SmallNumber,
            Int64 | Int128 | Int256 | Uint64 | Uint128 | Uint256 | Uint64T | Uint128T
            | Uint256T => HostClass::WideNumber,
            ExtendedAsset => HostClass::ExtendedAsset,
            ExtendedSymbol => HostClass::ExtendedSymbol,
            Bool => HostClass::Reinterpreted(Reinterpret::Bool),
            TimePointSec => HostClass::Reinterpreted(Reinterpret::TimePointSec),
            Asset => HostClass::Reinterpreted(Reinterpret::Asset),
        }
    }

    pub fn reinterpretation(self) -> Option<Reinterpret> {
        match self.class() {
            HostClass::Reinterpreted(r) => Some(r),
            _ => None,
        }
    }

    pub fn host_type(self) -> &'static str {
        match self.class() {
            HostClass::Text => "string",
            HostClass::NameLike => "string|number",
            HostClass::SmallNumber => "number",
            HostClass::WideNumber => "number|string",
            HostClass::ExtendedAsset => "ExtendedAsset",
            HostClass::ExtendedSymbol => "ExtendedSymbol",
            HostClass::Reinterpreted(r) => r.host_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    Primitive(Primitive),
    Array(Box<TypeExpr>),
    /// A struct, alias or variant declared in the same document.
    Named(String),
}

impl TypeExpr {
    /// The struct/alias/variant this expression ultimately refers to, if any.
    pub fn named_ref(&self) -> Option<&str> {
        match self {
            TypeExpr::Primitive(_) => None,
            TypeExpr::Array(inner) => inner.named_ref(),
            TypeExpr::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => f.write_str(p.abi_name()),
            TypeExpr::Array(inner) => write!(f, "{inner}[]"),
            TypeExpr::Named(name) => f.write_str(name),
        }
    }
}

/// A parsed field type token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub expr: TypeExpr,
    /// Declared with a trailing `$`: may be absent from older rows and is never
    /// required at call time.
    pub binary_extension: bool,
    /// Declared with a trailing `?`: the value may be `null` on the wire.
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedType {
    pub token: String,
    pub reason: &'static str,
}

impl fmt::Display for MalformedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed type {:?}: {}", self.token, self.reason)
    }
}

pub fn parse_type(token: &str) -> Result<FieldType, MalformedType> {
    let malformed = |reason| MalformedType {
        token: token.to_string(),
        reason,
    };
    let trimmed = token.trim();
    let (body, binary_extension) = match trimmed.strip_suffix('$') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };
    if body.contains('$') {
        return Err(malformed("`$` may only appear once, at the end"));
    }
    let (body, optional) = match body.strip_suffix('?') {
        Some(body) => (body, true),
        None => (body, false),
    };
    if body.contains('?') {
        return Err(malformed(
            "`?` may only mark the whole field type; optional array elements are not supported",
        ));
    }

    let mut base = body;
    let mut depth = 0usize;
    while let Some(inner) = base.strip_suffix("[]") {
        base = inner;
        depth += 1;
    }
    if base.is_empty() {
        return Err(malformed("missing element type"));
    }
    if base.contains(|c| c == '[' || c == ']') || base.chars().any(char::is_whitespace) {
        return Err(malformed("unexpected character in type name"));
    }

    let mut expr = match Primitive::parse_named(base) {
        Some(p) => TypeExpr::Primitive(p),
        None => TypeExpr::Named(base.to_string()),
    };
    for _ in 0..depth {
        expr = TypeExpr::Array(Box::new(expr));
    }
    Ok(FieldType {
        expr,
        binary_extension,
        optional,
    })
}

/// What the mapper needs to know about the document it is rendering for.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    contract_name: String,
    pairs: BTreeMap<String, (TypeExpr, TypeExpr)>,
}

impl MapContext {
    pub fn new(contract_name: impl Into<String>) -> Self {
        MapContext {
            contract_name: contract_name.into(),
            pairs: BTreeMap::new(),
        }
    }

    pub fn with_pair(mut self, struct_name: impl Into<String>, key: TypeExpr, value: TypeExpr) -> Self {
        self.pairs.insert(struct_name.into(), (key, value));
        self
    }

    /// Registers every `pair_*` struct with exactly a `key` and a `value`
    /// field. Pairs whose members are themselves pairs stay named so that
    /// inlining always terminates.
    pub fn from_graph(graph: &ResolvedGraph, contract_name: impl Into<String>) -> Self {
        let candidates: Vec<(&str, &TypeExpr, &TypeExpr)> = graph
            .structs
            .iter()
            .filter(|s| s.name.starts_with("pair_") && s.base.is_none())
            .filter_map(|s| match s.fields.as_slice() {
                [k, v] if k.name == "key" && v.name == "value" => {
                    Some((s.name.as_str(), &k.ty.expr, &v.ty.expr))
                }
                _ => None,
            })
            .collect();
        let is_pair = |e: &TypeExpr| {
            e.named_ref()
                .is_some_and(|n| candidates.iter().any(|(name, _, _)| *name == n))
        };

        let mut ctx = MapContext::new(contract_name);
        for (name, key, value) in &candidates {
            if is_pair(key) || is_pair(value) {
                continue;
            }
            ctx = ctx.with_pair(*name, (*key).clone(), (*value).clone());
        }
        ctx
    }

    pub fn is_inline_pair(&self, name: &str) -> bool {
        self.pairs.contains_key(name)
    }
}

pub fn map_type(expr: &TypeExpr, ctx: &MapContext) -> String {
    match expr {
        TypeExpr::Primitive(p) => p.host_type().to_string(),
        TypeExpr::Array(inner) => format!("Array<{}>", map_type(inner, ctx)),
        TypeExpr::Named(name) => match ctx.pairs.get(name) {
            Some((key, value)) => format!(
                "{{ key: {}; value: {} }}",
                map_type(key, ctx),
                map_type(value, ctx)
            ),
            None => names::type_name(&ctx.contract_name, name),
        },
    }
}

/// Parses and maps a raw token in one step; `$` is ignored here because
/// optionality is a property of the field, not of its type.
pub fn map_token(token: &str, ctx: &MapContext) -> Result<String, MalformedType> {
    Ok(map_type(&parse_type(token)?.expr, ctx))
}
