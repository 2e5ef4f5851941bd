//! Identifier casing shared by the emitter and the runtime dispatch table.

use std::collections::BTreeSet;

const SEQUENCE_INFIX: &str = "Vec";

/// Trailing parameter of every generated action method.
pub const CALL_OPTIONS_PARAM: &str = "options";

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Splits an ABI identifier into its word segments. Separators are dropped and
/// every `[]` array marker becomes its own `Vec` segment, in position.
fn segments(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' && chars.peek() == Some(&']') {
            chars.next();
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            out.push(SEQUENCE_INFIX.to_string());
        } else if c.is_ascii_alphanumeric() {
            cur.push(c);
        } else if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn upper_first(seg: &str) -> String {
    let mut chars = seg.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(seg: &str) -> String {
    let mut chars = seg.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `extended_symbol` -> `ExtendedSymbol`, `uint32[]_x` -> `Uint32VecX`.
/// Only the first letter of each segment changes case, so `INT16_VEC` stays
/// `INT16VEC`.
pub fn pascal_case(raw: &str) -> String {
    segments(raw).iter().map(|s| upper_first(s)).collect()
}

/// `dac_members` -> `dacMembers`.
pub fn camel_case(raw: &str) -> String {
    let segs = segments(raw);
    let mut out = String::new();
    for (idx, seg) in segs.iter().enumerate() {
        if idx == 0 {
            out.push_str(&lower_first(seg));
        } else {
            out.push_str(&upper_first(seg));
        }
    }
    out
}

/// Name of a generated type: the contract name followed by the PascalCased
/// declaration name.
pub fn type_name(contract_name: &str, decl_name: &str) -> String {
    format!("{contract_name}{}", pascal_case(decl_name))
}

pub fn table_accessor(table_name: &str) -> String {
    format!("{}Table", camel_case(table_name))
}

pub fn object_params_method(action_name: &str) -> String {
    format!("{action_name}O")
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.contains(&s)
}

/// A positional parameter name. Wire names that are not usable as TypeScript
/// parameters get a trailing `_` or have their invalid characters replaced.
pub fn param_ident(field_name: &str) -> String {
    let mut out: String = field_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if is_reserved_word(&out) {
        out.push('_');
    }
    out
}

/// Positional parameter names for one action, in field order. Each is unique
/// within the signature and none shadows the trailing call options parameter.
pub fn param_idents<'a>(field_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = BTreeSet::from([CALL_OPTIONS_PARAM.to_string()]);
    field_names
        .into_iter()
        .map(|raw| {
            let mut ident = param_ident(raw);
            while !taken.insert(ident.clone()) {
                ident.push('_');
            }
            ident
        })
        .collect()
}

/// A property key in an interface or object literal. The wire name is kept
/// verbatim so generated types line up with the JSON the chain returns.
pub fn property_key(field_name: &str) -> String {
    if is_identifier(field_name) {
        field_name.to_string()
    } else {
        format!("'{}'", field_name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
