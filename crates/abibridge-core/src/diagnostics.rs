use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Parse,
    Resolve,
    Emit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    ABB0001ParseError,
    ABB0100DuplicateDeclaration,
    ABB0101EmptyName,
    ABB0110MissingBase,
    ABB0111BaseCycle,
    ABB0112DuplicateField,
    ABB0120UnresolvedType,
    ABB0121AliasCycle,
    ABB0122MalformedType,
    ABB0123EmptyVariant,
    ABB0130UnknownActionType,
    ABB0131UnknownTableType,
    ABB0200UnresolvedAtEmit,
    ABB0201InvalidContractName,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::ABB0001ParseError => "ABB0001",
            DiagnosticCode::ABB0100DuplicateDeclaration => "ABB0100",
            DiagnosticCode::ABB0101EmptyName => "ABB0101",
            DiagnosticCode::ABB0110MissingBase => "ABB0110",
            DiagnosticCode::ABB0111BaseCycle => "ABB0111",
            DiagnosticCode::ABB0112DuplicateField => "ABB0112",
            DiagnosticCode::ABB0120UnresolvedType => "ABB0120",
            DiagnosticCode::ABB0121AliasCycle => "ABB0121",
            DiagnosticCode::ABB0122MalformedType => "ABB0122",
            DiagnosticCode::ABB0123EmptyVariant => "ABB0123",
            DiagnosticCode::ABB0130UnknownActionType => "ABB0130",
            DiagnosticCode::ABB0131UnknownTableType => "ABB0131",
            DiagnosticCode::ABB0200UnresolvedAtEmit => "ABB0200",
            DiagnosticCode::ABB0201InvalidContractName => "ABB0201",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::ABB0001ParseError => Phase::Parse,
            DiagnosticCode::ABB0200UnresolvedAtEmit | DiagnosticCode::ABB0201InvalidContractName => {
                Phase::Emit
            }
            _ => Phase::Resolve,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::ABB0001ParseError => "failed to parse ABI document",
            DiagnosticCode::ABB0100DuplicateDeclaration => "duplicate declaration name",
            DiagnosticCode::ABB0101EmptyName => "declaration has an empty name",
            DiagnosticCode::ABB0110MissingBase => "struct base does not exist",
            DiagnosticCode::ABB0111BaseCycle => "struct base chain is cyclic",
            DiagnosticCode::ABB0112DuplicateField => "duplicate field after base merge",
            DiagnosticCode::ABB0120UnresolvedType => "type reference does not resolve",
            DiagnosticCode::ABB0121AliasCycle => "type alias chain is cyclic",
            DiagnosticCode::ABB0122MalformedType => "malformed type token",
            DiagnosticCode::ABB0123EmptyVariant => "variant declares no branch types",
            DiagnosticCode::ABB0130UnknownActionType => "action type is not a struct",
            DiagnosticCode::ABB0131UnknownTableType => "table row type is not a struct",
            DiagnosticCode::ABB0200UnresolvedAtEmit => "unresolved reference during emission",
            DiagnosticCode::ABB0201InvalidContractName => "contract name is not a valid identifier",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::ABB0001ParseError => {
                Some("The ABI must be a JSON object; `types`, `structs`, `actions`, `tables` and `variants` must be arrays.")
            }
            DiagnosticCode::ABB0100DuplicateDeclaration => Some(
                "Aliases, structs and variants share one namespace; rename one of the declarations.",
            ),
            DiagnosticCode::ABB0111BaseCycle => Some("Remove the `base` link that closes the cycle."),
            DiagnosticCode::ABB0120UnresolvedType => Some(
                "Declare the missing struct, alias or variant, or fix the spelling of the type.",
            ),
            DiagnosticCode::ABB0201InvalidContractName => {
                Some("Pass --contract-name with a name made of ASCII letters, digits and '_'.")
            }
            _ => None,
        }
    }
}

/// A fatal schema problem found while parsing, resolving or emitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaError {
    pub code: DiagnosticCode,
    pub phase: Phase,
    /// The offending declaration, e.g. `struct regaccount` or `table dacs`.
    pub declaration: Option<String>,
    pub message: String,
    pub help: Option<String>,
}

impl SchemaError {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        SchemaError {
            code,
            phase: code.phase(),
            declaration: None,
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
        }
    }

    pub fn at(code: DiagnosticCode, declaration: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError {
            declaration: Some(declaration.into()),
            ..SchemaError::new(code, message)
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}: ", self.code.code_str(), self.phase)?;
        if let Some(decl) = &self.declaration {
            write!(f, "{decl}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(&'static str, Phase, &'static str, &'static str)> = all_codes()
        .iter()
        .map(|code| {
            (
                code.code_str(),
                code.phase(),
                code.default_message(),
                code.default_help().unwrap_or(""),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    out.push_str("# abibridge diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/abibridge-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!("| {code} | {phase:?} | {msg} | {help} |\n"));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::ABB0001ParseError,
        DiagnosticCode::ABB0100DuplicateDeclaration,
        DiagnosticCode::ABB0101EmptyName,
        DiagnosticCode::ABB0110MissingBase,
        DiagnosticCode::ABB0111BaseCycle,
        DiagnosticCode::ABB0112DuplicateField,
        DiagnosticCode::ABB0120UnresolvedType,
        DiagnosticCode::ABB0121AliasCycle,
        DiagnosticCode::ABB0122MalformedType,
        DiagnosticCode::ABB0123EmptyVariant,
        DiagnosticCode::ABB0130UnknownActionType,
        DiagnosticCode::ABB0131UnknownTableType,
        DiagnosticCode::ABB0200UnresolvedAtEmit,
        DiagnosticCode::ABB0201InvalidContractName,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_code_once() {
        let md = render_diagnostics_md();
        for code in all_codes() {
            assert_eq!(
                md.matches(&format!("| {} |", code.code_str())).count(),
                1,
                "{}",
                code.code_str()
            );
        }
    }

    #[test]
    fn display_names_the_declaration() {
        let err = SchemaError::at(
            DiagnosticCode::ABB0111BaseCycle,
            "struct a",
            "base chain cycle involving a",
        );
        let text = err.to_string();
        assert!(text.starts_with("ABB0111 Resolve: struct a: base chain cycle involving a"));
        assert!(text.contains("help:"));
    }
}
