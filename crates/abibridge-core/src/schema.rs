//! The ABI document as it appears on disk.
//!
//! Only the keys the bridge maps are modelled; anything else in the JSON
//! (`ricardian_clauses`, `error_messages`, `abi_extensions`, ...) is ignored.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticCode, SchemaError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeAlias>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAlias {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    /// Empty string means "no base", matching what abi generators write.
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn base_name(&self) -> Option<&str> {
        let base = self.base.trim();
        (!base.is_empty()).then_some(base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub index_type: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(default)]
    pub key_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub types: Vec<String>,
}

pub fn parse_document(text: &str) -> Result<AbiDocument, SchemaError> {
    serde_json::from_str(text).map_err(|err| {
        SchemaError::new(
            DiagnosticCode::ABB0001ParseError,
            format!("invalid ABI JSON: {err}"),
        )
    })
}

pub fn parse_document_bytes(bytes: &[u8]) -> Result<AbiDocument, SchemaError> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        SchemaError::new(
            DiagnosticCode::ABB0001ParseError,
            format!("ABI is not UTF-8: {err}"),
        )
    })?;
    parse_document(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let doc = parse_document(
            r#"{
                "____comment": "generated",
                "version": "eosio::abi/1.1",
                "structs": [{"name": "dac", "base": "", "fields": [{"name": "owner", "type": "name"}]}],
                "ricardian_clauses": [{"id": "x", "body": "y"}]
            }"#,
        )
        .expect("parse");
        assert_eq!(doc.version.as_deref(), Some("eosio::abi/1.1"));
        assert_eq!(doc.structs.len(), 1);
        assert!(doc.structs[0].base_name().is_none());
        assert!(doc.actions.is_empty());
        assert!(doc.variants.is_empty());
    }

    #[test]
    fn non_array_sections_are_parse_errors() {
        let err = parse_document(r#"{"structs": {}}"#).expect_err("must fail");
        assert_eq!(err.code, DiagnosticCode::ABB0001ParseError);
    }
}
