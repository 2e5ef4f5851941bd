use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::RowLayout;

/// Options accepted by every generated table accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableQuery {
    /// Defaults to the contract account.
    pub scope: Option<String>,
    pub table_key: Option<String>,
    pub lower_bound: Option<Value>,
    pub upper_bound: Option<Value>,
    pub index_position: Option<Value>,
    pub key_type: Option<String>,
    pub limit: Option<u32>,
    pub reverse: Option<bool>,
    pub show_payer: Option<bool>,
}

/// Body of a `get_table_rows` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTableRowsRequest {
    pub code: String,
    pub scope: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_position: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_payer: Option<bool>,
    pub json: bool,
}

impl TableQuery {
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn show_payer(mut self) -> Self {
        self.show_payer = Some(true);
        self
    }

    pub fn layout(&self) -> RowLayout {
        if self.show_payer == Some(true) {
            RowLayout::WithPayer
        } else {
            RowLayout::Plain
        }
    }

    pub fn to_request(&self, code: &str, table: &str) -> GetTableRowsRequest {
        GetTableRowsRequest {
            code: code.to_string(),
            scope: self.scope.clone().unwrap_or_else(|| code.to_string()),
            table: table.to_string(),
            table_key: self.table_key.clone(),
            lower_bound: self.lower_bound.clone(),
            upper_bound: self.upper_bound.clone(),
            index_position: self.index_position.clone(),
            key_type: self.key_type.clone(),
            limit: self.limit,
            reverse: self.reverse,
            show_payer: self.show_payer,
            json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scope_defaults_to_the_contract() {
        let req = TableQuery::default().to_request("dacdirectory", "dacs");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"code": "dacdirectory", "scope": "dacdirectory", "table": "dacs", "json": true})
        );
    }

    #[test]
    fn accessor_options_use_camel_case_keys() {
        let q: TableQuery = serde_json::from_value(json!({
            "scope": "dac1",
            "lowerBound": 5,
            "indexPosition": 2,
            "keyType": "i64",
            "showPayer": true
        }))
        .unwrap();
        assert_eq!(q.layout(), RowLayout::WithPayer);
        let req = q.to_request("c", "t");
        assert_eq!(req.scope, "dac1");
        assert_eq!(req.lower_bound, Some(json!(5)));
        assert_eq!(req.key_type.as_deref(), Some("i64"));
        assert!(req.json);
    }
}
