//! Turns raw table rows into the values the generated row types promise.
//!
//! Dispatch is on `Primitive::reinterpretation`, the same table the type
//! mapper uses to pick `boolean`, `Date` and `Asset`. Variant tags are always
//! rewritten to the branch index. Everything else passes through untouched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use abibridge_core::resolve::{ResolvedGraph, ResolvedStruct};
use abibridge_core::type_map::{Reinterpret, TypeExpr};

use crate::asset::Asset;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{parse_time_point_sec, HostValue};

/// One page of a table query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRows<R> {
    pub rows: Vec<R>,
    #[serde(default)]
    pub more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,
}

/// Shape of each raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLayout {
    /// The row object itself.
    #[default]
    Plain,
    /// `{"data": {...}, "payer": "..."}`, returned when `show_payer` is set.
    WithPayer,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub fields: BTreeMap<String, HostValue>,
    pub payer: Option<String>,
}

impl Row {
    pub fn get(&self, field: &str) -> Option<&HostValue> {
        self.fields.get(field)
    }
}

pub fn coerce_rows(
    raw: TableRows<Value>,
    row_struct: &ResolvedStruct,
    graph: &ResolvedGraph,
    layout: RowLayout,
) -> RuntimeResult<TableRows<Row>> {
    let coercer = Coercer { graph };
    let mut rows = Vec::with_capacity(raw.rows.len());
    for raw_row in &raw.rows {
        let (data, payer) = match layout {
            RowLayout::Plain => (raw_row, None),
            RowLayout::WithPayer => {
                let data = raw_row
                    .get("data")
                    .ok_or_else(|| RuntimeError::domain(&row_struct.name, "a `data` member", raw_row))?;
                let payer = raw_row
                    .get("payer")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (data, payer)
            }
        };
        let fields = coercer.coerce_struct(data, row_struct, &row_struct.name)?;
        rows.push(Row { fields, payer });
    }
    debug!(
        row_struct = %row_struct.name,
        rows = rows.len(),
        more = raw.more,
        "coerced table rows"
    );
    Ok(TableRows {
        rows,
        more: raw.more,
        next_key: raw.next_key,
    })
}

struct Coercer<'g> {
    graph: &'g ResolvedGraph,
}

impl<'g> Coercer<'g> {
    fn coerce_struct(
        &self,
        value: &Value,
        def: &ResolvedStruct,
        path: &str,
    ) -> RuntimeResult<BTreeMap<String, HostValue>> {
        let Some(object) = value.as_object() else {
            return Err(RuntimeError::domain(path, "an object", value));
        };
        let mut out = BTreeMap::new();
        for field in &def.fields {
            let field_path = format!("{path}.{}", field.name);
            match object.get(&field.name) {
                Some(Value::Null) if field.is_optional() => {
                    out.insert(field.name.clone(), HostValue::Wire(Value::Null));
                }
                Some(v) => {
                    out.insert(field.name.clone(), self.coerce(v, &field.ty.expr, &field_path)?);
                }
                None if field.is_binary_extension() || field.is_optional() => {}
                None if self.needs_coercion(&field.ty.expr) => {
                    return Err(RuntimeError::domain(field_path, "a value", &Value::Null));
                }
                None => {}
            }
        }
        // Keys the ABI does not describe are kept as they came.
        for (key, v) in object {
            if def.field(key).is_none() {
                out.insert(key.clone(), HostValue::Wire(v.clone()));
            }
        }
        Ok(out)
    }

    fn coerce(&self, value: &Value, expr: &TypeExpr, path: &str) -> RuntimeResult<HostValue> {
        if !self.needs_coercion(expr) {
            return Ok(HostValue::Wire(value.clone()));
        }
        match self.graph.resolve_alias(expr) {
            TypeExpr::Primitive(p) => match p.reinterpretation() {
                Some(r) => coerce_scalar(value, r, path),
                None => Ok(HostValue::Wire(value.clone())),
            },
            TypeExpr::Array(inner) => {
                let Some(items) = value.as_array() else {
                    return Err(RuntimeError::domain(path, "an array", value));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.coerce(item, inner, &format!("{path}[{i}]")))
                    .collect::<RuntimeResult<Vec<_>>>()
                    .map(HostValue::Array)
            }
            TypeExpr::Named(name) => {
                if let Some(def) = self.graph.struct_def(name) {
                    return self.coerce_struct(value, def, path).map(HostValue::Struct);
                }
                let Some(variant) = self.graph.variant(name) else {
                    return Ok(HostValue::Wire(value.clone()));
                };
                let pair = value.as_array().filter(|a| a.len() == 2);
                let Some([tag, inner]) = pair.map(Vec::as_slice) else {
                    return Err(RuntimeError::domain(path, "a [discriminant, value] pair", value));
                };
                // The chain's JSON names the branch by type; packed data uses the index.
                let branch = match tag {
                    Value::String(type_name) => variant.branch_by_type_name(type_name),
                    other => other
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| variant.branch(i)),
                };
                let Some(branch) = branch else {
                    let tag = match tag {
                        Value::String(type_name) => type_name.clone(),
                        other => other.to_string(),
                    };
                    return Err(RuntimeError::Discriminant {
                        variant: variant.name.clone(),
                        tag,
                        branches: variant.branches.len(),
                    });
                };
                let inner = self.coerce(inner, &branch.ty, &format!("{path}<{}>", branch.index))?;
                Ok(HostValue::variant(branch.index, inner))
            }
        }
    }

    /// Whether any reinterpreted primitive or any variant is reachable from
    /// `expr`. Variants always need their tag normalised to the branch index.
    fn needs_coercion(&self, expr: &TypeExpr) -> bool {
        let mut seen = BTreeSet::new();
        self.reaches_coerced(expr, &mut seen)
    }

    fn reaches_coerced<'a>(&'a self, expr: &'a TypeExpr, seen: &mut BTreeSet<&'a str>) -> bool {
        match self.graph.resolve_alias(expr) {
            TypeExpr::Primitive(p) => p.reinterpretation().is_some(),
            TypeExpr::Array(inner) => self.reaches_coerced(inner, seen),
            TypeExpr::Named(name) => {
                if !seen.insert(name.as_str()) {
                    return false;
                }
                if let Some(def) = self.graph.struct_def(name) {
                    def.fields
                        .iter()
                        .any(|f| self.reaches_coerced(&f.ty.expr, seen))
                } else {
                    self.graph.variant(name).is_some()
                }
            }
        }
    }
}

fn coerce_scalar(value: &Value, kind: Reinterpret, path: &str) -> RuntimeResult<HostValue> {
    match kind {
        Reinterpret::Bool => match value {
            Value::Bool(b) => Ok(HostValue::Bool(*b)),
            Value::Number(n) if n.as_u64() == Some(0) => Ok(HostValue::Bool(false)),
            Value::Number(n) if n.as_u64() == Some(1) => Ok(HostValue::Bool(true)),
            _ => Err(RuntimeError::domain(path, "0 or 1", value)),
        },
        Reinterpret::TimePointSec => value
            .as_str()
            .and_then(parse_time_point_sec)
            .map(HostValue::Timestamp)
            .ok_or_else(|| RuntimeError::domain(path, "a YYYY-MM-DDTHH:MM:SS timestamp", value)),
        Reinterpret::Asset => value
            .as_str()
            .and_then(|s| s.parse::<Asset>().ok())
            .map(HostValue::Asset)
            .ok_or_else(|| RuntimeError::domain(path, "an `<amount> <SYMBOL>` asset", value)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn graph() -> ResolvedGraph {
        abibridge_core::load_graph(
            &json!({
                "types": [{"new_type_name": "flag", "type": "bool"}],
                "variants": [{"name": "reward", "types": ["asset", "string"]}],
                "structs": [
                    {"name": "inner", "base": "", "fields": [{"name": "on", "type": "bool"}]},
                    {"name": "base_row", "base": "", "fields": [{"name": "id", "type": "uint64"}]},
                    {"name": "member", "base": "base_row", "fields": [
                        {"name": "active", "type": "bool"},
                        {"name": "joined", "type": "time_point_sec"},
                        {"name": "stake", "type": "asset"},
                        {"name": "note", "type": "string"},
                        {"name": "flags", "type": "flag[]"},
                        {"name": "nested", "type": "inner"},
                        {"name": "prize", "type": "reward"},
                        {"name": "extra", "type": "bool$"}
                    ]}
                ],
                "tables": [{"name": "members", "type": "member", "index_type": "i64"}]
            })
            .to_string(),
        )
        .expect("graph")
    }

    fn member_row() -> Value {
        json!({
            "id": "18446744073709551615",
            "active": 1,
            "joined": "2021-03-04T05:06:07",
            "stake": "12.5000 EOS",
            "note": "hi",
            "flags": [0, 1],
            "nested": {"on": 0},
            "prize": ["asset", "1.0000 TLM"]
        })
    }

    fn coerce_one(row: Value) -> RuntimeResult<Row> {
        let g = graph();
        let def = g.table_row("members").expect("row struct");
        let raw = TableRows {
            rows: vec![row],
            more: false,
            next_key: None,
        };
        coerce_rows(raw, def, &g, RowLayout::Plain).map(|mut r| r.rows.remove(0))
    }

    #[test]
    fn reinterprets_the_three_special_kinds() {
        let row = coerce_one(member_row()).expect("coerce");
        assert_eq!(row.get("active"), Some(&HostValue::Bool(true)));
        assert_eq!(
            row.get("joined"),
            Some(&HostValue::Timestamp(datetime!(2021-03-04 05:06:07)))
        );
        assert_eq!(
            row.get("stake").and_then(HostValue::as_asset).map(Asset::to_string),
            Some("12.5000 EOS".to_string())
        );
        assert_eq!(row.get("note"), Some(&HostValue::Wire(json!("hi"))));
        assert_eq!(
            row.get("id"),
            Some(&HostValue::Wire(json!("18446744073709551615")))
        );
        assert!(row.get("extra").is_none());
    }

    #[test]
    fn recurses_into_arrays_aliases_structs_and_variants() {
        let row = coerce_one(member_row()).expect("coerce");
        assert_eq!(
            row.get("flags"),
            Some(&HostValue::Array(vec![HostValue::Bool(false), HostValue::Bool(true)]))
        );
        let Some(HostValue::Struct(nested)) = row.get("nested") else {
            panic!("nested struct expected");
        };
        assert_eq!(nested.get("on"), Some(&HostValue::Bool(false)));
        let Some(HostValue::Variant(prize)) = row.get("prize") else {
            panic!("variant expected");
        };
        assert_eq!(prize.index, 0);
        assert_eq!(prize.value.as_asset().map(Asset::amount_raw), Some(10_000));
    }

    #[test]
    fn bool_outside_zero_or_one_is_a_domain_error() {
        let mut row = member_row();
        row["active"] = json!(2);
        let err = coerce_one(row).expect_err("domain");
        assert!(matches!(err, RuntimeError::Domain { .. }));
        assert_eq!(
            err.to_string(),
            "invalid value for `member.active`: expected 0 or 1, got 2"
        );
    }

    #[test]
    fn malformed_timestamp_and_asset_are_domain_errors() {
        let mut row = member_row();
        row["joined"] = json!("not a date");
        assert!(matches!(coerce_one(row), Err(RuntimeError::Domain { .. })));

        let mut row = member_row();
        row["stake"] = json!(12.5);
        assert!(matches!(coerce_one(row), Err(RuntimeError::Domain { .. })));
    }

    #[test]
    fn unknown_variant_tag_is_a_discriminant_error() {
        let mut row = member_row();
        row["prize"] = json!([5, "x"]);
        assert!(matches!(
            coerce_one(row),
            Err(RuntimeError::Discriminant { ref tag, branches: 2, .. }) if tag == "5"
        ));

        let mut row = member_row();
        row["prize"] = json!(["uint64", "x"]);
        let err = coerce_one(row).expect_err("unknown type tag");
        assert_eq!(
            err.to_string(),
            "variant `reward` has 2 branch(es), none matches discriminant uint64"
        );
    }

    #[test]
    fn variant_tags_become_indices_even_without_reinterpreted_branches() {
        let g = abibridge_core::load_graph(
            &json!({
                "variants": [
                    {"name": "plain", "types": ["int8", "string"]},
                    {"name": "rich", "types": ["asset", "string"]}
                ],
                "structs": [{"name": "row", "base": "", "fields": [
                    {"name": "p", "type": "plain"},
                    {"name": "r", "type": "rich"},
                    {"name": "ps", "type": "plain[]"}
                ]}],
                "tables": [{"name": "rows", "type": "row", "index_type": "i64"}]
            })
            .to_string(),
        )
        .expect("graph");
        let def = g.table_row("rows").expect("row struct");
        let raw = TableRows {
            rows: vec![json!({
                "p": ["int8", 5],
                "r": ["string", "x"],
                "ps": [["string", "a"], [0, -1]]
            })],
            more: false,
            next_key: None,
        };
        let mut out = coerce_rows(raw, def, &g, RowLayout::Plain).expect("coerce");
        let row = out.rows.remove(0);
        assert_eq!(row.get("p").map(HostValue::to_wire), Some(json!([0, 5])));
        assert_eq!(row.get("r").map(HostValue::to_wire), Some(json!([1, "x"])));
        assert_eq!(
            row.get("ps").map(HostValue::to_wire),
            Some(json!([[1, "a"], [0, -1]]))
        );
    }

    #[test]
    fn optional_fields_accept_null_and_coerce_when_present() {
        let g = abibridge_core::load_graph(
            &json!({
                "structs": [{"name": "row", "base": "", "fields": [
                    {"name": "since", "type": "time_point_sec?"},
                    {"name": "ok", "type": "bool?"}
                ]}],
                "tables": [{"name": "rows", "type": "row", "index_type": "i64"}]
            })
            .to_string(),
        )
        .expect("graph");
        let def = g.table_row("rows").expect("row struct");
        let raw = TableRows {
            rows: vec![json!({"since": null, "ok": 1}), json!({})],
            more: false,
            next_key: None,
        };
        let out = coerce_rows(raw, def, &g, RowLayout::Plain).expect("coerce");
        assert_eq!(out.rows[0].get("since"), Some(&HostValue::Wire(Value::Null)));
        assert_eq!(out.rows[0].get("ok"), Some(&HostValue::Bool(true)));
        assert!(out.rows[1].fields.is_empty());
    }

    #[test]
    fn payer_rows_are_coerced_on_their_data() {
        let g = graph();
        let def = g.table_row("members").expect("row struct");
        let raw = TableRows {
            rows: vec![json!({"data": member_row(), "payer": "alice"})],
            more: true,
            next_key: Some("42".to_string()),
        };
        let out = coerce_rows(raw, def, &g, RowLayout::WithPayer).expect("coerce");
        assert!(out.more);
        assert_eq!(out.next_key.as_deref(), Some("42"));
        assert_eq!(out.rows[0].payer.as_deref(), Some("alice"));
        assert_eq!(out.rows[0].get("active"), Some(&HostValue::Bool(true)));
    }
}
