use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use abibridge_core::resolve::{ResolvedAction, ResolvedGraph};
use abibridge_core::type_map::TypeExpr;

use crate::account::{Account, ActorPermission};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::HostValue;

/// Arguments for one action call, in either generated calling convention.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    /// One slot per action field, in field order. `None` (or a short list)
    /// leaves trailing binary-extension fields out.
    Positional(Vec<Option<HostValue>>),
    /// Keyed by wire field name.
    Object(BTreeMap<String, HostValue>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Sign as this account's active permission.
    pub from: Option<Account>,
    /// Explicit authorization list, used when `from` is not set.
    pub auths: Option<Vec<ActorPermission>>,
    pub debug: bool,
}

impl CallOptions {
    pub fn signed_by(account: Account) -> Self {
        CallOptions {
            from: Some(account),
            ..CallOptions::default()
        }
    }

    pub fn with_auths(auths: Vec<ActorPermission>) -> Self {
        CallOptions {
            auths: Some(auths),
            ..CallOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireAction {
    pub account: String,
    pub name: String,
    pub authorization: Vec<ActorPermission>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarshalledAction {
    pub action: WireAction,
    /// The `from` account, which the transport must be able to sign for.
    pub signer: Option<Account>,
    pub debug: bool,
}

pub fn marshal(
    contract: &Account,
    action: &ResolvedAction,
    args: CallArgs,
    options: &CallOptions,
    graph: &ResolvedGraph,
) -> RuntimeResult<MarshalledAction> {
    let data = match args {
        CallArgs::Positional(values) => positional_data(action, values, graph)?,
        CallArgs::Object(values) => object_data(action, values, graph)?,
    };

    let (authorization, signer) = match (&options.from, &options.auths) {
        (Some(from), _) => (from.active(), Some(from.clone())),
        (None, Some(auths)) => (auths.clone(), None),
        (None, None) => (contract.active(), None),
    };

    debug!(
        contract = %contract.name,
        action = %action.name,
        fields = data.len(),
        "marshalled action"
    );
    Ok(MarshalledAction {
        action: WireAction {
            account: contract.name.clone(),
            name: action.name.clone(),
            authorization,
            data,
        },
        signer,
        debug: options.debug,
    })
}

fn positional_data(
    action: &ResolvedAction,
    values: Vec<Option<HostValue>>,
    graph: &ResolvedGraph,
) -> RuntimeResult<Map<String, Value>> {
    let min = action.required_arity();
    let max = action.fields.len();
    if values.len() < min || values.len() > max {
        let expected = if min == max {
            format!("{max} argument(s)")
        } else {
            format!("{min} to {max} argument(s)")
        };
        return Err(RuntimeError::Arity {
            action: action.name.clone(),
            expected,
            actual: values.len().to_string(),
        });
    }

    let mut data = Map::new();
    let mut values = values.into_iter();
    for field in &action.fields {
        match values.next().flatten() {
            Some(value) => {
                data.insert(field.name.clone(), reduce(&value, &field.ty.expr, graph)?);
            }
            None if field.is_binary_extension() => {}
            None if field.is_optional() => {
                data.insert(field.name.clone(), Value::Null);
            }
            None => {
                return Err(RuntimeError::Arity {
                    action: action.name.clone(),
                    expected: format!("a value for `{}`", field.name),
                    actual: "none".to_string(),
                })
            }
        }
    }
    Ok(data)
}

fn object_data(
    action: &ResolvedAction,
    mut values: BTreeMap<String, HostValue>,
    graph: &ResolvedGraph,
) -> RuntimeResult<Map<String, Value>> {
    let mut data = Map::new();
    for field in &action.fields {
        match values.remove(&field.name) {
            Some(value) => {
                data.insert(field.name.clone(), reduce(&value, &field.ty.expr, graph)?);
            }
            None if field.is_binary_extension() => {}
            None if field.is_optional() => {
                data.insert(field.name.clone(), Value::Null);
            }
            None => {
                return Err(RuntimeError::Arity {
                    action: action.name.clone(),
                    expected: format!("field `{}`", field.name),
                    actual: "no value".to_string(),
                })
            }
        }
    }
    if let Some(unknown) = values.keys().next() {
        return Err(RuntimeError::Arity {
            action: action.name.clone(),
            expected: format!("only the {} declared field(s)", action.fields.len()),
            actual: format!("unknown field `{unknown}`"),
        });
    }
    Ok(data)
}

/// Reduces a host value to its wire form, checking variant discriminants
/// against the schema on the way down.
fn reduce(value: &HostValue, expr: &TypeExpr, graph: &ResolvedGraph) -> RuntimeResult<Value> {
    let expr = graph.resolve_alias(expr);
    match (value, expr) {
        (HostValue::Array(items), TypeExpr::Array(inner)) => items
            .iter()
            .map(|item| reduce(item, inner, graph))
            .collect::<RuntimeResult<Vec<_>>>()
            .map(Value::Array),
        (HostValue::Variant(v), TypeExpr::Named(name)) => {
            let Some(variant) = graph.variant(name) else {
                return Ok(value.to_wire());
            };
            let Some(branch) = variant.branch(v.index) else {
                return Err(RuntimeError::Discriminant {
                    variant: variant.name.clone(),
                    tag: v.index.to_string(),
                    branches: variant.branches.len(),
                });
            };
            Ok(Value::Array(vec![
                Value::from(v.index),
                reduce(&v.value, &branch.ty, graph)?,
            ]))
        }
        (HostValue::Struct(fields), TypeExpr::Named(name)) => {
            let Some(def) = graph.struct_def(name) else {
                return Ok(value.to_wire());
            };
            let mut out = Map::new();
            for (key, field_value) in fields {
                let wire = match def.field(key) {
                    Some(f) => reduce(field_value, &f.ty.expr, graph)?,
                    None => field_value.to_wire(),
                };
                out.insert(key.clone(), wire);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(value.to_wire()),
    }
}
