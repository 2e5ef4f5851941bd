//! Runtime side of the generated contract interface.
//!
//! The generated TypeScript declares one method per action (twice, for the
//! two calling conventions) and one accessor per table. `DispatchTable` maps
//! those same method names back to ABI entries, and `ContractHandle` serves
//! them over a `ChainTransport`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use abibridge_core::names;
use abibridge_core::resolve::{ResolvedAction, ResolvedGraph, ResolvedTable};

use crate::account::Account;
use crate::coerce::{coerce_rows, Row, TableRows};
use crate::error::{RuntimeError, RuntimeResult};
use crate::marshal::{marshal, CallArgs, CallOptions, MarshalledAction, WireAction};
use crate::query::{GetTableRowsRequest, TableQuery};
use crate::stats::ActionStats;

/// The chain client. Submission, signing and RPC live behind this trait.
pub trait ChainTransport {
    /// Signs (as `signer` when given, adding its key if the transport does not
    /// have it yet) and pushes one transaction. Returns the chain's receipt.
    fn transact(
        &self,
        actions: &[WireAction],
        signer: Option<&Account>,
        debug: bool,
    ) -> anyhow::Result<Value>;

    fn get_table_rows(&self, request: &GetTableRowsRequest) -> anyhow::Result<TableRows<Value>>;
}

impl<T: ChainTransport + ?Sized> ChainTransport for Arc<T> {
    fn transact(
        &self,
        actions: &[WireAction],
        signer: Option<&Account>,
        debug: bool,
    ) -> anyhow::Result<Value> {
        (**self).transact(actions, signer, debug)
    }

    fn get_table_rows(&self, request: &GetTableRowsRequest) -> anyhow::Result<TableRows<Value>> {
        (**self).get_table_rows(request)
    }
}

/// A generated method name, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    Action(&'a ResolvedAction),
    ActionObjectParams(&'a ResolvedAction),
    Table(&'a ResolvedTable),
}

#[derive(Debug, Clone)]
pub struct DispatchTable {
    graph: Arc<ResolvedGraph>,
    actions: BTreeMap<String, usize>,
    tables: BTreeMap<String, usize>,
    object_methods: BTreeMap<String, usize>,
    table_accessors: BTreeMap<String, usize>,
}

impl DispatchTable {
    pub fn new(graph: Arc<ResolvedGraph>) -> Self {
        let mut actions = BTreeMap::new();
        let mut object_methods = BTreeMap::new();
        for (idx, action) in graph.actions.iter().enumerate() {
            actions.insert(action.name.clone(), idx);
            object_methods.insert(names::object_params_method(&action.name), idx);
        }
        let mut tables = BTreeMap::new();
        let mut table_accessors = BTreeMap::new();
        for (idx, table) in graph.tables.iter().enumerate() {
            tables.insert(table.name.clone(), idx);
            table_accessors.insert(names::table_accessor(&table.name), idx);
        }
        DispatchTable {
            graph,
            actions,
            tables,
            object_methods,
            table_accessors,
        }
    }

    pub fn graph(&self) -> &ResolvedGraph {
        &self.graph
    }

    pub fn action(&self, name: &str) -> RuntimeResult<&ResolvedAction> {
        self.actions
            .get(name)
            .and_then(|idx| self.graph.actions.get(*idx))
            .ok_or_else(|| RuntimeError::Reference {
                kind: "action",
                name: name.to_string(),
            })
    }

    pub fn table(&self, name: &str) -> RuntimeResult<&ResolvedTable> {
        self.tables
            .get(name)
            .and_then(|idx| self.graph.tables.get(*idx))
            .ok_or_else(|| RuntimeError::Reference {
                kind: "table",
                name: name.to_string(),
            })
    }

    /// Looks a method up by the name the generated interface gives it. Raw
    /// action names win over `<action>O` in case an action is itself named
    /// like an object-params method.
    pub fn method(&self, method: &str) -> RuntimeResult<Method<'_>> {
        if let Some(idx) = self.actions.get(method) {
            return Ok(Method::Action(&self.graph.actions[*idx]));
        }
        if let Some(idx) = self.object_methods.get(method) {
            return Ok(Method::ActionObjectParams(&self.graph.actions[*idx]));
        }
        if let Some(idx) = self.table_accessors.get(method) {
            return Ok(Method::Table(&self.graph.tables[*idx]));
        }
        Err(RuntimeError::Reference {
            kind: "method",
            name: method.to_string(),
        })
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.graph.actions.iter().map(|a| a.name.as_str())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tables.iter().map(|t| t.name.as_str())
    }
}

/// Name-based access to a deployed contract.
pub trait ContractCapability {
    fn invoke(&self, action: &str, args: CallArgs, options: &CallOptions) -> RuntimeResult<Value>;

    fn query(&self, table: &str, query: &TableQuery) -> RuntimeResult<TableRows<Row>>;
}

pub struct ContractHandle<T> {
    account: Account,
    dispatch: DispatchTable,
    transport: T,
    stats: Option<Arc<ActionStats>>,
}

impl<T: ChainTransport> ContractHandle<T> {
    pub fn new(account: Account, graph: Arc<ResolvedGraph>, transport: T) -> Self {
        ContractHandle {
            account,
            dispatch: DispatchTable::new(graph),
            transport,
            stats: None,
        }
    }

    /// Records `processed.receipt.cpu_usage_us` of every positional action call.
    pub fn with_stats(mut self, stats: Arc<ActionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn prepare(
        &self,
        action: &str,
        args: CallArgs,
        options: &CallOptions,
    ) -> RuntimeResult<MarshalledAction> {
        let resolved = self.dispatch.action(action)?;
        marshal(&self.account, resolved, args, options, self.dispatch.graph())
    }

    /// Calls a method by its generated name: `regaccount`, `regaccountO` or
    /// `dacsTable`. Table accessors take their options from `args` as a
    /// single positional JSON object.
    pub fn call(&self, method: &str, args: CallArgs, options: &CallOptions) -> RuntimeResult<Value> {
        match self.dispatch.method(method)? {
            Method::Action(action) => self.invoke(&action.name, args, options),
            Method::ActionObjectParams(action) => match args {
                CallArgs::Object(_) => self.invoke(&action.name, args, options),
                CallArgs::Positional(values) => Err(RuntimeError::Arity {
                    action: action.name.clone(),
                    expected: "a single params object".to_string(),
                    actual: format!("{} positional argument(s)", values.len()),
                }),
            },
            Method::Table(table) => {
                let wire = match args {
                    CallArgs::Positional(values) if values.len() > 1 => {
                        return Err(RuntimeError::Arity {
                            action: method.to_string(),
                            expected: "at most 1 argument (GetTableRowsOptions)".to_string(),
                            actual: format!("{} positional argument(s)", values.len()),
                        });
                    }
                    CallArgs::Positional(values) => values.into_iter().flatten().next().map(|v| v.to_wire()),
                    CallArgs::Object(fields) => Some(Value::Object(
                        fields.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect(),
                    )),
                };
                let query = match wire {
                    Some(v) => serde_json::from_value(v).map_err(|err| RuntimeError::Arity {
                        action: method.to_string(),
                        expected: "GetTableRowsOptions".to_string(),
                        actual: err.to_string(),
                    })?,
                    None => TableQuery::default(),
                };
                let rows = self.query(&table.name, &query)?;
                Ok(rows_to_wire(&rows))
            }
        }
    }

    fn record_cpu(&self, action: &str, receipt: &Value) {
        let Some(stats) = &self.stats else {
            return;
        };
        match receipt
            .pointer("/processed/receipt/cpu_usage_us")
            .and_then(Value::as_u64)
        {
            Some(us) => stats.log_action(format!("{}::{action}", self.account.name), us),
            None => warn!(action, "receipt has no cpu_usage_us, skipping benchmark sample"),
        }
    }
}

impl<T: ChainTransport> ContractCapability for ContractHandle<T> {
    fn invoke(&self, action: &str, args: CallArgs, options: &CallOptions) -> RuntimeResult<Value> {
        let benchmark = matches!(args, CallArgs::Positional(_));
        let prepared = self.prepare(action, args, options)?;
        let receipt = self.transport.transact(
            std::slice::from_ref(&prepared.action),
            prepared.signer.as_ref(),
            prepared.debug,
        )?;
        if benchmark {
            self.record_cpu(action, &receipt);
        }
        Ok(receipt)
    }

    fn query(&self, table: &str, query: &TableQuery) -> RuntimeResult<TableRows<Row>> {
        let resolved = self.dispatch.table(table)?;
        let graph = self.dispatch.graph();
        let row_struct = graph
            .struct_def(&resolved.row_struct)
            .ok_or_else(|| RuntimeError::Reference {
                kind: "table row type",
                name: resolved.row_struct.clone(),
            })?;
        let request = query.to_request(&self.account.name, table);
        debug!(table, scope = %request.scope, "querying table rows");
        let raw = self.transport.get_table_rows(&request)?;
        coerce_rows(raw, row_struct, graph, query.layout())
    }
}

/// Wire view of coerced rows, for callers that only speak JSON.
pub fn rows_to_wire(rows: &TableRows<Row>) -> Value {
    let rows_json: Vec<Value> = rows
        .rows
        .iter()
        .map(|row| {
            let data = Value::Object(
                row.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            );
            match &row.payer {
                Some(payer) => serde_json::json!({"data": data, "payer": payer}),
                None => data,
            }
        })
        .collect();
    let mut out = serde_json::json!({"rows": rows_json, "more": rows.more});
    if let Some(next_key) = &rows.next_key {
        out["next_key"] = Value::String(next_key.clone());
    }
    out
}
