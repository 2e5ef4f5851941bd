//! TypeScript binding emitter.
//!
//! Section order is part of the output contract and never changes:
//! header, table row interfaces, added types, variants, contract interface.

use abibridge_contracts::{DEFAULT_RUNTIME_MODULE, GENERATOR_NAME};
use tracing::debug;

use crate::diagnostics::{DiagnosticCode, SchemaError};
use crate::names;
use crate::resolve::{ResolvedField, ResolvedGraph};
use crate::type_map::{map_type, MapContext, TypeExpr};

const CALL_OPTIONS_TYPE: &str = "{ from?: Account, auths?: ActorPermission[] }";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Module the generated file imports its runtime types from.
    pub runtime_module: String,
    /// Stamped into the header when set.
    pub source_sha256: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            source_sha256: None,
        }
    }
}

pub fn emit(
    graph: &ResolvedGraph,
    contract_name: &str,
    opts: &EmitOptions,
) -> Result<String, SchemaError> {
    if !names::is_identifier(contract_name) {
        return Err(SchemaError::new(
            DiagnosticCode::ABB0201InvalidContractName,
            format!("contract name {contract_name:?} is not a TypeScript identifier"),
        ));
    }
    check_references(graph)?;

    let ctx = MapContext::from_graph(graph, contract_name);
    let mut out = String::new();

    emit_header(&mut out, opts);

    out.push_str("// Table row types\n");
    for s in &graph.structs {
        let name = names::type_name(contract_name, &s.name);
        match &s.base {
            Some(base) => out.push_str(&format!(
                "export interface {name} extends {} {{\n",
                names::type_name(contract_name, base)
            )),
            None => out.push_str(&format!("export interface {name} {{\n")),
        }
        for f in &s.own_fields {
            out.push_str(&format!(
                "\t{}{}: {};\n",
                names::property_key(&f.name),
                key_marker(f),
                field_type(f, &ctx)
            ));
        }
        out.push_str("}\n\n");
    }

    out.push_str("// Added Types\n");
    for alias in &graph.aliases {
        out.push_str(&format!(
            "export type {} = {};\n",
            names::type_name(contract_name, &alias.name),
            map_type(&alias.target, &ctx)
        ));
    }
    out.push('\n');

    out.push_str("// Variants\n");
    for variant in &graph.variants {
        let mut members: Vec<String> = Vec::with_capacity(variant.branches.len());
        for branch in &variant.branches {
            let mapped = map_type(&branch.ty, &ctx);
            if !members.contains(&mapped) {
                members.push(mapped);
            }
        }
        out.push_str(&format!(
            "export type {} = [number, {}];\n",
            names::type_name(contract_name, &variant.name),
            members.join(" | ")
        ));
    }
    out.push('\n');

    out.push_str(&format!("export interface {contract_name} extends Contract {{\n"));
    out.push_str("\t// Actions\n");
    for action in &graph.actions {
        let idents = names::param_idents(action.fields.iter().map(|f| f.name.as_str()));
        let mut params: Vec<String> = action
            .fields
            .iter()
            .zip(&idents)
            .map(|(f, ident)| {
                let marker = if f.is_binary_extension() { "?" } else { "" };
                format!("{ident}{marker}: {}", field_type(f, &ctx))
            })
            .collect();
        params.push(format!(
            "{}?: {CALL_OPTIONS_TYPE}",
            names::CALL_OPTIONS_PARAM
        ));
        out.push_str(&format!(
            "\t{}({}): Promise<any>;\n",
            action.name,
            params.join(", ")
        ));
    }
    out.push('\n');

    out.push_str("\t// Actions with object params\n");
    for action in &graph.actions {
        let members: Vec<String> = action
            .fields
            .iter()
            .map(|f| {
                format!(
                    "{}{}: {}",
                    names::property_key(&f.name),
                    key_marker(f),
                    field_type(f, &ctx)
                )
            })
            .collect();
        let bundle = if members.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", members.join(", "))
        };
        out.push_str(&format!(
            "\t{}(params: {bundle}, options?: {CALL_OPTIONS_TYPE}): Promise<any>;\n",
            names::object_params_method(&action.name)
        ));
    }
    out.push('\n');

    out.push_str("\t// Tables\n");
    for table in &graph.tables {
        out.push_str(&format!(
            "\t{}(options?: GetTableRowsOptions): Promise<TableRowsResult<{}>>;\n",
            names::table_accessor(&table.name),
            names::type_name(contract_name, &table.row_struct)
        ));
    }
    out.push_str("}\n");

    debug!(contract = contract_name, bytes = out.len(), "emitted bindings");
    Ok(out)
}

fn emit_header(out: &mut String, opts: &EmitOptions) {
    out.push_str("// =====================================================\n");
    out.push_str("// WARNING: GENERATED FILE\n");
    out.push_str("//\n");
    out.push_str(&format!(
        "// Any changes you make will be overwritten by {GENERATOR_NAME}\n"
    ));
    out.push_str("// =====================================================\n");
    if let Some(sha) = &opts.source_sha256 {
        out.push_str(&format!("// Source ABI sha256: {sha}\n"));
    }
    out.push('\n');
    out.push_str(&format!(
        "import {{ Account, Asset, Contract, GetTableRowsOptions, ExtendedAsset, ExtendedSymbol, ActorPermission, TableRowsResult }} from '{}';\n\n",
        opts.runtime_module
    ));
}

/// Binary extensions may be missing from a row and optional fields may be
/// left out of a call, so both become optional keys.
fn key_marker(f: &ResolvedField) -> &'static str {
    if f.is_binary_extension() || f.is_optional() {
        "?"
    } else {
        ""
    }
}

fn field_type(f: &ResolvedField, ctx: &MapContext) -> String {
    let mapped = map_type(&f.ty.expr, ctx);
    if f.is_optional() {
        format!("{mapped} | null")
    } else {
        mapped
    }
}

/// The graph is public and could have been edited after resolution, so every
/// reference is checked again before any text is produced.
fn check_references(graph: &ResolvedGraph) -> Result<(), SchemaError> {
    let check = |decl: String, expr: &TypeExpr| -> Result<(), SchemaError> {
        match expr.named_ref() {
            Some(name) if !graph.has_type(name) => Err(SchemaError::at(
                DiagnosticCode::ABB0200UnresolvedAtEmit,
                decl,
                format!("unknown type `{name}`"),
            )),
            _ => Ok(()),
        }
    };

    for s in &graph.structs {
        if let Some(base) = &s.base {
            if graph.struct_def(base).is_none() {
                return Err(SchemaError::at(
                    DiagnosticCode::ABB0200UnresolvedAtEmit,
                    format!("struct {}", s.name),
                    format!("unknown base struct `{base}`"),
                ));
            }
        }
        for f in &s.fields {
            check(format!("struct {} field {}", s.name, f.name), &f.ty.expr)?;
        }
    }
    for alias in &graph.aliases {
        check(format!("type alias {}", alias.name), &alias.target)?;
    }
    for variant in &graph.variants {
        for branch in &variant.branches {
            check(format!("variant {}", variant.name), &branch.ty)?;
        }
    }
    for action in &graph.actions {
        for f in &action.fields {
            check(format!("action {} field {}", action.name, f.name), &f.ty.expr)?;
        }
    }
    for table in &graph.tables {
        if graph.struct_def(&table.row_struct).is_none() {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0200UnresolvedAtEmit,
                format!("table {}", table.name),
                format!("unknown row struct `{}`", table.row_struct),
            ));
        }
    }
    Ok(())
}
