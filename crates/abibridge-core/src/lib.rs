pub mod diagnostics;
pub mod names;
pub mod resolve;
pub mod schema;
pub mod ts_emit;
pub mod type_map;

mod util;

pub use diagnostics::{DiagnosticCode, Phase, SchemaError};
pub use resolve::{resolve, ResolvedGraph};
pub use schema::{parse_document, AbiDocument};
pub use ts_emit::{emit, EmitOptions};
pub use util::sha256_hex;

/// Parses, resolves and emits in one step.
pub fn generate(
    abi_text: &str,
    contract_name: &str,
    opts: &EmitOptions,
) -> Result<String, SchemaError> {
    let doc = parse_document(abi_text)?;
    let graph = resolve(&doc)?;
    emit(&graph, contract_name, opts)
}

/// Parses and resolves a document, the form the runtime builds its dispatch
/// table from.
pub fn load_graph(abi_text: &str) -> Result<ResolvedGraph, SchemaError> {
    resolve(&parse_document(abi_text)?)
}
