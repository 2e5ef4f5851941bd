use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{DiagnosticCode, SchemaError};
use crate::schema::{AbiDocument, StructDef};
use crate::type_map::{parse_type, FieldType, TypeExpr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub ty: FieldType,
    /// The struct that declares the field; differs from the owner for
    /// inherited fields.
    pub declared_in: String,
}

impl ResolvedField {
    pub fn is_binary_extension(&self) -> bool {
        self.ty.binary_extension
    }

    pub fn is_optional(&self) -> bool {
        self.ty.optional
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStruct {
    pub name: String,
    pub base: Option<String>,
    pub own_fields: Vec<ResolvedField>,
    /// Base fields (recursively, in order) followed by `own_fields`.
    pub fields: Vec<ResolvedField>,
}

impl ResolvedStruct {
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAlias {
    pub name: String,
    pub target: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantBranch {
    /// Wire discriminant.
    pub index: usize,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVariant {
    pub name: String,
    pub branches: Vec<VariantBranch>,
}

impl ResolvedVariant {
    pub fn branch(&self, index: usize) -> Option<&VariantBranch> {
        self.branches.get(index)
    }

    /// Chain APIs name the branch by its ABI type instead of its index.
    pub fn branch_by_type_name(&self, type_name: &str) -> Option<&VariantBranch> {
        self.branches.iter().find(|b| b.ty.to_string() == type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAction {
    pub name: String,
    pub struct_name: String,
    pub fields: Vec<ResolvedField>,
    pub ricardian_contract: String,
}

impl ResolvedAction {
    /// Minimum number of positional arguments: everything up to and including
    /// the last field that is not a binary extension.
    pub fn required_arity(&self) -> usize {
        self.fields
            .iter()
            .rposition(|f| !f.is_binary_extension())
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTable {
    pub name: String,
    pub row_struct: String,
    pub index_type: String,
    pub key_names: Vec<String>,
    pub key_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeDecl {
    Alias(usize),
    Struct(usize),
    Variant(usize),
}

impl TypeDecl {
    fn kind(self) -> &'static str {
        match self {
            TypeDecl::Alias(_) => "type alias",
            TypeDecl::Struct(_) => "struct",
            TypeDecl::Variant(_) => "variant",
        }
    }
}

/// The document after every reference has been checked. Entities keep
/// document order; lookups go through name indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGraph {
    pub version: Option<String>,
    pub aliases: Vec<ResolvedAlias>,
    pub structs: Vec<ResolvedStruct>,
    pub actions: Vec<ResolvedAction>,
    pub tables: Vec<ResolvedTable>,
    pub variants: Vec<ResolvedVariant>,
    #[serde(skip)]
    decls: BTreeMap<String, TypeDecl>,
}

impl ResolvedGraph {
    pub fn lookup(&self, name: &str) -> Option<TypeDecl> {
        self.decls.get(name).copied()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&ResolvedStruct> {
        match self.lookup(name)? {
            TypeDecl::Struct(idx) => self.structs.get(idx),
            _ => None,
        }
    }

    pub fn alias(&self, name: &str) -> Option<&ResolvedAlias> {
        match self.lookup(name)? {
            TypeDecl::Alias(idx) => self.aliases.get(idx),
            _ => None,
        }
    }

    pub fn variant(&self, name: &str) -> Option<&ResolvedVariant> {
        match self.lookup(name)? {
            TypeDecl::Variant(idx) => self.variants.get(idx),
            _ => None,
        }
    }

    pub fn action(&self, name: &str) -> Option<&ResolvedAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&ResolvedTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_row(&self, table_name: &str) -> Option<&ResolvedStruct> {
        self.struct_def(&self.table(table_name)?.row_struct)
    }

    /// Follows `Named` alias links until reaching something that is not an
    /// alias. Alias chains are acyclic once resolved.
    pub fn resolve_alias<'a>(&'a self, mut expr: &'a TypeExpr) -> &'a TypeExpr {
        for _ in 0..=self.aliases.len() {
            let TypeExpr::Named(name) = expr else {
                return expr;
            };
            match self.alias(name) {
                Some(alias) => expr = &alias.target,
                None => return expr,
            }
        }
        expr
    }
}

pub fn resolve(doc: &AbiDocument) -> Result<ResolvedGraph, SchemaError> {
    let decls = index_declarations(doc)?;
    check_unique("action", doc.actions.iter().map(|a| a.name.as_str()))?;
    check_unique("table", doc.tables.iter().map(|t| t.name.as_str()))?;

    let mut aliases = Vec::with_capacity(doc.types.len());
    for alias in &doc.types {
        let decl = format!("type alias {}", alias.new_type_name);
        let ty = parse_checked(&decl, &alias.ty, &decls)?;
        if ty.binary_extension || ty.optional {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0122MalformedType,
                decl,
                format!("`$` and `?` are only allowed on struct fields, got {:?}", alias.ty),
            ));
        }
        aliases.push(ResolvedAlias {
            name: alias.new_type_name.clone(),
            target: ty.expr,
        });
    }
    check_alias_cycles(&aliases)?;

    let mut variants = Vec::with_capacity(doc.variants.len());
    for variant in &doc.variants {
        let decl = format!("variant {}", variant.name);
        if variant.types.is_empty() {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0123EmptyVariant,
                decl,
                "variant declares no branch types",
            ));
        }
        let mut branches = Vec::with_capacity(variant.types.len());
        for (index, token) in variant.types.iter().enumerate() {
            let ty = parse_checked(&decl, token, &decls)?;
            if ty.binary_extension || ty.optional {
                return Err(SchemaError::at(
                    DiagnosticCode::ABB0122MalformedType,
                    decl,
                    format!("`$` and `?` are only allowed on struct fields, got {token:?}"),
                ));
            }
            branches.push(VariantBranch {
                index,
                ty: ty.expr,
            });
        }
        variants.push(ResolvedVariant {
            name: variant.name.clone(),
            branches,
        });
    }

    let structs = resolve_structs(doc, &decls)?;

    let mut graph = ResolvedGraph {
        version: doc.version.clone(),
        aliases,
        structs,
        actions: Vec::with_capacity(doc.actions.len()),
        tables: Vec::with_capacity(doc.tables.len()),
        variants,
        decls,
    };

    for action in &doc.actions {
        let Some(s) = struct_behind(&graph, &action.ty) else {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0130UnknownActionType,
                format!("action {}", action.name),
                format!("type `{}` does not name a struct", action.ty),
            ));
        };
        let resolved = ResolvedAction {
            name: action.name.clone(),
            struct_name: s.name.clone(),
            fields: s.fields.clone(),
            ricardian_contract: action.ricardian_contract.clone(),
        };
        graph.actions.push(resolved);
    }

    for table in &doc.tables {
        let Some(s) = struct_behind(&graph, &table.ty) else {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0131UnknownTableType,
                format!("table {}", table.name),
                format!("row type `{}` does not name a struct", table.ty),
            ));
        };
        let resolved = ResolvedTable {
            name: table.name.clone(),
            row_struct: s.name.clone(),
            index_type: table.index_type.clone(),
            key_names: table.key_names.clone(),
            key_types: table.key_types.clone(),
        };
        graph.tables.push(resolved);
    }

    debug!(
        aliases = graph.aliases.len(),
        structs = graph.structs.len(),
        actions = graph.actions.len(),
        tables = graph.tables.len(),
        variants = graph.variants.len(),
        "resolved ABI graph"
    );
    Ok(graph)
}

fn index_declarations(doc: &AbiDocument) -> Result<BTreeMap<String, TypeDecl>, SchemaError> {
    let entries = doc
        .types
        .iter()
        .enumerate()
        .map(|(i, a)| (a.new_type_name.as_str(), TypeDecl::Alias(i)))
        .chain(
            doc.structs
                .iter()
                .enumerate()
                .map(|(i, s)| (s.name.as_str(), TypeDecl::Struct(i))),
        )
        .chain(
            doc.variants
                .iter()
                .enumerate()
                .map(|(i, v)| (v.name.as_str(), TypeDecl::Variant(i))),
        );

    let mut decls: BTreeMap<String, TypeDecl> = BTreeMap::new();
    for (name, decl) in entries {
        if name.trim().is_empty() {
            return Err(SchemaError::new(
                DiagnosticCode::ABB0101EmptyName,
                format!("a {} has an empty name", decl.kind()),
            ));
        }
        if let Some(prev) = decls.insert(name.to_string(), decl) {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0100DuplicateDeclaration,
                format!("{} {name}", decl.kind()),
                format!("name `{name}` is already declared as a {}", prev.kind()),
            ));
        }
    }
    Ok(decls)
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SchemaError::new(
                DiagnosticCode::ABB0101EmptyName,
                format!("a {kind} has an empty name"),
            ));
        }
        if !seen.insert(name) {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0100DuplicateDeclaration,
                format!("{kind} {name}"),
                format!("{kind} `{name}` is declared more than once"),
            ));
        }
    }
    Ok(())
}

fn parse_checked(
    decl: &str,
    token: &str,
    decls: &BTreeMap<String, TypeDecl>,
) -> Result<FieldType, SchemaError> {
    let ty = parse_type(token).map_err(|err| {
        SchemaError::at(DiagnosticCode::ABB0122MalformedType, decl, err.to_string())
    })?;
    if let Some(name) = ty.expr.named_ref() {
        if !decls.contains_key(name) {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0120UnresolvedType,
                decl,
                format!("unknown type `{name}`"),
            ));
        }
    }
    Ok(ty)
}

fn check_alias_cycles(aliases: &[ResolvedAlias]) -> Result<(), SchemaError> {
    let targets: BTreeMap<&str, &TypeExpr> = aliases
        .iter()
        .map(|a| (a.name.as_str(), &a.target))
        .collect();
    for alias in aliases {
        let mut seen = BTreeSet::from([alias.name.as_str()]);
        let mut cur = &alias.target;
        while let TypeExpr::Named(next) = cur {
            let Some(&target) = targets.get(next.as_str()) else {
                break;
            };
            if !seen.insert(next.as_str()) {
                return Err(SchemaError::at(
                    DiagnosticCode::ABB0121AliasCycle,
                    format!("type alias {}", alias.name),
                    format!("alias chain cycle involving {next}"),
                ));
            }
            cur = target;
        }
    }
    Ok(())
}

fn resolve_structs(
    doc: &AbiDocument,
    decls: &BTreeMap<String, TypeDecl>,
) -> Result<Vec<ResolvedStruct>, SchemaError> {
    let mut own: Vec<Vec<ResolvedField>> = Vec::with_capacity(doc.structs.len());
    for s in &doc.structs {
        let mut fields = Vec::with_capacity(s.fields.len());
        for f in &s.fields {
            let decl = format!("struct {} field {}", s.name, f.name);
            fields.push(ResolvedField {
                name: f.name.clone(),
                ty: parse_checked(&decl, &f.ty, decls)?,
                declared_in: s.name.clone(),
            });
        }
        own.push(fields);
    }

    let mut out = Vec::with_capacity(doc.structs.len());
    for (idx, s) in doc.structs.iter().enumerate() {
        let chain = base_chain(doc, decls, idx)?;
        let mut fields: Vec<ResolvedField> = Vec::new();
        for link in chain.iter().rev() {
            for f in &own[*link] {
                if let Some(prev) = fields.iter().find(|p| p.name == f.name) {
                    return Err(SchemaError::at(
                        DiagnosticCode::ABB0112DuplicateField,
                        format!("struct {}", s.name),
                        format!(
                            "field `{}` from `{}` duplicates the one inherited from `{}`",
                            f.name, f.declared_in, prev.declared_in
                        ),
                    ));
                }
                fields.push(f.clone());
            }
        }
        out.push(ResolvedStruct {
            name: s.name.clone(),
            base: s.base_name().map(str::to_string),
            own_fields: own[idx].clone(),
            fields,
        });
    }
    Ok(out)
}

/// Indexes of the struct and its ancestors, nearest first.
fn base_chain(
    doc: &AbiDocument,
    decls: &BTreeMap<String, TypeDecl>,
    start: usize,
) -> Result<Vec<usize>, SchemaError> {
    let mut chain = vec![start];
    let mut cur: &StructDef = &doc.structs[start];
    while let Some(base) = cur.base_name() {
        let Some(TypeDecl::Struct(base_idx)) = decls.get(base).copied() else {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0110MissingBase,
                format!("struct {}", cur.name),
                format!("base `{base}` is not a struct in this document"),
            ));
        };
        if chain.contains(&base_idx) {
            return Err(SchemaError::at(
                DiagnosticCode::ABB0111BaseCycle,
                format!("struct {}", doc.structs[start].name),
                format!("base chain cycle involving {base}"),
            ));
        }
        chain.push(base_idx);
        cur = &doc.structs[base_idx];
    }
    Ok(chain)
}

fn struct_behind<'a>(graph: &'a ResolvedGraph, token: &str) -> Option<&'a ResolvedStruct> {
    let expr = TypeExpr::Named(token.trim().to_string());
    match graph.resolve_alias(&expr) {
        TypeExpr::Named(name) => graph.struct_def(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(v: serde_json::Value) -> AbiDocument {
        serde_json::from_value(v).expect("decode ABI")
    }

    fn field_names(s: &ResolvedStruct) -> Vec<&str> {
        s.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn flattens_base_fields_first() {
        let g = resolve(&doc(json!({
            "structs": [
                {"name": "c", "base": "b", "fields": [{"name": "z", "type": "bool"}]},
                {"name": "a", "base": "", "fields": [{"name": "x", "type": "name"}]},
                {"name": "b", "base": "a", "fields": [{"name": "y", "type": "string"}]}
            ]
        })))
        .expect("resolve");
        let c = g.struct_def("c").expect("c");
        assert_eq!(field_names(c), vec!["x", "y", "z"]);
        assert_eq!(c.base.as_deref(), Some("b"));
        assert_eq!(c.own_fields.len(), 1);
        assert_eq!(c.fields[0].declared_in, "a");
        let order: Vec<&str> = g.structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn base_cycle_is_fatal() {
        let err = resolve(&doc(json!({
            "structs": [
                {"name": "a", "base": "b", "fields": []},
                {"name": "b", "base": "a", "fields": []}
            ]
        })))
        .expect_err("cycle");
        assert_eq!(err.code, DiagnosticCode::ABB0111BaseCycle);
        assert!(err.message.starts_with("base chain cycle involving"));
    }

    #[test]
    fn self_base_is_a_cycle() {
        let err = resolve(&doc(json!({
            "structs": [{"name": "a", "base": "a", "fields": []}]
        })))
        .expect_err("cycle");
        assert_eq!(err.code, DiagnosticCode::ABB0111BaseCycle);
        assert_eq!(err.message, "base chain cycle involving a");
    }

    #[test]
    fn missing_base_is_fatal() {
        let err = resolve(&doc(json!({
            "structs": [{"name": "a", "base": "nope", "fields": []}]
        })))
        .expect_err("missing base");
        assert_eq!(err.code, DiagnosticCode::ABB0110MissingBase);
        assert_eq!(err.declaration.as_deref(), Some("struct a"));
    }

    #[test]
    fn duplicate_field_after_merge_is_fatal() {
        let err = resolve(&doc(json!({
            "structs": [
                {"name": "a", "base": "", "fields": [{"name": "x", "type": "name"}]},
                {"name": "b", "base": "a", "fields": [{"name": "x", "type": "name"}]}
            ]
        })))
        .expect_err("duplicate");
        assert_eq!(err.code, DiagnosticCode::ABB0112DuplicateField);
    }

    #[test]
    fn dangling_field_type_names_the_field() {
        let err = resolve(&doc(json!({
            "structs": [{"name": "dac", "base": "", "fields": [{"name": "refs", "type": "ref_t[]"}]}]
        })))
        .expect_err("dangling");
        assert_eq!(err.code, DiagnosticCode::ABB0120UnresolvedType);
        assert_eq!(err.declaration.as_deref(), Some("struct dac field refs"));
    }

    #[test]
    fn optional_fields_resolve_and_optional_aliases_do_not() {
        let g = resolve(&doc(json!({
            "structs": [{"name": "s", "base": "", "fields": [{"name": "o", "type": "string?"}]}]
        })))
        .expect("resolve");
        let field = g.struct_def("s").and_then(|s| s.field("o")).expect("field");
        assert!(field.is_optional());
        assert_eq!(field.ty.expr.to_string(), "string");

        let err = resolve(&doc(json!({
            "types": [{"new_type_name": "maybe", "type": "string?"}]
        })))
        .expect_err("optional alias");
        assert_eq!(err.code, DiagnosticCode::ABB0122MalformedType);
    }

    #[test]
    fn struct_and_variant_sharing_a_name_is_rejected() {
        let err = resolve(&doc(json!({
            "structs": [{"name": "thing", "base": "", "fields": []}],
            "variants": [{"name": "thing", "types": ["int8"]}]
        })))
        .expect_err("clash");
        assert_eq!(err.code, DiagnosticCode::ABB0100DuplicateDeclaration);
    }

    #[test]
    fn action_may_share_its_struct_name() {
        let g = resolve(&doc(json!({
            "structs": [{"name": "regaccount", "base": "", "fields": [
                {"name": "dac_id", "type": "name"},
                {"name": "memo", "type": "string$"}
            ]}],
            "actions": [{"name": "regaccount", "type": "regaccount"}]
        })))
        .expect("resolve");
        let action = g.action("regaccount").expect("action");
        assert_eq!(action.fields.len(), 2);
        assert_eq!(action.required_arity(), 1);
    }

    #[test]
    fn variant_branch_order_is_preserved() {
        let g = resolve(&doc(json!({
            "types": [{"new_type_name": "INT16_VEC", "type": "int16[]"}],
            "variants": [{"name": "v", "types": ["string", "int8", "INT16_VEC", "int8"]}]
        })))
        .expect("resolve");
        let v = g.variant("v").expect("variant");
        let tokens: Vec<String> = v.branches.iter().map(|b| b.ty.to_string()).collect();
        assert_eq!(tokens, vec!["string", "int8", "INT16_VEC", "int8"]);
        assert_eq!(v.branches[2].index, 2);
        assert_eq!(v.branch_by_type_name("int8").map(|b| b.index), Some(1));
    }

    #[test]
    fn alias_cycle_is_fatal() {
        let err = resolve(&doc(json!({
            "types": [
                {"new_type_name": "a", "type": "b"},
                {"new_type_name": "b", "type": "a"}
            ]
        })))
        .expect_err("cycle");
        assert_eq!(err.code, DiagnosticCode::ABB0121AliasCycle);
    }

    #[test]
    fn tables_follow_aliases_to_their_row_struct() {
        let g = resolve(&doc(json!({
            "types": [{"new_type_name": "dac_row", "type": "dac"}],
            "structs": [{"name": "dac", "base": "", "fields": [{"name": "owner", "type": "name"}]}],
            "tables": [{"name": "dacs", "type": "dac_row", "index_type": "i64"}]
        })))
        .expect("resolve");
        assert_eq!(g.table_row("dacs").map(|s| s.name.as_str()), Some("dac"));
    }

    #[test]
    fn table_with_unknown_row_type_is_fatal() {
        let err = resolve(&doc(json!({
            "tables": [{"name": "dacs", "type": "dac", "index_type": "i64"}]
        })))
        .expect_err("unknown");
        assert_eq!(err.code, DiagnosticCode::ABB0131UnknownTableType);
        assert_eq!(err.declaration.as_deref(), Some("table dacs"));
    }

    #[test]
    fn action_with_variant_type_is_fatal() {
        let err = resolve(&doc(json!({
            "variants": [{"name": "v", "types": ["int8"]}],
            "actions": [{"name": "go", "type": "v"}]
        })))
        .expect_err("not a struct");
        assert_eq!(err.code, DiagnosticCode::ABB0130UnknownActionType);
    }
}
