use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const TOKEN_ABI: &str = r#"{
  "version": "eosio::abi/1.1",
  "types": [],
  "structs": [
    {"name": "account", "base": "", "fields": [{"name": "balance", "type": "asset"}]},
    {"name": "transfer", "base": "", "fields": [
      {"name": "from", "type": "name"},
      {"name": "to", "type": "name"},
      {"name": "quantity", "type": "asset"},
      {"name": "memo", "type": "string"}
    ]}
  ],
  "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}],
  "tables": [{"name": "accounts", "type": "account", "index_type": "i64", "key_names": [], "key_types": []}],
  "variants": []
}"#;

fn abibridge(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_abibridge"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("run abibridge")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn generate_prints_bindings_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("eosio.token.abi"), TOKEN_ABI).unwrap();

    let out = abibridge(&["generate", "--abi", "eosio.token.abi"], dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("// ====="));
    assert!(text.contains("// Source ABI sha256: "));
    assert!(text.contains("export interface EosioToken extends Contract {"));
    assert!(text.contains("\ttransfer(from: string|number, to: string|number, quantity: Asset, memo: string, options?: { from?: Account, auths?: ActorPermission[] }): Promise<any>;"));
    assert!(text.contains("\taccountsTable(options?: GetTableRowsOptions): Promise<TableRowsResult<EosioTokenAccount>>;"));

    let out = abibridge(
        &[
            "generate",
            "--abi",
            "eosio.token.abi",
            "--contract-name",
            "Token",
            "--no-source-hash",
            "--runtime-module",
            "./runtime",
        ],
        dir.path(),
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(!text.contains("Source ABI sha256"));
    assert!(text.contains("} from './runtime';"));
    assert!(text.contains("export interface Token extends Contract {"));
}

#[test]
fn generate_check_detects_drift() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token.abi"), TOKEN_ABI).unwrap();
    let args = ["generate", "--abi", "token.abi", "--out", "types/token.ts"];
    let check_args = [&args[..], &["--check"][..]].concat();

    let out = abibridge(&check_args, dir.path());
    assert!(!out.status.success());
    assert!(stderr(&out).contains("generated output differs"));

    let out = abibridge(&args, dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let written = std::fs::read_to_string(dir.path().join("types/token.ts")).unwrap();

    let out = abibridge(&check_args, dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    std::fs::write(dir.path().join("types/token.ts"), format!("{written}// edited\n")).unwrap();
    let out = abibridge(&check_args, dir.path());
    assert!(!out.status.success());
}

#[test]
fn generate_fails_closed_on_dangling_references() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("broken.abi"),
        r#"{"structs": [{"name": "row", "base": "", "fields": [{"name": "x", "type": "nosuchtype"}]}]}"#,
    )
    .unwrap();

    let out = abibridge(&["generate", "--abi", "broken.abi"], dir.path());
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("ABB0120"), "stderr: {}", stderr(&out));
}

#[test]
fn batch_keeps_going_past_a_bad_abi() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("contracts/token")).unwrap();
    std::fs::write(root.join("contracts/token/token.abi"), TOKEN_ABI).unwrap();
    std::fs::write(root.join("contracts/bad.abi"), "{ not json").unwrap();
    std::fs::write(
        root.join("abibridge.json"),
        r#"{"schema_version": "abibridge.config@0.1.0", "abi_root": "contracts", "out_dir": "types"}"#,
    )
    .unwrap();

    let out = abibridge(&["batch", "--report-json"], root);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("1 contract(s) failed to generate"));

    let report: Value = serde_json::from_str(&stdout(&out)).expect("report JSON");
    assert_eq!(report["schema_version"], "abibridge.batch.report@0.1.0");
    assert_eq!(report["ok"], false);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["entries"][0]["abi"], "bad.abi");
    assert_eq!(report["entries"][0]["status"], "failed");
    assert!(report["entries"][0]["error"]
        .as_str()
        .unwrap()
        .contains("ABB0001"));
    assert_eq!(report["entries"][1]["abi"], "token/token.abi");
    assert_eq!(report["entries"][1]["status"], "written");
    assert!(root.join("types/token/token.ts").is_file());
    assert!(!root.join("types/bad.ts").exists());

    std::fs::remove_file(root.join("contracts/bad.abi")).unwrap();
    let out = abibridge(&["batch", "--check"], root);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("token/token.abi"));
}

#[test]
fn diagnostics_lists_the_code_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let out = abibridge(&["diagnostics"], dir.path());
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("ABB0001"));
    assert!(text.contains("ABB0120"));
}
