use std::io::Write as _;
use std::path::{Path, PathBuf};

use abibridge_contracts::DEFAULT_RUNTIME_MODULE;
use abibridge_core::EmitOptions;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod batch;
mod config;
mod output;

use output::SyncOutcome;

#[derive(Parser, Debug)]
#[command(name = "abibridge")]
#[command(about = "Typed TypeScript bindings from contract ABIs.", long_about = None)]
struct Cli {
    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate bindings for one ABI file.
    Generate {
        #[arg(long)]
        abi: PathBuf,
        /// Interface name; defaults to the PascalCase file stem.
        #[arg(long)]
        contract_name: Option<String>,
        /// Output file. Without it the bindings go to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_RUNTIME_MODULE)]
        runtime_module: String,
        /// Omit the source ABI hash line from the header.
        #[arg(long, default_value_t = false)]
        no_source_hash: bool,
        /// If set, fail if output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Generate bindings for every ABI selected by a config file.
    Batch {
        /// Defaults to ./abibridge.json, or built-in defaults when absent.
        #[arg(long)]
        config: Option<PathBuf>,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        report_json: bool,
    },
    /// Print the diagnostic code catalog as Markdown.
    Diagnostics,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Generate {
            abi,
            contract_name,
            out,
            runtime_module,
            no_source_hash,
            check,
        } => run_generate(
            &abi,
            contract_name,
            out.as_deref(),
            runtime_module,
            !no_source_hash,
            check,
        ),
        Command::Batch {
            config,
            check,
            report_json,
        } => run_batch(config.as_deref(), check, report_json),
        Command::Diagnostics => write_stdout(&abibridge_core::diagnostics::render_diagnostics_md()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(
    abi: &Path,
    contract_name: Option<String>,
    out: Option<&Path>,
    runtime_module: String,
    embed_source_hash: bool,
    check: bool,
) -> Result<()> {
    let contract_name = contract_name.unwrap_or_else(|| output::contract_name_for(abi));
    let opts = EmitOptions {
        runtime_module,
        source_sha256: None,
    };
    let src = output::generate_file(abi, &contract_name, opts, embed_source_hash)?;

    let Some(out) = out else {
        if check {
            anyhow::bail!("--check needs --out to compare against");
        }
        return write_stdout(&src);
    };
    match output::sync_output(out, &src, check)? {
        SyncOutcome::Drift => anyhow::bail!("generated output differs: {}", out.display()),
        SyncOutcome::Written | SyncOutcome::Unchanged => Ok(()),
    }
}

fn run_batch(config_path: Option<&Path>, check: bool, report_json: bool) -> Result<()> {
    let cfg = config::Config::load(config_path)?;
    let report = batch::run_batch(&cfg, check)?;
    let text = if report_json {
        batch::render_json(&report)?
    } else {
        batch::render_text(&report)
    };
    write_stdout(&text)?;
    if let Some(summary) = batch::failure_summary(&report) {
        anyhow::bail!(summary);
    }
    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes()).context("write stdout")?;
    stdout.flush().context("flush stdout")
}
