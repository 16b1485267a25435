//! Seamless RPC command line.
//!
//! `serve` hosts the sample application behind the RPC endpoint, `generate`
//! scans a source tree and writes bindings, and `watch` keeps them current.

mod api;
mod call_log;
mod generated;
mod handler;
mod server;
mod store;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use seamless_compiler::{CompilerConfig, GeneratorOptions, ScanOptions};
use seamless_core::{CallContext, Dispatcher, FunctionRegistry, ServerConfig};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use store::Store;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "seamless-rpc")]
#[command(about = "Development server and binding generator for seamless RPC")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the sample application
    Serve(ServeArgs),
    /// Scan sources and write bindings once
    Generate(GenerateArgs),
    /// Write bindings, then rewrite them whenever sources change
    Watch(GenerateArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Include server diagnostics in error responses
    #[arg(long)]
    diagnostics: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Source root to scan
    #[arg(long)]
    root: PathBuf,

    /// Directory that receives the generated files
    #[arg(long)]
    out: PathBuf,

    /// Root-relative path to scan; repeat for several (default: everything)
    #[arg(long)]
    include: Vec<PathBuf>,

    /// Fail when any module or annotation cannot be read
    #[arg(long)]
    strict: bool,

    /// Rust path of the source root inside the server crate
    #[arg(long, default_value = CompilerConfig::DEFAULT_SERVER_MODULE_ROOT)]
    server_module: String,

    /// Crate path of the runtime in generated code
    #[arg(long, default_value = CompilerConfig::DEFAULT_CORE_CRATE)]
    core_crate: String,

    /// Module exporting the named types used by client stubs and contracts
    #[arg(long)]
    shared_types: Option<String>,

    /// Type name accepted without a declaration in the scanned sources
    #[arg(long = "known-type")]
    known_types: Vec<String>,
}

impl GenerateArgs {
    fn scan_options(&self) -> ScanOptions {
        let mut scan = ScanOptions::new().with_fail_on_error(self.strict);
        for path in &self.include {
            scan = scan.with_include(path.clone());
        }
        for name in &self.known_types {
            scan = scan.with_known_type(name.clone());
        }
        scan
    }

    fn generator_options(&self) -> GeneratorOptions {
        let options = GeneratorOptions::new()
            .with_core_crate(self.core_crate.clone())
            .with_server_module_root(self.server_module.clone());
        match &self.shared_types {
            Some(path) => options.with_shared_types_path(path.clone()),
            None => options,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Generate(args) => generate(args),
        Command::Watch(args) => watch(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    info!("Starting seamless RPC development server");

    let registry = Arc::new(FunctionRegistry::new());
    generated::server_routes::register_functions(&registry);
    info!("Registered {} function(s)", registry.len());

    let config = ServerConfig::new().with_diagnostics(args.diagnostics);
    let dispatcher = Arc::new(Dispatcher::new(registry, config));
    let context = CallContext::new(Arc::new(Store::seeded()));
    let state = Arc::new(AppState::new(dispatcher, context));

    let addr = server::start_server(state, &args.host, args.port).await?;

    // Read by tooling that spawns the server on an auto-assigned port
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
    let report = seamless_compiler::compile(
        &args.root,
        &args.out,
        &args.scan_options(),
        &args.generator_options(),
    )?;
    for error in &report.errors {
        warn!("{}", error);
    }
    info!(
        "{} function(s): {} file(s) written, {} unchanged",
        report.functions.len(),
        report.written.len(),
        report.unchanged.len()
    );
    Ok(())
}

async fn watch(args: GenerateArgs) -> Result<()> {
    let (report, watcher) = seamless_compiler::watch(
        &args.root,
        &args.out,
        args.scan_options(),
        args.generator_options(),
        CompilerConfig::WATCH_DEBOUNCE,
    )?;
    for error in &report.errors {
        warn!("{}", error);
    }
    info!(
        "Watching {} ({} function(s) bound)",
        args.root.display(),
        report.functions.len()
    );

    tokio::signal::ctrl_c().await?;
    watcher.stop();
    info!("Shutdown signal received, exiting");
    Ok(())
}
