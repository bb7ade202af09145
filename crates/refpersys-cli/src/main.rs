//! `refpersys`: the thin command-line shell the core exports to (spec §6).
//! Argument parsing itself is an out-of-scope external collaborator per
//! spec §1; this binary only turns parsed flags into calls against
//! `refpersys-core`/`refpersys-payload`/`refpersys-persist`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use refpersys_core::log::{LogLevel, Logger};
use refpersys_core::object::Runtime;
use refpersys_payload::PayloadRegistry;

const MIN_THREADS: u32 = 1;
const MAX_THREADS: u32 = 256;

/// The reflexive, persistent object system.
#[derive(Debug, Parser)]
#[command(name = "refpersys", about = "The RefPerSys reflexive object system", disable_version_flag = true)]
struct Cli {
    /// Load a heap from this directory before doing anything else.
    #[arg(short = 'L', long = "load-directory", value_name = "DIR")]
    load_directory: Option<PathBuf>,

    /// Dump the (possibly just-loaded) heap to this directory before exiting.
    #[arg(short = 'D', long = "dump", value_name = "DIR")]
    dump_directory: Option<PathBuf>,

    /// Run without a GUI. The default, since no GUI frontend is built into
    /// this binary (spec §1: the GUI is an out-of-scope external
    /// collaborator).
    #[arg(short = 'B', long = "batch")]
    batch: bool,

    /// Request the GTK GUI frontend. Not available in this build.
    #[arg(short = 'G', long = "gui")]
    gui: bool,

    /// Worker thread count, clamped to [1, 256].
    #[arg(short = 'T', long = "nb-threads", value_name = "N")]
    nb_threads: Option<u32>,

    /// Comma-separated component tags to log at debug level during load.
    #[arg(long = "debug-load", value_name = "FLAGS")]
    debug_load: Option<String>,

    /// Comma-separated component tags to log at debug level after load.
    #[arg(long = "debug-after", value_name = "FLAGS")]
    debug_after: Option<String>,

    /// Print the version banner and exit.
    #[arg(long = "version")]
    version: bool,

    /// List the registered payload kinds and the builtin class roots, then exit.
    #[arg(long = "show-types")]
    show_types: bool,

    /// Print the recognized `--debug-load`/`--debug-after` component tags and exit.
    #[arg(long = "debug-help")]
    debug_help: bool,
}

/// Flags parsed into a `RuntimeConfig` the rest of the process consumes,
/// per SPEC_FULL.md §10.3; there is no separate config file.
struct RuntimeConfig {
    load_directory: Option<PathBuf>,
    dump_directory: Option<PathBuf>,
    gui: bool,
    nb_threads: u32,
    debug_components: Vec<String>,
}

const KNOWN_DEBUG_COMPONENTS: &[&str] = &["persist", "oid", "object", "registry", "value"];

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("refpersys {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    if cli.debug_help {
        println!("recognized --debug-load/--debug-after component tags:");
        for tag in KNOWN_DEBUG_COMPONENTS {
            println!("  {tag}");
        }
        return ExitCode::SUCCESS;
    }

    let logger = Logger::stderr();
    let config = match build_config(&cli, &logger) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("refpersys: {message}");
            return ExitCode::FAILURE;
        }
    };

    if config.gui {
        eprintln!("refpersys: the GTK GUI frontend is not built into this binary; pass --batch instead");
        return ExitCode::FAILURE;
    }

    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let rt = Runtime::new();

    if let Some(dir) = &config.load_directory {
        let load_logger = logger_for(&config.debug_components, "persist");
        if let Err(err) = refpersys_persist::load_heap(dir, &rt, &load_logger) {
            eprintln!("refpersys: failed to load heap from {dir:?}: {err}");
            return ExitCode::FAILURE;
        }
    }

    if cli.show_types {
        print_types(&registry, &rt);
    }

    if let Some(dir) = &config.dump_directory {
        let dump_logger = logger_for(&config.debug_components, "persist");
        if let Err(err) = refpersys_persist::dump_heap(dir, &rt, &registry, &dump_logger) {
            eprintln!("refpersys: failed to dump heap to {dir:?}: {err}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn build_config(cli: &Cli, logger: &Logger) -> Result<RuntimeConfig, String> {
    let nb_threads = match cli.nb_threads {
        Some(n) if n < MIN_THREADS || n > MAX_THREADS => {
            let clamped = n.clamp(MIN_THREADS, MAX_THREADS);
            logger.log(
                LogLevel::Warn,
                "cli",
                format!("--nb-threads {n} is out of range [{MIN_THREADS}, {MAX_THREADS}]; clamped to {clamped}"),
            );
            clamped
        }
        Some(n) => n,
        None => 1,
    };

    let mut debug_components: Vec<String> = Vec::new();
    for flags in [&cli.debug_load, &cli.debug_after].into_iter().flatten() {
        debug_components.extend(flags.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string));
    }

    Ok(RuntimeConfig {
        load_directory: cli.load_directory.clone(),
        dump_directory: cli.dump_directory.clone(),
        gui: cli.gui,
        nb_threads,
        debug_components,
    })
}

/// Builds a logger at `Debug` level when `component` was named on
/// `--debug-load`/`--debug-after`, `Info` otherwise (SPEC_FULL.md §10.2).
fn logger_for(debug_components: &[String], component: &str) -> Logger {
    let level = if debug_components.iter().any(|c| c == component) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    Logger::new(Box::new(std::io::stderr()), level)
}

fn print_types(registry: &PayloadRegistry, rt: &Runtime) {
    println!("object-class: {}", rt.object_class().id().encode());
    println!("class-class: {}", rt.class_class().id().encode());
    println!("registered payload kinds:");
    for kind in registry.registered_kinds() {
        println!("  {kind:?}");
    }
}
