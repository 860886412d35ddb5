//! QTJIR command-line tools.
//!
//! Provides the `qtjir` binary with subcommands that exercise the
//! validator, the standard rewrite pipeline, and the LLVM emitter without
//! reimplementing a frontend: `validate` and `emit` operate on a graph
//! serialized to JSON, and `demo` builds one of a handful of seed graphs
//! in-process via `GraphBuilder`.

mod demo;
mod error;

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use qtjir_core::{ExternRegistry, Graph};

use error::CliError;

/// QTJIR graph tools.
#[derive(Parser)]
#[command(name = "qtjir", about = "QTJIR graph validator, rewriter, and LLVM emitter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the standard validation rules over a graph and report findings.
    Validate {
        /// Path to a graph serialized as JSON.
        graph: PathBuf,
    },
    /// Run the standard rewrite pipeline, then emit LLVM textual IR.
    Emit {
        /// Path to a graph serialized as JSON.
        graph: PathBuf,

        /// Where to write the emitted IR (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build one of the built-in seed graphs and emit it, for smoke-testing
    /// the pipeline without a frontend. Scenarios: hello, arith, branch,
    /// tensor.
    Demo {
        /// Scenario name.
        scenario: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Validate { graph } => run_validate(&graph),
        Commands::Emit { graph, output } => run_emit(&graph, output),
        Commands::Demo { scenario } => run_demo(&scenario),
    };
    process::exit(exit_code);
}

fn load_graph(path: &PathBuf) -> Result<Graph, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.clone(),
        source,
    })
}

/// Exit code: 0 = no errors (warnings allowed), 1 = I/O or parse failure,
/// 2 = validation found errors.
fn run_validate(path: &PathBuf) -> i32 {
    let graph = match load_graph(path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let result = qtjir_check::validate(&graph);
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }

    if result.has_errors() {
        let count = result.errors().count();
        eprintln!("Error: {}", CliError::ValidationFailed(count));
        2
    } else {
        0
    }
}

/// Exit code: 0 = success, 1 = I/O, parse, or codegen failure.
fn run_emit(path: &PathBuf, output: Option<PathBuf>) -> i32 {
    let mut graph = match load_graph(path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    qtjir_transform::standard_pass_manager().run(&mut graph);

    let externs = ExternRegistry::new();
    match qtjir_codegen::emit(&[graph], &externs) {
        Ok(module) => write_ir(&module.to_string(), output),
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            1
        }
    }
}

fn run_demo(scenario: &str) -> i32 {
    let graphs = match demo::build(scenario) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    for graph in &graphs {
        let result = qtjir_check::validate(graph);
        for diagnostic in result.errors() {
            eprintln!("Error: {diagnostic}");
        }
        if result.has_errors() {
            return 2;
        }
    }

    let mut graphs = graphs;
    for graph in &mut graphs {
        qtjir_transform::standard_pass_manager().run(graph);
    }

    let externs = ExternRegistry::new();
    match qtjir_codegen::emit(&graphs, &externs) {
        Ok(module) => write_ir(&module.to_string(), None),
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            1
        }
    }
}

fn write_ir(ir: &str, output: Option<PathBuf>) -> i32 {
    match output {
        Some(path) => match fs::write(&path, ir) {
            Ok(()) => 0,
            Err(source) => {
                eprintln!("Error: {}", CliError::Io { path, source });
                1
            }
        },
        None => {
            println!("{ir}");
            0
        }
    }
}
