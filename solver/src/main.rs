//! Solve a space described as JSON and print the result.
//!
//! Usage:
//!   flowcover puzzle.json
//!   flowcover --backend search --timeout-ms 5000 --no-fill puzzle.json
//!   flowcover --graph-only puzzle.json
//!   cat puzzle.json | flowcover --json -
//!
//! Defaults come from `FLOWCOVER_*` variables (see [`SolverConfig::from_env`]); logs go to stderr, filtered by `RUST_LOG`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use flowcover::board;
use flowcover::config::SolverConfig;
use flowcover::{Backend, FlowError, SolveOptions, Space};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowcover")]
#[command(about = "Solve Flow Free and Numberlink puzzles on square, hex, circular and freeform boards")]
struct Args {
    /// Path to the space JSON, or `-` for stdin
    space: PathBuf,

    /// Solver backend: sat (alias smt) or search (alias dfs)
    #[arg(long, short = 'b')]
    backend: Option<Backend>,

    /// Deadline in milliseconds
    #[arg(long, short = 't')]
    timeout_ms: Option<u64>,

    /// Require every cell to be covered, whatever the space says
    #[arg(long, conflicts_with = "no_fill")]
    fill: bool,

    /// Allow cells to stay uncovered, whatever the space says
    #[arg(long)]
    no_fill: bool,

    /// Print the compiled graph instead of solving
    #[arg(long)]
    graph_only: bool,

    /// Print results and failures as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn options(&self, config: &SolverConfig) -> SolveOptions {
        let mut options = SolveOptions::from_config(config);
        if let Some(backend) = self.backend {
            options = options.with_backend(backend);
        }
        if let Some(ms) = self.timeout_ms {
            options = options.with_deadline(Duration::from_millis(ms));
        }
        if self.fill || self.no_fill {
            options = options.with_fill(self.fill);
        }
        options
    }
}

fn read_space(path: &Path) -> Result<Space, FlowError> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)
            .map_err(|err| FlowError::Config(format!("failed to read stdin: {err}")))?;
        text
    } else {
        std::fs::read_to_string(path)
            .map_err(|err| FlowError::Config(format!("failed to read {}: {err}", path.display())))?
    };
    tracing::debug!(path = %path.display(), bytes = text.len(), "read space");

    Space::from_json(&text)
}

fn run(args: &Args) -> Result<String, FlowError> {
    let config = SolverConfig::from_env()?;
    let space = read_space(&args.space)?;

    if args.graph_only {
        return Ok(serde_json::to_string_pretty(&flowcover::graph(&space)?)?);
    }

    let options = args.options(&config);
    options.validate_within(config.max_deadline_ms)?;
    let response = flowcover::solve(&space, &options)?;

    match (args.json, board::render(&space, Some(&response))) {
        (false, Ok(text)) => Ok(text),
        // freeform spaces have no text form
        _ => Ok(serde_json::to_string_pretty(&response)?),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(output) => {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(err) if args.json => {
            println!("{}", serde_json::to_string_pretty(&err.payload()).unwrap_or_else(|_| err.to_string()));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
