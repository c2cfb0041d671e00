//! cellisp - line-oriented REPL and script runner
//!
//! Usage:
//!   cellisp                 # read from stdin; interactive on a TTY
//!   cellisp program.cl      # run a file non-interactively
//!
//! One expression per line; lines starting with `;` are comments. In
//! interactive mode each iteration prints a `cellisp> ` prompt and a
//! `-> <result>` line; both are suppressed when input comes from a file
//! or a pipe. A sweep of the cell arena runs after every iteration.

use std::fs::File;
use std::io::{BufRead, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cellisp_runtime::Interp;
use cellisp_runtime::printer::to_display_string;

#[derive(Parser)]
#[command(name = "cellisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A minimal Scheme interpreter on a cell arena", long_about = None)]
struct Cli {
    /// Source file to run (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Arena reservation in GiB; pages are committed on first touch
    #[arg(long, default_value_t = 70)]
    memory: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut interp = match Interp::new(cli.memory << 30) {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let code = match cli.file {
        Some(path) => run_file(&mut interp, &path),
        None if std::io::stdin().is_terminal() => run_interactive(&mut interp),
        None => run_stream(&mut interp, BufReader::new(std::io::stdin())),
    };
    process::exit(code);
}

/// One REPL iteration: read, eval, print (interactive only), sweep.
fn iteration(interp: &mut Interp, line: &str, interactive: bool) {
    let value = interp.eval_line(line);
    if interactive {
        println!("-> {}", to_display_string(&mut interp.heap, value));
    }
    let reclaimed = interp.collect();
    debug!(reclaimed, "iteration done");
}

fn run_file(interp: &mut Interp, path: &Path) -> i32 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}: {e}", path.display());
            return 1;
        }
    };
    run_stream(interp, BufReader::new(file))
}

fn run_stream(interp: &mut Interp, reader: impl BufRead) -> i32 {
    for line in reader.lines() {
        let Ok(line) = line else { return 1 };
        iteration(interp, &line, false);
    }
    0
}

fn run_interactive(interp: &mut Interp) -> i32 {
    println!(
        "cellisp {} started; {} cells free",
        env!("CARGO_PKG_VERSION"),
        interp.heap.free_cells()
    );
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: terminal setup failed: {e}");
            return 1;
        }
    };
    loop {
        match editor.readline("cellisp> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                iteration(interp, &line, true);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return 0,
            Err(e) => {
                eprintln!("error: {e}");
                return 1;
            }
        }
    }
}
