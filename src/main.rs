//! # TempleCode
//!
//! BASIC, PILOT and Logo turtle graphics in one language.
//!

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use templecode::mach::Config;
use templecode::term::{self, RunOptions};

#[derive(Parser)]
#[command(name = "templecode", version, about = "Run TempleCode programs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program file
    Run {
        file: String,
        /// Trace every line and keep going after errors
        #[arg(long)]
        debug: bool,
        /// Report the elapsed time
        #[arg(long)]
        time: bool,
        /// Print per-line hit counts and timings
        #[arg(long)]
        profile: bool,
        #[arg(long, default_value_t = Config::default().max_iterations)]
        max_iterations: usize,
    },
    /// Start the interactive prompt
    Repl {
        #[arg(long)]
        debug: bool,
    },
    /// Report unbalanced blocks
    Check { file: String },
    /// Re-indent a program by block structure
    Format {
        file: String,
        /// Rewrite the file instead of printing
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command.unwrap_or(Command::Repl { debug: false }) {
        Command::Run {
            file,
            debug,
            time,
            profile,
            max_iterations,
        } => {
            let config = Config {
                max_iterations,
                ..Config::default()
            };
            let options = RunOptions {
                config,
                debug,
                time,
                profile,
            };
            term::run(&file, options).map(|errors| errors == 0)
        }
        Command::Repl { debug } => match term::repl(debug) {
            Ok(()) => Ok(true),
            Err(error) => {
                eprintln!("{}", error);
                Ok(false)
            }
        },
        Command::Check { file } => term::check(&file).map(|issues| issues == 0),
        Command::Format { file, write } => term::format(&file, write).map(|_| true),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("?{}", error);
            ExitCode::FAILURE
        }
    }
}
