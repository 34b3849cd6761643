use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "A tree-walking interpreter for the Monkey language")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a source file and print its result
    Run {
        /// Path to the source file
        file: PathBuf,

        /// Stop evaluation after this many steps
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Check a source file for syntax errors
    Check {
        /// Path to the source file to check
        file: PathBuf,

        /// Print the token stream
        #[arg(long)]
        tokens: bool,
    },

    /// Start an interactive REPL session
    Repl {
        /// Stop each evaluation after this many steps
        #[arg(long)]
        max_steps: Option<usize>,
    },
}
