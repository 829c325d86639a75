//! `jpbp` - apply a JSON Patch operation to every location selected by a JSONPath expression.
//!
//! Usage:
//!   jpbp -j '<json>' -p '<jsonPath>' -o <operation> [-v '<value>']
//!
//! `-j -` reads the document from stdin. See `jpbp --help` for every option.

use clap::Parser;
use jpbp::cli::{self, Cli};
use std::io::{self, Read, Write};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if cli.reads_stdin() {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        cli.json = buf;
    }

    match cli::run(&cli) {
        Ok(output) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{output}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
