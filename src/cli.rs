//! Command-line surface of the `jpbp` binary
//!
//! ```text
//! jpbp -j <json> -p <jsonPath> -o <operation> [-v <value>] [--pretty] [--no-rebase] [--pointers]
//! ```
use crate::{Error, PatchEngine, PatchKind, PatchOptions, PatchRequest};
use clap::Parser;

/// Apply a JSON Patch operation to every location selected by a JSONPath expression
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "jpbp")]
#[command(version)]
pub struct Cli {
    /// Document to patch, `-` reads it from stdin
    #[arg(short, long, allow_hyphen_values = true)]
    pub json: String,

    /// JSONPath expression selecting the locations to patch
    #[arg(short = 'p', long = "jsonPath", allow_hyphen_values = true)]
    pub json_path: String,

    /// add, remove, replace, move, copy or test
    #[arg(short, long, required_unless_present = "pointers")]
    pub operation: Option<String>,

    /// JSON value of the operation (the `from` pointer for move and copy)
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub value: String,

    /// Pretty-print the patched document
    #[arg(long)]
    pub pretty: bool,

    /// Use every location exactly as matched in the input document
    #[arg(long)]
    pub no_rebase: bool,

    /// Print the JSON Pointer of every matched location instead of patching
    #[arg(long)]
    pub pointers: bool,
}

impl Cli {
    /// `true` when the document must be read from stdin
    #[inline]
    pub fn reads_stdin(&self) -> bool {
        self.json == "-"
    }

    #[inline]
    pub fn options(&self) -> PatchOptions {
        PatchOptions::default()
            .rebase_locations(!self.no_rebase)
            .pretty(self.pretty)
    }
}

/// Executes parsed arguments; `cli.json` must already hold the document text
/// # Return
/// The text to print on stdout
pub fn run(cli: &Cli) -> Result<String, Error> {
    let engine = PatchEngine::new(cli.options());

    if cli.pointers {
        let pointers = engine.pointers(&cli.json, &cli.json_path)?;
        return Ok(pointers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"));
    }

    let kind = cli
        .operation
        .as_deref()
        .unwrap_or_default()
        .parse::<PatchKind>()?;
    let request = PatchRequest::new(
        cli.json.as_str(),
        cli.json_path.as_str(),
        kind,
        cli.value.as_str(),
    );
    engine.apply(&request)
}
