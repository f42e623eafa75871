//! Command-line front end: builds WBXML trees from XML files and prints them.
//!
//! Mostly useful to check how a document will be seen by the encoder: which
//! language table it resolves to, which parts are elided into embedded
//! documents, and where CDATA sections get recovered.

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use wbxml_tree::parser::{self, ParseOptions, DEFAULT_MAX_EMBED_DEPTH};
use wbxml_tree::serial::{dump, serialize_with_options, SerializeOptions};
use wbxml_tree::Tree;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// wbxml-tree -- build WBXML document trees from XML.
#[derive(Parser, Debug)]
#[command(name = "wbxml-tree", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// XML files to process (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    // -- Tree building -----------------------------------------------------
    /// Element to elide and parse as an embedded document (repeatable;
    /// replaces the default `DevInf`).
    #[arg(long = "elide", value_name = "TAG")]
    elide: Vec<String>,

    /// Keep undelimited SyncML payloads as plain text.
    #[arg(long)]
    no_cdata_recovery: bool,

    /// Maximum nesting of embedded documents.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_EMBED_DEPTH)]
    max_embed_depth: u32,

    // -- Output ------------------------------------------------------------
    /// Print the node outline instead of XML.
    #[arg(long)]
    format: bool,

    /// Do not output the result tree.
    #[arg(long)]
    noout: bool,

    /// Print timing information for reading and building.
    #[arg(long)]
    timing: bool,
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = build_options(&cli);

    let mut worst_exit = EXIT_SUCCESS;
    for file in &cli.files {
        worst_exit = worst_exit.max(process_file(&cli, &options, file));
    }
    ExitCode::from(worst_exit)
}

fn build_options(cli: &Cli) -> ParseOptions {
    let mut options = ParseOptions::default()
        .recover_cdata(!cli.no_cdata_recovery)
        .max_embed_depth(cli.max_embed_depth);
    if !cli.elide.is_empty() {
        options = options.elidable_tags(cli.elide.iter().cloned());
    }
    options
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, options: &ParseOptions, filename: &str) -> u8 {
    let start_read = Instant::now();
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_FAILURE;
        }
    };
    if cli.timing {
        eprintln!("Reading file {filename} took {:?}", start_read.elapsed());
    }

    let start_build = Instant::now();
    let tree = match parser::parse_bytes_with_options(&input, options) {
        Ok(tree) => tree,
        Err(e) => {
            for diag in &e.diagnostics {
                eprintln!("{filename}: {diag}");
            }
            eprintln!("{filename}: {e}");
            return EXIT_FAILURE;
        }
    };
    if cli.timing {
        eprintln!("Building tree took {:?}", start_build.elapsed());
    }

    for diag in &tree.diagnostics {
        eprintln!("{filename}: {diag}");
    }

    if !cli.noout {
        let output = render(cli, &tree);
        if let Err(e) = io::stdout().write_all(output.as_bytes()) {
            eprintln!("{filename}: failed to write output: {e}");
            return EXIT_FAILURE;
        }
    }

    EXIT_SUCCESS
}

fn render(cli: &Cli, tree: &Tree) -> String {
    if cli.format {
        dump(tree)
    } else {
        serialize_with_options(tree, &SerializeOptions::default())
    }
}

/// Reads input from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}
