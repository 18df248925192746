//! Binary entry point for the `derdump` command-line tool.
//!
//! Reads one DER file (or stdin) and prints its TLV structure as an
//! indented tree.  All parsing happens in the library; this file only
//! handles argument parsing and I/O.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use derpack::dump::dump;

#[derive(Parser)]
#[command(
    name = "derdump",
    version,
    about = "Print the TLV structure of a DER encoding"
)]
struct Args {
    /// DER file to inspect; omit or pass "-" to read stdin.
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = match &args.file {
        Some(path) if path.as_os_str() != "-" => {
            fs::read(path).with_context(|| format!("cannot read {}", path.display()))?
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("cannot read stdin")?;
            buf
        }
    };
    let text = dump(&bytes).context("input is not well-formed DER")?;
    print!("{text}");
    Ok(())
}
