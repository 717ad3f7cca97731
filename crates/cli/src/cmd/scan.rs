//! List an extracted image root as an inventory

use crate::util;
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

pub async fn run(root: &Path, include_files: bool) -> Result<()> {
    let inventory = util::load_inventory(None, Some(root), include_files)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for path in &inventory {
        writeln!(out, "{}", path)?;
    }
    out.flush().context("Failed to write inventory")?;

    util::print_stat("inventory size", inventory.len());
    Ok(())
}
