//! `ondemand checksum` – SHA-256 of a file.

use anyhow::{Context, Result};
use ondemand_core::checksum;
use std::path::Path;

pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha256_path(path)
        .with_context(|| format!("reading {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
