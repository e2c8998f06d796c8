//! `ondemand clean` – remove stale staging files.

use anyhow::{Context, Result};
use ondemand_core::adapter::ArtifactKind;
use ondemand_core::config::OnDemandConfig;
use ondemand_core::storage;
use std::path::{Path, PathBuf};

pub fn run_clean(cfg: &OnDemandConfig, dir: Option<&Path>) -> Result<()> {
    let dirs: Vec<PathBuf> = match dir {
        Some(d) => vec![d.to_path_buf()],
        None => {
            let root = cfg.models_dir()?;
            ArtifactKind::ALL
                .iter()
                .map(|k| root.join(k.subdir()))
                .filter(|d| d.is_dir())
                .collect()
        }
    };

    let mut total = 0;
    for d in &dirs {
        let n = storage::remove_stale_parts(d)
            .with_context(|| format!("cleaning {}", d.display()))?;
        if n > 0 {
            println!("{}: removed {} staging file(s)", d.display(), n);
        }
        total += n;
    }
    if total == 0 {
        println!("No staging files found.");
    }
    Ok(())
}
