//! `ondemand list` – show the static catalog.

use anyhow::{bail, Result};
use ondemand_core::catalog::{load_static_catalog, static_catalog_path};
use ondemand_core::config::OnDemandConfig;

pub fn run_list(cfg: &OnDemandConfig, category: Option<&str>) -> Result<()> {
    let path = static_catalog_path(cfg)?;
    let catalogs = load_static_catalog(&path);

    match category {
        None => {
            println!("{:<20} {}", "CATEGORY", "ENTRIES");
            for key in catalogs.categories() {
                let len = catalogs.get(key).map_or(0, |c| c.len());
                println!("{:<20} {}", key, len);
            }
        }
        Some(key) => {
            let Some(catalog) = catalogs.get(key) else {
                bail!("unknown category '{}' in {}", key, path.display());
            };
            for name in catalog.names() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
