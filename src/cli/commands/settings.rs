//! Config file commands.

use std::path::{Path, PathBuf};

use crate::config::{self, Config};

/// Where `config init` writes: the `--config` path, else the OS default.
fn target_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the config directory; pass --config")),
    }
}

/// Write the effective configuration (file values plus flags) to disk
pub fn cmd_config_init(config: &Config, explicit: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = target_path(explicit)?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    config::save_to(config, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Print the effective configuration as TOML
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
