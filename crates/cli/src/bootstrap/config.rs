use anyhow::Context;
use rdns_domain::{CliOverrides, Config};

/// Runs before logging is initialised; errors surface through `main`.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides).context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
