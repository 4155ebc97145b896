use std::fs;

use anyhow::{Context as _, Result, bail};
use shared::config::client::ClientConfig;

/// Writes a default configuration file in the requested format to the
/// current directory.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str) -> Result<()> {
    let (file_name, serialized) = render_default(format)?;
    fs::write(file_name, serialized)
        .with_context(|| format!("failed to write configuration file '{file_name}'"))?;

    println!("Configuration file '{file_name}' generated successfully.");
    Ok(())
}

fn render_default(format: &str) -> Result<(&'static str, String)> {
    let config = ClientConfig::with_defaults();
    Ok(match format {
        "yaml" | "yml" => ("config.yaml", serde_yml::to_string(&config)?),
        "json" => ("config.json", serde_json::to_string_pretty(&config)?),
        "toml" => ("config.toml", toml::to_string_pretty(&config)?),
        _ => bail!("Unsupported format. Use 'yaml', 'json' or 'toml'."),
    })
}
