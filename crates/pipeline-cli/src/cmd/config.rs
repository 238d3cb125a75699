use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use pipeline_core::config::EngineConfig;
use pipeline_core::paths;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to .pipeline/config.yaml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Init { force } => init(root, force, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = EngineConfig::load(root).context("failed to load pipeline config")?;
    if json {
        return print_json(&config);
    }
    let yaml = serde_yaml::to_string(&config)?;
    print!("{yaml}");
    Ok(())
}

fn init(root: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    let existed = path.exists();
    if existed && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    EngineConfig::default()
        .save(root)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "overwritten": existed,
        }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
