use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    app::{init_config, Config},
    pipeline::{BindingTable, ComponentTemplate, Pipeline, RemotePipeline},
    proxy::{is_proxy_running, serve},
};

use super::Commands;

/// Handle CLI subcommands
pub async fn handle_command(
    command: &Commands,
    config: Config,
    config_path: Option<PathBuf>,
) -> Result<()> {
    match command {
        Commands::Serve => serve(config).await,
        Commands::Init { force } => {
            let path = init_config(config_path, *force)?;
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        Commands::Status => show_status(&config).await,
        Commands::Template { json } => show_template(&config, *json),
    }
}

/// Show whether the proxy and the pipeline answer
pub async fn show_status(config: &Config) -> Result<()> {
    println!("chat-relay status:");
    println!();

    let local = config.server.local_url();
    if is_proxy_running(&local).await {
        println!("  [{}] Proxy: Running at {}", "OK".green(), local);
    } else {
        println!("  [{}] Proxy: Not running at {}", "ERROR".red(), local);
    }

    let pipeline = RemotePipeline::from_config(&config.pipeline)?;
    if pipeline.is_reachable().await {
        println!(
            "  [{}] Pipeline: Reachable at {}",
            "OK".green(),
            config.pipeline.base_url
        );
    } else {
        println!(
            "  [{}] Pipeline: Unreachable at {}",
            "ERROR".red(),
            config.pipeline.base_url
        );
    }
    println!("      • Run URL: {}", pipeline.run_url());
    println!("      • Timeout: {}s", config.pipeline.timeout().as_secs());

    match &config.pipeline.template_path {
        Some(path) => println!("  Template: {}", path.display()),
        None => println!("  Template: bundled"),
    }
    println!("  Session policy: {:?}", config.session.policy);

    println!();
    Ok(())
}

/// Print the template and the fields bound per request
pub fn show_template(config: &Config, json: bool) -> Result<()> {
    let template = match &config.pipeline.template_path {
        Some(path) => ComponentTemplate::from_path(path)?,
        None => ComponentTemplate::builtin()?,
    };
    let bindings = if config.bindings.is_empty() {
        BindingTable::standard()
    } else {
        BindingTable::new(config.bindings.clone())
    };

    let validation = bindings.validate(&template);

    if json {
        let dump = serde_json::to_string_pretty(&template.instantiate())
            .context("Failed to render template")?;
        println!("{}", dump);
        return validation.map_err(Into::into);
    }

    println!("Components ({}):", template.len());
    for name in template.component_names() {
        println!("  • {}", name);
    }

    println!();
    println!("Bindings ({}):", bindings.len());
    for binding in bindings.bindings() {
        println!(
            "  {} {}.{} <- {:?}",
            format!("{:<14}", binding.role.as_str()).cyan(),
            binding.component,
            binding.path,
            binding.source
        );
    }

    println!();
    match validation {
        Ok(()) => println!("  [{}] Bindings match the template", "OK".green()),
        Err(err) => println!("  [{}] {}", "ERROR".red(), err),
    }

    Ok(())
}
