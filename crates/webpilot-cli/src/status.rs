//! `webpilot status`: show configuration, model, provider keys and browser settings.

use anyhow::Result;
use colored::Colorize;

use webpilot_core::config::{get_config_path, load_config};
use webpilot_providers::registry::match_provider;
use webpilot_providers::PROVIDERS;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "🧭 Webpilot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, run `webpilot init`)".red().to_string()
        }
    );

    // Model
    let providers_map = config.providers.to_map();
    let resolved = match match_provider(&config.agent.model, &providers_map) {
        Some((_, spec)) => format!("via {}", spec.display_name).green().to_string(),
        None => "no configured provider".red().to_string(),
    };
    println!(
        "  {:<18} {} ({})",
        "Model:".bold(),
        config.agent.model,
        resolved
    );
    println!(
        "  {:<18} {} | {} | {}",
        "Loop:".bold(),
        format!("max_iterations: {}", config.agent.max_iterations).dimmed(),
        format!("context: {} messages", config.agent.max_context_messages).dimmed(),
        format!("temp: {}", config.agent.temperature).dimmed(),
    );

    // Providers
    println!();
    println!("  {}", "Providers:".bold());
    for spec in PROVIDERS {
        let status = match providers_map.get(spec.name) {
            Some(c) if c.is_configured() => format!("{} (key set)", "✓".green()),
            _ => format!("{}", "· not configured".dimmed()),
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    // Browser
    let browser = &config.browser;
    println!();
    println!("  {}", "Browser:".bold());
    println!(
        "    {:<20} {}",
        "Mode",
        if browser.headless { "headless" } else { "windowed" }
    );
    println!(
        "    {:<20} {}",
        "Executable",
        browser
            .executable_path
            .as_deref()
            .unwrap_or("auto-detect")
    );
    println!(
        "    {:<20} {}ms element / {}ms navigation",
        "Timeouts", browser.action_timeout_ms, browser.navigation_timeout_ms
    );

    println!();

    Ok(())
}
