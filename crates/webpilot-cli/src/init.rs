//! `webpilot init`: write the default configuration and an editable system prompt.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use webpilot_agent::context::DEFAULT_SYSTEM_PROMPT;
use webpilot_core::config::{save_config, Config};
use webpilot_core::utils::get_data_path;

const PROMPT_FILE: &str = "system_prompt.txt";

/// Run the init command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "🧭 Webpilot Setup".cyan().bold());
    println!();

    setup(&get_data_path())?;

    println!();
    println!(
        "{}",
        "  Setup complete! Add an API key, then run `webpilot run`.".green()
    );
    println!();

    Ok(())
}

/// Create `config.json` and the prompt file under `data_dir`, keeping existing ones.
fn setup(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let prompt_path = data_dir.join(PROMPT_FILE);
    create_template(&prompt_path, DEFAULT_SYSTEM_PROMPT)?;

    let config_path = data_dir.join("config.json");
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        let mut config = Config::default();
        config.agent.system_prompt_path = Some(prompt_path.to_string_lossy().into_owned());
        save_config(&config, Some(&config_path))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    }

    Ok(())
}

/// Create a template file if it doesn't exist.
fn create_template(path: &Path, content: &str) -> Result<()> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    if path.exists() {
        println!("  {} {} already exists", "✓".green(), name);
    } else {
        std::fs::write(path, content)?;
        println!("  {} created {}", "✓".green(), name);
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_core::config::load_config;

    #[test]
    fn create_template_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "original").unwrap();
        create_template(&path, "new content").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn setup_writes_config_pointing_at_prompt() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path()).unwrap();

        let prompt = dir.path().join(PROMPT_FILE);
        assert_eq!(std::fs::read_to_string(&prompt).unwrap(), DEFAULT_SYSTEM_PROMPT);

        let config = load_config(Some(&dir.path().join("config.json")));
        assert_eq!(
            config.agent.system_prompt_path.as_deref(),
            Some(prompt.to_string_lossy().as_ref())
        );
        assert_eq!(config.agent.max_iterations, 50);
    }

    #[test]
    fn setup_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"agent":{"model":"deepseek-chat"}}"#).unwrap();
        setup(dir.path()).unwrap();
        assert!(std::fs::read_to_string(&config_path)
            .unwrap()
            .contains("deepseek-chat"));
    }
}
