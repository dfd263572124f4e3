use anyhow::{Context, Result};
use keyring::Entry;
use std::io::{self, Write};

use crate::config::{config_path, FileConfig, APP_NAME, DEFAULT_API_URL, KEYRING_USER};

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

pub fn run() -> Result<()> {
    println!("Welcome to the sumoredrive configuration wizard!");
    println!("This wizard stores your search API credentials.");
    println!();

    let config_path = config_path().context("Could not determine configuration directory.")?;
    let mut file_config = FileConfig::read(&config_path)?;

    // 1. API URL
    let current_url = file_config.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = prompt(&format!("API URL [{}]: ", current_url))?;
    let api_url = if api_url.is_empty() { current_url } else { api_url };

    // 2. Access ID
    let access_id = prompt("Access ID: ")?;
    if access_id.is_empty() {
        anyhow::bail!("Access ID is required.");
    }

    // 3. Access key, hidden, kept out of the file when the keyring works
    print!("Access Key (hidden): ");
    io::stdout().flush()?;
    let access_key = rpassword::read_password()?.trim().to_string();

    // 4. Time zone
    let time_zone = prompt("Time zone [UTC]: ")?;

    // 5. Optional sink
    let sink_url = prompt("Sink queue URL (blank for none): ")?;

    println!();
    println!("Saving configuration...");

    let stored_in_keyring = Entry::new(APP_NAME, KEYRING_USER)
        .and_then(|entry| entry.set_password(&access_key))
        .is_ok();

    file_config.api_url = Some(api_url);
    file_config.access_id = Some(access_id);
    file_config.access_key = if stored_in_keyring {
        None
    } else {
        println!("Keyring unavailable; storing the access key in the config file.");
        Some(access_key)
    };
    if !time_zone.is_empty() {
        file_config.time_zone = Some(time_zone);
    }
    file_config.sink_url = if sink_url.is_empty() { None } else { Some(sink_url) };

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_string = toml::to_string(&file_config)?;
    std::fs::write(&config_path, toml_string)?;
    println!("Configuration saved to: {}", config_path.display());
    println!();
    println!("Setup complete!");
    Ok(())
}
