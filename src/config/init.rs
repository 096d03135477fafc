// ABOUTME: Inventory scaffolding for new projects.
// ABOUTME: Creates a commented tether.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, host: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::Configuration(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    let yaml = generate_template_yaml(host.unwrap_or("server.example.com"));
    std::fs::write(&config_path, yaml)
        .map_err(|e| Error::io(config_path.display().to_string(), e))?;

    Ok(())
}

fn generate_template_yaml(host: &str) -> String {
    format!(
        r#"hosts:
  default:
    host: {host}
    port: 22
    username: deploy
    # Exactly one of password or private_key.
    password:
      env: TETHER_PASSWORD
    # private_key: ~/.ssh/id_ed25519
    # passphrase:
    #   env: TETHER_KEY_PASSPHRASE
    compression: false
    auth_timeout: 10s
    io_timeout: 30s
    command_timeout: 1h
    # SSH host key verification (default: false for security)
    # Set to true to enable Trust-On-First-Use, or pre-populate ~/.ssh/known_hosts
    # trust_first_connection: true
"#
    )
}
