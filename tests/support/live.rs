// ABOUTME: Settings for tests against a real SSH server.
// ABOUTME: Enabled by TETHER_TEST_SSH=user@host:port and TETHER_TEST_PASSWORD.

use tether::config::{ConnectionConfig, EnvValue, HostConfig};

pub const TARGET_VAR: &str = "TETHER_TEST_SSH";
pub const PASSWORD_VAR: &str = "TETHER_TEST_PASSWORD";
pub const KEY_VAR: &str = "TETHER_TEST_KEY";

/// Connection settings for the live server, or `None` to skip.
///
/// A key in `TETHER_TEST_KEY` takes precedence over the password.
pub fn live_config() -> Option<ConnectionConfig> {
    let target = std::env::var(TARGET_VAR).ok()?;
    let mut host: HostConfig = target.parse().expect("TETHER_TEST_SSH must be user@host:port");
    match std::env::var(KEY_VAR) {
        Ok(key) => host.private_key = Some(key),
        Err(_) => {
            host.password = Some(EnvValue::FromEnv {
                var: PASSWORD_VAR.to_string(),
                default: None,
            })
        }
    }
    host.trust_first_connection = true;
    Some(host.connection_config().expect("live server settings should be valid"))
}
