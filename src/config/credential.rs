// ABOUTME: Authentication credential for a connection: password XOR private key.
// ABOUTME: Validates the loose inventory/CLI form into the typed Credential.

use super::EnvValue;
use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where private-key material comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// OpenSSH or PEM key file on the local machine.
    File(PathBuf),
    /// Key material held in memory.
    Inline(String),
}

/// Exactly one way to prove identity to the server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    PrivateKey {
        source: KeySource,
        passphrase: Option<String>,
    },
}

impl Credential {
    pub fn password(password: impl Into<String>) -> Self {
        Credential::Password(password.into())
    }

    pub fn key_file(path: impl Into<PathBuf>) -> Self {
        Credential::PrivateKey {
            source: KeySource::File(path.into()),
            passphrase: None,
        }
    }

    pub fn key_material(pem: impl Into<String>) -> Self {
        Credential::PrivateKey {
            source: KeySource::Inline(pem.into()),
            passphrase: None,
        }
    }

    /// Attach a passphrase to a private-key credential; ignored for passwords.
    pub fn with_passphrase(self, passphrase: impl Into<String>) -> Self {
        match self {
            Credential::PrivateKey { source, .. } => Credential::PrivateKey {
                source,
                passphrase: Some(passphrase.into()),
            },
            other => other,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::PrivateKey { .. } => "publickey",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::PrivateKey { source, .. } => match source {
                KeySource::File(path) => f.debug_tuple("PrivateKeyFile").field(path).finish(),
                KeySource::Inline(_) => f.write_str("PrivateKeyInline(<redacted>)"),
            },
        }
    }
}

/// Credential fields as they appear in an inventory entry or on the CLI.
#[derive(Debug, Clone, Default)]
pub struct CredentialSpec {
    pub password: Option<EnvValue>,
    pub private_key: Option<String>,
    pub passphrase: Option<EnvValue>,
}

impl CredentialSpec {
    /// Resolve into a typed credential.
    ///
    /// Fails with a configuration error when both or neither of password and
    /// private key are present.
    pub fn resolve(&self) -> Result<Credential> {
        match (&self.password, &self.private_key) {
            (Some(_), Some(_)) => Err(Error::Configuration(
                "both password and private_key are set; choose one".to_string(),
            )),
            (None, None) => Err(Error::Configuration(
                "one of password or private_key is required".to_string(),
            )),
            (Some(password), None) => Ok(Credential::Password(password.resolve()?)),
            (None, Some(key)) => {
                let source = if key.trim_start().starts_with("-----BEGIN") {
                    KeySource::Inline(key.clone())
                } else {
                    KeySource::File(expand_home(key))
                };
                let passphrase = self.passphrase.as_ref().map(EnvValue::resolve).transpose()?;
                Ok(Credential::PrivateKey { source, passphrase })
            }
        }
    }
}

/// Expand a leading `~/` using `$HOME`.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}
