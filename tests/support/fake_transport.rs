// ABOUTME: Scripted transport that hands out MemoryRemote channels.
// ABOUTME: Injects failures at each connect step and records which steps ran.

use super::memory_remote::MemoryRemote;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tether::config::{ConnectionConfig, Credential};
use tether::error::{Error, Result};
use tether::ssh::Transport;

/// Which connect step should go wrong.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub handshake: bool,
    pub stall_handshake: bool,
    pub reject_credential: bool,
    pub command_channel: bool,
    pub file_channel: bool,
    pub close: bool,
}

pub struct FakeTransport {
    remote: MemoryRemote,
    failures: Failures,
    calls: Arc<Mutex<Vec<&'static str>>>,
    credentials: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    pub fn new(remote: MemoryRemote) -> Self {
        Self::failing(remote, Failures::default())
    }

    pub fn failing(remote: MemoryRemote, failures: Failures) -> Self {
        Self {
            remote,
            failures,
            calls: Arc::default(),
            credentials: Arc::default(),
        }
    }

    /// Steps attempted so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Authentication method of every credential presented.
    pub fn credentials_presented(&self) -> Vec<String> {
        self.credentials.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Commands = MemoryRemote;
    type Files = MemoryRemote;

    async fn connect(&mut self, config: &ConnectionConfig) -> Result<()> {
        self.record("connect");
        if self.failures.stall_handshake {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failures.handshake {
            return Err(Error::HostKeyRejected(config.host.clone()));
        }
        Ok(())
    }

    async fn authenticate(&mut self, _username: &str, credential: &Credential) -> Result<bool> {
        self.record("authenticate");
        self.credentials.lock().push(credential.method().to_string());
        Ok(!self.failures.reject_credential)
    }

    async fn open_command_channel(&mut self) -> Result<MemoryRemote> {
        self.record("open_command_channel");
        if self.failures.command_channel {
            return Err(Error::ChannelOpen {
                channel: "command",
                reason: "administratively prohibited".to_string(),
            });
        }
        Ok(self.remote.clone())
    }

    async fn open_file_transfer_channel(&mut self) -> Result<MemoryRemote> {
        self.record("open_file_transfer_channel");
        if self.failures.file_channel {
            return Err(Error::ChannelOpen {
                channel: "sftp",
                reason: "subsystem request failed".to_string(),
            });
        }
        Ok(self.remote.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.record("close");
        if self.failures.close {
            return Err(Error::ChannelClosed);
        }
        Ok(())
    }
}
