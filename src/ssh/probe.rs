// ABOUTME: TCP reachability check run before the SSH handshake.
// ABOUTME: Fails fast on closed ports without spending a handshake attempt.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;

/// Open and immediately drop a TCP connection to `host:port`.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(Error::Unreachable {
            host: host.to_string(),
            port,
            reason: e.to_string(),
        }),
        Err(_) => Err(Error::Unreachable {
            host: host.to_string(),
            port,
            reason: format!("no answer within {timeout:?}"),
        }),
    }
}
