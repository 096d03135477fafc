// ABOUTME: Test support utilities.
// ABOUTME: In-memory remote host, scripted transport, and live-server settings.

use std::sync::Once;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_transport;
#[allow(dead_code)]
pub mod live;
#[allow(dead_code)]
pub mod memory_remote;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("tether=debug".parse().unwrap())
            .add_directive("russh=info".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A local port that accepts TCP connections for as long as the listener lives.
#[allow(dead_code)]
pub async fn open_port() -> (tokio::net::TcpListener, u16) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A local port with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> u16 {
    let (listener, port) = open_port().await;
    drop(listener);
    port
}
