//! Echo server over TCP.
//!
//! Accepts one client at a time and answers `echo` and `hello` calls until
//! the client disconnects, then waits for the next one.
//!
//! Run the server:
//! ```bash
//! RUST_LOG=fabricrpc=debug cargo run --example echo_server -- 127.0.0.1:7878
//! ```
//!
//! Then run the client (in another terminal):
//! ```bash
//! cargo run --example echo_client -- 127.0.0.1:7878
//! ```

mod common;

use common::{DEFAULT_ADDRESS, Echo, Hello};
use fabricrpc::backend::{TcpBackend, TcpConfig};
use fabricrpc::config::TransportConfig;
use fabricrpc::endpoint::Side;
use fabricrpc::rpc::{RpcTransport, TransportGuard};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string())
        .parse()?;

    loop {
        let backend = TcpBackend::bind(TcpConfig::new(address))?;
        println!("Echo server listening on {}", backend.local_addr()?);

        let config = TransportConfig::new(Side::Server).with_workers(4);
        let server = RpcTransport::<_, ()>::establish(config, backend).await?;
        println!("Client connected");

        let guard = TransportGuard::attach(&server);
        server.serve((Echo, Hello)).await?;
        guard.detach().await?;

        let served = server.metrics().requests_served();
        server.close().await?;
        println!("Client disconnected after {served} requests");
    }
}
