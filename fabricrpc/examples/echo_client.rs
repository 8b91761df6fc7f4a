//! Echo client over TCP.
//!
//! Connects to the echo server, issues a few concurrent `echo` calls and a
//! `hello` call, prints the replies and disconnects.
//!
//! Start the server first:
//! ```bash
//! cargo run --example echo_server
//! ```
//!
//! Then run the client:
//! ```bash
//! cargo run --example echo_client -- 127.0.0.1:7878
//! ```

mod common;

use common::{DEFAULT_ADDRESS, Echo, Hello, Message};
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

    let config = TransportConfig::new(Side::Client).with_workers(4);
    let client =
        RpcTransport::<_, (Echo, Hello)>::establish(config, TcpBackend::connector(TcpConfig::new(address)))
            .await?;
    println!("Connected to {address}");

    let guard = TransportGuard::attach(&client);

    // Issue every call before awaiting any response.
    let mut pending = Vec::new();
    for id in 1..=4 {
        let request = Message {
            id,
            msg: format!("hi #{id}"),
        };
        pending.push(client.call::<Echo>(&request).await?);
    }
    for response in pending {
        let reply = response.await?;
        println!("echo -> {{ id: {}, msg: {:?} }}", reply.id, reply.msg);
    }

    let greeting = client.call::<Hello>(&"fabricrpc".to_string()).await?.await?;
    println!("hello -> {greeting:?}");

    guard.detach().await?;
    if let Some(latency) = client.metrics().average_latency() {
        println!("average round trip: {latency:?}");
    }
    client.close().await?;
    Ok(())
}
