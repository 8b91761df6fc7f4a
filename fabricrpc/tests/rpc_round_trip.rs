//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for calls and the serve loop.
//!
//! These tests verify that:
//! - Echo and greeting RPCs round-trip over the in-process backend
//! - Concurrent calls are each answered with their own response
//! - The same traffic works over TCP
//! - Transport metrics account for every call

use fabricrpc::backend::{Backend, MemoryBackend};
use fabricrpc::config::TransportConfig;
use fabricrpc::endpoint::Side;
use fabricrpc::rpc::{RpcHandler, RpcTransport, TransportGuard};
use fabricrpc::{FabricError, Rpc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Message {
    id: u32,
    msg: String,
}

#[derive(Rpc)]
#[rpc(name = "echo", request = Message, response = Message)]
struct Echo;

impl RpcHandler for Echo {
    fn handle(&self, request: Message) -> Message {
        Message {
            id: request.id + 1,
            msg: format!("{}, World", request.msg),
        }
    }
}

#[derive(Rpc)]
#[rpc(name = "greet", request = String, response = String)]
struct Greet;

impl RpcHandler for Greet {
    fn handle(&self, name: String) -> String {
        format!("Hello, {name}!")
    }
}

type Calls = (Echo, Greet);

async fn establish<B: Backend>(
    server: B,
    client: B,
    workers: usize,
) -> (RpcTransport<B, ()>, RpcTransport<B, Calls>) {
    let (server, client) = tokio::join!(
        RpcTransport::<B, ()>::establish(
            TransportConfig::new(Side::Server).with_workers(workers),
            server
        ),
        RpcTransport::<B, Calls>::establish(
            TransportConfig::new(Side::Client).with_workers(workers),
            client
        ),
    );
    (server.unwrap(), client.unwrap())
}

/// Serves until the client disconnects and returns the number of requests answered.
async fn run_server<B: Backend>(server: RpcTransport<B, ()>) -> Result<u64, FabricError> {
    let guard = TransportGuard::attach(&server);
    server.serve((Echo, Greet)).await?;
    guard.detach().await?;
    let served = server.metrics().requests_served();
    server.close().await?;
    Ok(served)
}

#[tokio::test]
async fn test_echo_round_trip() {
    let (a, b) = MemoryBackend::pair();
    let (server, client) = establish(a, b, 1).await;

    let client_side = async {
        let guard = TransportGuard::attach(&client);
        let reply = client
            .call::<Echo>(&Message {
                id: 1,
                msg: "hi".to_string(),
            })
            .await?
            .await?;
        guard.detach().await?;
        client.close().await?;
        Ok::<_, FabricError>(reply)
    };

    let (served, reply) = tokio::join!(run_server(server), client_side);
    assert_eq!(
        reply.unwrap(),
        Message {
            id: 2,
            msg: "hi, World".to_string()
        }
    );
    assert_eq!(served.unwrap(), 1);
}

#[tokio::test]
async fn test_two_rpcs_share_one_transport() {
    let (a, b) = MemoryBackend::pair();
    let (server, client) = establish(a, b, 2).await;
    let observer = client.clone();

    let client_side = async {
        let guard = TransportGuard::attach(&client);
        let greeting = client.call::<Greet>(&"fabric".to_string()).await?;
        let echo = client
            .call::<Echo>(&Message {
                id: 10,
                msg: "ping".to_string(),
            })
            .await?;
        let (greeting, echo) = (greeting.await?, echo.await?);
        guard.detach().await?;
        client.close().await?;
        Ok::<_, FabricError>((greeting, echo))
    };

    let (served, replies) = tokio::join!(run_server(server), client_side);
    let (greeting, echo) = replies.unwrap();
    assert_eq!(greeting, "Hello, fabric!");
    assert_eq!(echo.id, 11);
    assert_eq!(echo.msg, "ping, World");
    assert_eq!(served.unwrap(), 2);

    let metrics = observer.metrics();
    assert_eq!(metrics.calls_issued(), 2);
    assert_eq!(metrics.responses_received(), 2);
    assert_eq!(metrics.in_flight(), 0);
    assert!(metrics.bytes_sent() > 0);
    assert!(metrics.average_latency().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_calls_are_matched() {
    let (a, b) = MemoryBackend::pair();
    let (server, client) = establish(a, b, 4).await;

    let client_side = async {
        let guard = TransportGuard::attach(&client);
        let mut calls = JoinSet::new();
        for id in 0..64u32 {
            let client = client.clone();
            calls.spawn(async move {
                let request = Message {
                    id,
                    msg: format!("call {id}"),
                };
                client.call::<Echo>(&request).await?.await
            });
        }
        let mut replies = Vec::new();
        while let Some(joined) = calls.join_next().await {
            replies.push(joined.expect("call task panicked")?);
        }
        guard.detach().await?;
        assert_eq!(client.outstanding(), 0);
        client.close().await?;
        Ok::<_, FabricError>(replies)
    };

    let (served, replies) = tokio::join!(run_server(server), client_side);
    let mut replies = replies.unwrap();
    replies.sort_by_key(|reply| reply.id);
    assert_eq!(replies.len(), 64);
    for (n, reply) in replies.iter().enumerate() {
        assert_eq!(reply.id, n as u32 + 1);
        assert_eq!(reply.msg, format!("call {n}, World"));
    }
    assert_eq!(served.unwrap(), 64);
}

#[cfg(feature = "tcp")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_echo_over_tcp() {
    use fabricrpc::backend::{TcpBackend, TcpConfig};

    let listener = TcpBackend::bind(TcpConfig::new("127.0.0.1:0".parse().unwrap())).unwrap();
    let address = listener.local_addr().unwrap();
    let connector = TcpBackend::connector(TcpConfig::new(address));
    let (server, client) = establish(listener, connector, 2).await;

    let client_side = async {
        let guard = TransportGuard::attach(&client);
        let mut replies = Vec::new();
        for id in 0..8u32 {
            let reply = client
                .call::<Echo>(&Message {
                    id,
                    msg: "hi".to_string(),
                })
                .await?
                .await?;
            replies.push(reply);
        }
        let greeting = client.call::<Greet>(&"tcp".to_string()).await?.await?;
        guard.detach().await?;
        client.close().await?;
        Ok::<_, FabricError>((replies, greeting))
    };

    let (served, result) = tokio::join!(run_server(server), client_side);
    let (replies, greeting) = result.unwrap();
    for (id, reply) in replies.iter().enumerate() {
        assert_eq!(reply.id, id as u32 + 1);
        assert_eq!(reply.msg, "hi, World");
    }
    assert_eq!(greeting, "Hello, tcp!");
    assert_eq!(served.unwrap(), 9);
}
