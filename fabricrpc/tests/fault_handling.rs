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

//! Integration tests for faults raised while calls are in flight.
//!
//! A fault on either side must sever the connection so every pending call
//! resolves instead of waiting forever.

use fabricrpc::backend::MemoryBackend;
use fabricrpc::buffer::BufferPool;
use fabricrpc::config::TransportConfig;
use fabricrpc::connection::ConnectionHandle;
use fabricrpc::endpoint::{Endpoint, PathRole, Side};
use fabricrpc::progress::drive_until;
use fabricrpc::rpc::{FrameHeader, HEADER_LEN, RpcError, RpcHandler, RpcId, RpcTransport, TransportGuard};
use fabricrpc::Rpc;
use std::sync::Arc;
use std::time::Duration;

const BACKOFF: Duration = Duration::from_micros(10);

#[derive(Rpc)]
#[rpc(name = "lookup", request = u64, response = u64)]
struct Lookup;

#[derive(Rpc)]
#[rpc(name = "repeat", request = u32, response = String)]
struct Repeat;

impl RpcHandler for Repeat {
    fn handle(&self, count: u32) -> String {
        "x".repeat(count as usize)
    }
}

#[tokio::test]
async fn test_response_with_unknown_rpc_id_severs_connection() {
    let (a, b) = MemoryBackend::pair();
    let peer = Arc::new(Endpoint::new(PathRole::Control, a));
    let mut server = ConnectionHandle::new(Side::Server);
    server.associate(Arc::clone(&peer));
    let (accepted, client) = tokio::join!(
        server.listen_and_accept(),
        RpcTransport::<_, (Lookup,)>::establish(TransportConfig::new(Side::Client), b),
    );
    accepted.unwrap();
    let client = client.unwrap();

    let pool = BufferPool::new(2, 64);
    let request = peer.post_recv(pool.acquire_one().unwrap()).unwrap();
    let guard = TransportGuard::attach(&client);
    let pending = client.call::<Lookup>(&5).await.unwrap();

    drive_until(&*peer, BACKOFF, || peer.pending() == 0).await.unwrap();
    let request = request.await;
    let (header, _) = FrameHeader::decode(request.bytes()).unwrap();
    assert_eq!(header.rpc_id, Lookup::ID);

    let mut reply = pool.acquire_one().unwrap();
    FrameHeader {
        seq: -header.seq,
        rpc_id: RpcId::from_raw(0xdead),
    }
    .encode(&mut reply)
    .unwrap();
    let sent = peer.post_send(reply, HEADER_LEN).unwrap();
    drive_until(&*peer, BACKOFF, || peer.pending() == 0).await.unwrap();
    assert_eq!(sent.await.transferred, HEADER_LEN);

    let error = pending.await.unwrap_err();
    assert!(matches!(error, RpcError::ConnectionClosed));
    assert_eq!(client.outstanding(), 0);
    assert!(client.is_closing());

    let detached = tokio::spawn(guard.detach()).await.unwrap_err();
    assert!(detached.is_panic());
    let panic = detached.into_panic();
    let message = panic.downcast_ref::<String>().unwrap();
    assert!(message.contains("unknown rpc id"));

    server.wait_for_disconnect().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unencodable_response_severs_connection() {
    let (a, b) = MemoryBackend::pair();
    let (server, client) = tokio::join!(
        RpcTransport::<_, ()>::establish(
            TransportConfig::new(Side::Server)
                .with_workers(1)
                .with_max_rpc_msg_size(64),
            a
        ),
        RpcTransport::<_, (Repeat,)>::establish(
            TransportConfig::new(Side::Client)
                .with_workers(1)
                .with_max_rpc_msg_size(64),
            b
        ),
    );
    let (server, client) = (server.unwrap(), client.unwrap());

    let server_side = async {
        let guard = TransportGuard::attach(&server);
        let served = server.serve((Repeat,)).await;
        guard.detach().await.unwrap();
        let running = server.control().running();
        server.close().await.unwrap();
        (served, running)
    };
    let client_side = async {
        let guard = TransportGuard::attach(&client);
        let small = client.call::<Repeat>(&4).await.unwrap().await;
        let large = client.call::<Repeat>(&200).await.unwrap().await;
        guard.detach().await.unwrap();
        let drained = client.metrics().calls_drained();
        client.close().await.unwrap();
        (small, large, drained)
    };

    let ((served, running), (small, large, drained)) = tokio::join!(server_side, client_side);
    assert_eq!(small.unwrap(), "xxxx");
    assert!(large.unwrap_err().is_closed());
    assert_eq!(drained, 1);
    assert!(matches!(served, Err(RpcError::Serialization(_))));
    assert!(!running);
}
