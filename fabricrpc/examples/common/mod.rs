//! RPC definitions shared by the echo server and client examples.

use fabricrpc::Rpc;
use fabricrpc::rpc::RpcHandler;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7878";

/// Payload of the echo RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u32,
    pub msg: String,
}

/// Replies with the next id and the message followed by ", World".
#[derive(Rpc)]
#[rpc(name = "echo", request = Message, response = Message)]
pub struct Echo;

impl RpcHandler for Echo {
    fn handle(&self, request: Message) -> Message {
        Message {
            id: request.id + 1,
            msg: format!("{}, World", request.msg),
        }
    }
}

/// Greets a caller by name.
#[derive(Rpc)]
#[rpc(name = "hello", request = String, response = String)]
pub struct Hello;

impl RpcHandler for Hello {
    fn handle(&self, name: String) -> String {
        format!("Hello, {name}!")
    }
}
