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

//! Backends: the substrates an endpoint runs over.
//!
//! The core never talks to sockets or queues directly. It drives a
//! [`Backend`], which exposes the lifecycle hooks of the endpoint state
//! machine, posting of sends and receives by [`OpToken`](crate::endpoint::OpToken),
//! a non-blocking [`progress`](Backend::progress) poll, and the
//! listen/connect/disconnect primitives the connection handle polls during
//! establishment and teardown.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryBackend`]: connected in-process halves, for tests and benches
//! - [`TcpBackend`]: non-blocking TCP sockets (requires the `tcp` feature)
//!
//! Backends are selected statically through generics. When the choice is a
//! runtime setting, `Box<dyn Backend>` implements [`Backend`] as well.
//!
//! # Examples
//!
//! ```rust
//! use fabricrpc::backend::{Backend, BackendKind, MemoryBackend};
//!
//! let (server, client) = MemoryBackend::pair();
//! let boxed: Box<dyn Backend> = Box::new(client);
//! assert_eq!(server.kind(), BackendKind::Memory);
//! assert_eq!(boxed.kind(), BackendKind::Memory);
//! ```

mod error;
mod memory;
#[cfg(feature = "tcp")]
mod tcp;
mod traits;

pub use error::BackendError;
pub use memory::MemoryBackend;
#[cfg(feature = "tcp")]
pub use tcp::{TcpBackend, TcpConfig};
pub use traits::{Backend, BackendKind, LinkState};
