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

//! Observability support for fabricrpc.
//!
//! Everything the crate logs goes through `tracing`. Lifecycle transitions are
//! emitted at `info`, individual operations at `debug` and `trace`, and frame
//! contents can be dumped at `trace` with [`HexDump`]. Install any
//! `tracing` subscriber to see them:
//!
//! ```rust,no_run
//! tracing_subscriber::fmt()
//!     .with_env_filter("fabricrpc=debug")
//!     .init();
//! ```
//!
//! Counters for a transport are kept in [`TransportMetrics`] and can be read
//! at any time through `RpcTransport::metrics`. With the `observability`
//! feature they are also recorded through the `metrics` facade, so an
//! installed exporter sees `fabricrpc.transport.calls.issued`,
//! `fabricrpc.transport.calls.outstanding`, `fabricrpc.transport.bytes.sent`
//! and the rest.
//!
//! ```rust
//! use fabricrpc::observability::TransportMetrics;
//!
//! let metrics = TransportMetrics::new();
//! metrics.record_call_issued();
//! metrics.record_bytes_sent(128);
//! assert_eq!(metrics.calls_issued(), 1);
//! assert_eq!(metrics.in_flight(), 1);
//! ```

mod hexdump;
mod metrics;

pub use hexdump::HexDump;
pub use metrics::TransportMetrics;
