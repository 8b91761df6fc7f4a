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

//! Fail-fast reporting for protocol violations.
//!
//! Out-of-order state transitions, unknown RPC identifiers, unmatched
//! response sequences and buffers returned to the wrong pool are programming
//! errors. They are never folded into a `Result`: the violation is logged with
//! the call site and the process is brought down. Release builds compile with
//! `panic = "abort"`, so the panic raised here is terminal.
//!
//! Where unwinding is enabled, a violation raised inside a background task
//! does not vanish with the task: response tasks are reaped by the
//! transport guard, which severs the connection and re-raises the panic from
//! `TransportGuard::detach`, and serve workers re-raise theirs from `serve`.

/// Logs a protocol violation at `error` level and panics with the same message.
macro_rules! fatal {
    ($($arg:tt)+) => {{
        let message = ::std::format!($($arg)+);
        ::tracing::error!(
            file = ::std::file!(),
            line = ::std::line!(),
            "protocol violation: {}",
            message
        );
        ::std::panic!("protocol violation: {}", message)
    }};
}

pub(crate) use fatal;

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic(expected = "protocol violation: sequence 7 is not a response")]
    fn test_fatal_panics_with_message() {
        let seq = 7;
        fatal!("sequence {} is not a response", seq);
    }
}
