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

//! The poller that keeps a transport's control endpoint moving.

use crate::backend::Backend;
use crate::error::FabricError;
use crate::progress::idle;
use crate::rpc::{RpcSet, RpcTransport};
use crate::rpc::transport::Shared;
use crate::serialization::Serializer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Drives the control endpoint of a transport from a background task.
///
/// While attached, the guard's task repeatedly progresses the endpoint,
/// yielding after productive rounds and backing off by the configured
/// `poll_backoff` after empty ones. [`detach`](Self::detach) asks it to
/// finish; it does so only once no call is outstanding, no serve worker is
/// running and the predicate given to [`attach_with`](Self::attach_with)
/// holds.
///
/// A backend fault while polling severs the connection, resolving every
/// outstanding call as closed, and is returned from `detach`. A protocol
/// violation raised by a response task severs the connection the same way
/// and is re-raised as a panic from `detach`.
///
/// Only [`detach`](Self::detach) waits for teardown. Dropping the guard
/// raises the exit flag and returns at once: the poller keeps running in the
/// background until its exit condition holds, and whatever it ends with,
/// fault or panic, is lost.
#[must_use = "the control endpoint only makes progress while the guard is attached"]
#[derive(Debug)]
pub struct TransportGuard {
    exit: Arc<AtomicBool>,
    task: Option<JoinHandle<Result<(), FabricError>>>,
}

impl TransportGuard {
    /// Starts polling `transport` until detached.
    pub fn attach<B, R, S>(transport: &RpcTransport<B, R, S>) -> Self
    where
        B: Backend,
        R: RpcSet,
        S: Serializer,
    {
        Self::attach_with(transport, || true)
    }

    /// Starts polling `transport`; once detached, keeps polling until `until`
    /// also holds.
    pub fn attach_with<B, R, S, F>(transport: &RpcTransport<B, R, S>, until: F) -> Self
    where
        B: Backend,
        R: RpcSet,
        S: Serializer,
        F: FnMut() -> bool + Send + 'static,
    {
        let exit = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(poll(transport.shared(), Arc::clone(&exit), until));
        debug!(endpoint = transport.control().id(), "Transport guard attached");
        Self {
            exit,
            task: Some(task),
        }
    }

    /// Waits for outstanding calls and serve workers to finish, then stops
    /// polling.
    pub async fn detach(mut self) -> Result<(), FabricError> {
        self.exit.store(true, Ordering::Release);
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let result = match task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => {
                debug!(error = %join_error, "Transport poller cancelled");
                Ok(())
            }
        };
        debug!("Transport guard detached");
        result
    }
}

impl Drop for TransportGuard {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            self.exit.store(true, Ordering::Release);
            warn!("Transport guard dropped without detach; poller finishes in the background");
        }
    }
}

async fn poll<B, S, F>(
    shared: Arc<Shared<B, S>>,
    exit: Arc<AtomicBool>,
    mut until: F,
) -> Result<(), FabricError>
where
    B: Backend,
    S: Serializer,
    F: FnMut() -> bool,
{
    loop {
        if let Some(violation) = shared.reap_responders() {
            error!(endpoint = shared.control.id(), "Response task aborted");
            shared.sever();
            std::panic::resume_unwind(violation.into_panic());
        }
        if exit.load(Ordering::Acquire)
            && shared.outstanding.is_empty()
            && shared.active_workers.load(Ordering::Acquire) == 0
            && until()
        {
            return Ok(());
        }
        match shared.control.progress() {
            Ok(true) => tokio::task::yield_now().await,
            Ok(false) => idle(shared.config.poll_backoff).await,
            Err(fault) => {
                error!(error = %fault, endpoint = shared.control.id(), "Control endpoint failed");
                shared.sever();
                return Err(fault.into());
            }
        }
    }
}
