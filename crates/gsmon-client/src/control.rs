//! Per-process-kind input and termination protocol.
//!
//! Installs die from a single kill request. Servers get a staged shutdown:
//! a `"stop"` command typed into stdin, an interrupt-equivalent stop
//! request, a grace period, a status check, and only then a forced kill.
//! The whole sequence never reports failure without first re-confirming
//! that the process is actually still alive.

use std::time::Duration;

use gsmon_core::prelude::*;
use gsmon_core::ProcessKind;

use crate::api::ApiClient;

/// Time granted to a server to exit on its own after the graceful stop
/// request before its status is re-checked.
pub const GRACEFUL_STOP_GRACE: Duration = Duration::from_secs(5);

/// Backend operations the protocol needs. [`ApiClient`] is the production
/// implementation; tests substitute scripted fakes.
#[allow(async_fn_in_trait)]
pub trait ControlBackend {
    async fn server_is_running(&self, id: &str) -> Result<bool>;
    async fn send_server_input(&self, id: &str, value: &str) -> Result<bool>;
    async fn stop_server(&self, id: &str, force: bool) -> Result<bool>;
    async fn terminate_install(&self, id: &str) -> Result<bool>;
    async fn send_install_input(&self, id: &str, value: &str) -> Result<bool>;
}

impl ControlBackend for ApiClient {
    async fn server_is_running(&self, id: &str) -> Result<bool> {
        ApiClient::server_is_running(self, id).await
    }

    async fn send_server_input(&self, id: &str, value: &str) -> Result<bool> {
        ApiClient::send_server_input(self, id, value).await
    }

    async fn stop_server(&self, id: &str, force: bool) -> Result<bool> {
        ApiClient::stop_server(self, id, force).await
    }

    async fn terminate_install(&self, id: &str) -> Result<bool> {
        ApiClient::terminate_install(self, id).await
    }

    async fn send_install_input(&self, id: &str, value: &str) -> Result<bool> {
        ApiClient::send_install_input(self, id, value).await
    }
}

/// Send a line of input to the process's stdin channel.
///
/// For servers the target's liveness is verified first so input is never
/// sent to a dead process. `Custom` kinds are handled by their registered
/// handler upstream; reaching here means none was registered.
pub async fn send_input<B: ControlBackend>(
    backend: &B,
    kind: ProcessKind,
    id: &str,
    value: &str,
) -> Result<bool> {
    match kind {
        ProcessKind::Install => backend.send_install_input(id, value).await,
        ProcessKind::Server => send_server_input_checked(backend, id, value).await,
        ProcessKind::Custom => Ok(false),
    }
}

async fn send_server_input_checked<B: ControlBackend>(
    backend: &B,
    id: &str,
    value: &str,
) -> Result<bool> {
    match backend.server_is_running(id).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(Error::backend(format!(
                "server '{id}' is not running — input not sent"
            )));
        }
        Err(err) => {
            warn!("could not confirm server '{}' status: {}", id, err);
            return Err(err);
        }
    }
    backend.send_server_input(id, value).await
}

/// Terminate the process behind `(kind, id)`.
pub async fn terminate<B: ControlBackend>(
    backend: &B,
    kind: ProcessKind,
    id: &str,
    force: bool,
) -> Result<bool> {
    match kind {
        ProcessKind::Install => backend.terminate_install(id).await,
        ProcessKind::Server if force => backend.stop_server(id, true).await,
        ProcessKind::Server => graceful_stop(backend, id, GRACEFUL_STOP_GRACE).await,
        ProcessKind::Custom => Ok(false),
    }
}

/// Graceful server stop with the safety net around it: any error inside
/// the staged sequence triggers a final status re-check, so "failed to
/// stop" is only ever reported for a process confirmed to be alive.
async fn graceful_stop<B: ControlBackend>(backend: &B, id: &str, grace: Duration) -> Result<bool> {
    match staged_stop(backend, id, grace).await {
        Ok(stopped) => Ok(stopped),
        Err(err) => {
            warn!("graceful stop of '{}' errored ({}), re-checking status", id, err);
            match backend.server_is_running(id).await {
                Ok(false) => {
                    info!("server '{}' stopped despite the error", id);
                    Ok(true)
                }
                Ok(true) => Ok(false),
                Err(status_err) => {
                    error!("cannot confirm final status of '{}': {}", id, status_err);
                    Ok(false)
                }
            }
        }
    }
}

/// The staged stop sequence: stop command, interrupt, grace period,
/// status check, forced kill.
async fn staged_stop<B: ControlBackend>(backend: &B, id: &str, grace: Duration) -> Result<bool> {
    // 1. Best-effort "stop" typed into the server console; a failure here
    //    is logged but never aborts the sequence.
    match send_server_input_checked(backend, id, "stop").await {
        Ok(sent) => debug!("stop command sent to '{}': {}", id, sent),
        Err(err) => warn!("failed to type stop into '{}': {}", id, err),
    }

    // 2. Interrupt-equivalent stop request; immediate success ends it here.
    if backend.stop_server(id, false).await? {
        return Ok(true);
    }

    // 3. Give the process time to exit on its own.
    tokio::time::sleep(grace).await;

    // 4–6. Status decides; an unreachable status escalates straight to a
    // forced kill rather than leaving the session stuck.
    match backend.server_is_running(id).await {
        Ok(false) => Ok(true),
        Ok(true) => {
            warn!("server '{}' ignored the graceful stop, forcing", id);
            backend.stop_server(id, true).await
        }
        Err(err) => {
            warn!("cannot confirm status of '{}' ({}), forcing stop", id, err);
            backend.stop_server(id, true).await
        }
    }
}
