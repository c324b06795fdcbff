//! Streaming driver: spawn the agent and relay stdio through admission.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;

use goose_operator_core::StreamDirection;
use goose_operator_core::governance::AdmissionEngine;

use crate::downstream::{Downstream, DownstreamCommand};
use crate::error::OperatorError;
use crate::framing::FrameReader;
use crate::lifecycle::{ShutdownRequest, shutdown_downstream};
use crate::relay::{Relay, RelayEnd};

/// How long remaining agent output is forwarded after shutdown.
pub const DRAIN_LIMIT: Duration = Duration::from_secs(1);

/// How long the client pump gets to notice a stop request.
const CLIENT_STOP_GRACE: Duration = Duration::from_millis(100);

/// Run the streaming proxy over this process's stdin/stdout.
///
/// Returns the agent's exit code.
///
/// # Errors
///
/// Returns [`OperatorError`] when the agent cannot be found or spawned.
pub async fn run_proxy(
    engine: Arc<AdmissionEngine>,
    command: DownstreamCommand,
    shutdown: ShutdownRequest,
) -> Result<i32, OperatorError> {
    let mut downstream = Downstream::spawn(&command)?;
    let (agent_in, agent_out) = downstream.take_pipes()?;

    let client_in = FrameReader::new(
        BufReader::new(tokio::io::stdin()),
        StreamDirection::ClientToAgent,
    );
    let mut relay = Relay::spawn(engine, client_in, tokio::io::stdout(), agent_in, agent_out);

    let end = relay.wait(downstream.child.wait()).await;
    match end {
        RelayEnd::ClientClosed => tracing::info!("client closed stdin"),
        RelayEnd::DownstreamClosed | RelayEnd::DownstreamExited => {
            tracing::warn!(
                reason = ?end,
                "downstream ended before the client, no further input is forwarded"
            );
        }
        RelayEnd::Failed => tracing::warn!("relay failed, shutting down"),
    }

    relay.stop_client(CLIENT_STOP_GRACE).await;
    let code = shutdown_downstream(&mut downstream.child, &shutdown).await?;
    relay.drain(DRAIN_LIMIT).await;

    Ok(code)
}
