//! Agent → Client pump: forward agent JSON, suppress startup chatter.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::Mutex;

use goose_operator_core::StreamDirection;
use goose_operator_core::protocol::{DecodeError, Frame};

use crate::error::OperatorError;
use crate::framing::FrameReader;

use super::helpers::{preview, write_client};

/// Read from the agent's stdout and forward decoded messages to the client.
///
/// Runs until the agent closes stdout. Messages are forwarded as their
/// original text, as is any other valid JSON line. Lines that are not JSON
/// are logged and never reach the client.
pub(super) async fn agent_to_client<DR, CW>(
    mut agent: FrameReader<DR>,
    client_out: Arc<Mutex<CW>>,
) -> Result<(), OperatorError>
where
    DR: AsyncBufRead + Unpin,
    CW: AsyncWrite + Unpin,
{
    const DIRECTION: StreamDirection = StreamDirection::AgentToClient;

    loop {
        let frame = match agent.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(direction = %DIRECTION, "downstream stdout EOF");
                break;
            }
            Err(source) => {
                return Err(OperatorError::Framing {
                    direction: DIRECTION,
                    source,
                });
            }
        };

        match frame {
            Frame::Message(msg) => {
                tracing::debug!(
                    direction = %DIRECTION,
                    method = %msg.label(),
                    "forwarding downstream message"
                );
                let mut line = msg.raw;
                line.push('\n');
                write_client(&client_out, line.as_bytes())
                    .await
                    .map_err(|e| OperatorError::io(DIRECTION, e))?;
            }
            Frame::Opaque {
                mut text,
                error: DecodeError::NotObject,
            } => {
                // Valid JSON that is not an object (batches, scalars).
                tracing::debug!(direction = %DIRECTION, "forwarding non-object downstream JSON");
                text.push('\n');
                write_client(&client_out, text.as_bytes())
                    .await
                    .map_err(|e| OperatorError::io(DIRECTION, e))?;
            }
            Frame::Opaque { text, error } => {
                tracing::info!(
                    direction = %DIRECTION,
                    error = %error,
                    line = preview(&text),
                    "downstream chatter"
                );
            }
        }
    }

    Ok(())
}
