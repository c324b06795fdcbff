//! Client → Agent pump: read client lines, admit prompts, forward to the agent.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{Mutex, watch};

use goose_operator_core::StreamDirection;
use goose_operator_core::governance::AdmissionEngine;
use goose_operator_core::protocol::{Frame, to_line};

use crate::downstream::DownstreamWriter;
use crate::error::OperatorError;
use crate::framing::FrameReader;

use super::helpers::{preview, write_client};

/// Read from the client, run admission, write to the agent's stdin.
///
/// Returns `Ok(())` on client EOF or shutdown. The agent's stdin is dropped
/// (closed) when this returns.
pub(super) async fn client_to_agent<CR, DW, CW>(
    engine: Arc<AdmissionEngine>,
    mut client: FrameReader<CR>,
    mut agent: DownstreamWriter<DW>,
    client_out: Arc<Mutex<CW>>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), OperatorError>
where
    CR: AsyncBufRead + Unpin,
    DW: AsyncWrite + Unpin,
    CW: AsyncWrite + Unpin,
{
    const DIRECTION: StreamDirection = StreamDirection::ClientToAgent;

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                tracing::debug!(direction = %DIRECTION, "shutdown signal received");
                break;
            }
            result = client.next_frame() => {
                match result {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        tracing::debug!(direction = %DIRECTION, "client stdin EOF");
                        break;
                    }
                    Err(source) => {
                        return Err(OperatorError::Framing { direction: DIRECTION, source });
                    }
                }
            }
        };

        match &frame {
            Frame::Message(msg) => {
                tracing::debug!(
                    direction = %DIRECTION,
                    method = %msg.label(),
                    kind = msg.kind().map(|k| k.label()).unwrap_or("unclassified"),
                    "client message"
                );
            }
            Frame::Opaque { text, error } => {
                tracing::debug!(
                    direction = %DIRECTION,
                    error = %error,
                    line = preview(text),
                    "client line is not a message, forwarding verbatim"
                );
            }
        }

        let admission = engine.admit_frame(&frame);

        for reply in &admission.replies {
            write_client(&client_out, to_line(reply).as_bytes())
                .await
                .map_err(|e| OperatorError::io(StreamDirection::AgentToClient, e))?;
        }

        if let Some(line) = admission.forward {
            agent
                .write_line(&line)
                .await
                .map_err(|e| OperatorError::io(DIRECTION, e))?;
        }
    }

    Ok(())
}
