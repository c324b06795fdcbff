//! One-shot driver: admit a single input blob, run the agent once.
//!
//! Input is either one JSON message or raw text. The admitted prompt is
//! passed to the agent as its final argument and the agent's stdout becomes
//! ours. Blocked prompts never reach the agent; the block notice is printed
//! instead. A JSON message that carries no prompt is passed on unclassified.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use goose_operator_core::StreamDirection;
use goose_operator_core::governance::{AdmissionEngine, Verdict};
use goose_operator_core::protocol::Frame;

use crate::downstream::{DownstreamCommand, invoke_once};
use crate::error::{FramingError, OperatorError};
use crate::framing::MAX_MESSAGE_BYTES;

/// Run one admission and at most one agent invocation.
///
/// Returns the process exit code: 0 on success or block, 1 when the agent
/// fails (the failure is reported on `output`).
pub async fn run_oneshot<R, W>(
    engine: &AdmissionEngine,
    command: &DownstreamCommand,
    input: R,
    mut output: W,
) -> Result<i32, OperatorError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let text = read_input(input).await?;

    let Some(frame) = Frame::decode(&text) else {
        tracing::warn!("empty input, nothing to run");
        return Ok(0);
    };

    // Only prompt text and raw text are classified; any other message is
    // handed to the agent untouched.
    let prompt_text = match frame {
        Frame::Message(msg) => match msg.prompt(engine.prompt_methods()) {
            Some(prompt) => prompt.prompt_text,
            None => {
                tracing::debug!(method = %msg.label(), "input carries no prompt, passing through");
                return invoke_and_report(command, &msg.raw, &mut output).await;
            }
        },
        Frame::Opaque { text, .. } => text,
    };

    let composed = match engine.evaluate_text(&prompt_text) {
        Verdict::Allow(text) => text,
        Verdict::Mutate { text, policy_id } => {
            tracing::info!(policy_id = %policy_id, "prompt mutated for one-shot run");
            text
        }
        Verdict::Block { notification } => {
            write_out(&mut output, format!("{notification}\n").as_bytes()).await?;
            return Ok(0);
        }
    };

    invoke_and_report(command, &composed, &mut output).await
}

/// Run the agent once and copy its result (or a failure report) to `output`.
async fn invoke_and_report<W: AsyncWrite + Unpin>(
    command: &DownstreamCommand,
    prompt: &str,
    output: &mut W,
) -> Result<i32, OperatorError> {
    let result = invoke_once(command, prompt).await?;

    if result.success() {
        write_out(output, &result.stdout).await?;
        return Ok(0);
    }

    let status = result
        .code
        .map(|c| format!("status {c}"))
        .unwrap_or_else(|| "a signal".to_string());
    tracing::error!(command = %command, code = result.code, "one-shot downstream failed");
    let payload = format!(
        "goose-operator: downstream '{}' exited with {status}\n{}",
        command.program,
        String::from_utf8_lossy(&result.stderr)
    );
    write_out(output, payload.as_bytes()).await?;
    Ok(1)
}

/// Read the whole input, bounded by the line size limit.
async fn read_input<R: AsyncRead + Unpin>(input: R) -> Result<String, OperatorError> {
    let mut buf = Vec::new();
    input
        .take(MAX_MESSAGE_BYTES as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| OperatorError::io(StreamDirection::ClientToAgent, e))?;

    if buf.len() > MAX_MESSAGE_BYTES {
        return Err(OperatorError::Framing {
            direction: StreamDirection::ClientToAgent,
            source: FramingError::MessageTooLarge {
                max_bytes: MAX_MESSAGE_BYTES,
            },
        });
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, data: &[u8]) -> Result<(), OperatorError> {
    output
        .write_all(data)
        .await
        .map_err(|e| OperatorError::io(StreamDirection::AgentToClient, e))?;
    output
        .flush()
        .await
        .map_err(|e| OperatorError::io(StreamDirection::AgentToClient, e))
}
