//! Bidirectional relay between the client and the downstream agent.
//!
//! Two tasks run concurrently and never wait on each other:
//!
//! - client → agent: decode, admit, forward (or answer on block)
//! - agent → client: decode, forward messages, log chatter
//!
//! The client-facing writer is shared behind a mutex. The relay itself knows
//! nothing about processes; [`crate::proxy`] wires it to a spawned agent and
//! tests wire it to in-memory pipes.

mod agent_to_client;
mod client_to_agent;
mod helpers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use goose_operator_core::governance::AdmissionEngine;

use crate::downstream::DownstreamWriter;
use crate::error::OperatorError;
use crate::framing::FrameReader;

use agent_to_client::agent_to_client;
use client_to_agent::client_to_agent;

/// Why the relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// The client closed its input.
    ClientClosed,
    /// The agent closed its stdout.
    DownstreamClosed,
    /// The agent process exited.
    DownstreamExited,
    /// A pump failed with an IO error.
    Failed,
}

/// Handles to the two running pumps.
pub struct Relay {
    client_to_agent: JoinHandle<Result<(), OperatorError>>,
    agent_to_client: JoinHandle<Result<(), OperatorError>>,
    client_done: bool,
    agent_done: bool,
    shutdown_tx: watch::Sender<bool>,
}

impl Relay {
    /// Start both pumps.
    pub fn spawn<CR, CW, DR, DW>(
        engine: Arc<AdmissionEngine>,
        client_in: FrameReader<CR>,
        client_out: CW,
        agent_in: DownstreamWriter<DW>,
        agent_out: FrameReader<DR>,
    ) -> Self
    where
        CR: AsyncBufRead + Unpin + Send + 'static,
        CW: AsyncWrite + Unpin + Send + 'static,
        DR: AsyncBufRead + Unpin + Send + 'static,
        DW: AsyncWrite + Unpin + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let client_out = Arc::new(Mutex::new(client_out));

        let client_to_agent = tokio::spawn(
            client_to_agent(engine, client_in, agent_in, client_out.clone(), shutdown_rx)
                .in_current_span(),
        );
        let agent_to_client =
            tokio::spawn(agent_to_client(agent_out, client_out).in_current_span());

        Self {
            client_to_agent,
            agent_to_client,
            client_done: false,
            agent_done: false,
            shutdown_tx,
        }
    }

    /// Wait until either pump finishes or `exited` resolves.
    pub async fn wait<F: Future>(&mut self, exited: F) -> RelayEnd {
        tokio::select! {
            result = &mut self.client_to_agent, if !self.client_done => {
                self.client_done = true;
                if log_pump("client→agent", result) {
                    RelayEnd::ClientClosed
                } else {
                    RelayEnd::Failed
                }
            }
            result = &mut self.agent_to_client, if !self.agent_done => {
                self.agent_done = true;
                if log_pump("agent→client", result) {
                    RelayEnd::DownstreamClosed
                } else {
                    RelayEnd::Failed
                }
            }
            _ = exited => {
                tracing::info!("downstream process exited");
                RelayEnd::DownstreamExited
            }
        }
    }

    /// Stop reading client input and close the agent's stdin.
    pub async fn stop_client(&mut self, grace: Duration) {
        if self.client_done {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        match tokio::time::timeout(grace, &mut self.client_to_agent).await {
            Ok(result) => {
                log_pump("client→agent", result);
            }
            Err(_) => {
                tracing::debug!("client→agent did not stop in time, aborting");
                self.client_to_agent.abort();
            }
        }
        self.client_done = true;
    }

    /// Forward remaining agent output for at most `limit`, then stop.
    pub async fn drain(mut self, limit: Duration) {
        if !self.client_done {
            self.client_to_agent.abort();
        }
        if self.agent_done {
            return;
        }
        match tokio::time::timeout(limit, &mut self.agent_to_client).await {
            Ok(result) => {
                log_pump("agent→client", result);
            }
            Err(_) => {
                tracing::debug!("agent→client still open after drain limit, aborting");
                self.agent_to_client.abort();
            }
        }
    }
}

/// Log a finished pump. Returns `true` for a clean finish.
fn log_pump(
    name: &str,
    result: Result<Result<(), OperatorError>, tokio::task::JoinError>,
) -> bool {
    match result {
        Ok(Ok(())) => {
            tracing::debug!(pump = name, "stream closed");
            true
        }
        Ok(Err(ref e)) => {
            tracing::error!(pump = name, error = %e, "pump failed");
            false
        }
        Err(ref e) => {
            tracing::error!(pump = name, error = %e, "pump task panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use goose_operator_core::StreamDirection;
    use goose_operator_core::config::{Keywords, Rule, RuleAction};
    use goose_operator_core::governance::IntentClassifier;
    use goose_operator_core::policy::{PolicyError, PolicyStore};
    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};

    const TIMEOUT: Duration = Duration::from_secs(2);

    struct MapStore(HashMap<String, String>);

    impl PolicyStore for MapStore {
        fn load(&self, id: &str) -> Result<String, PolicyError> {
            self.0.get(id).cloned().ok_or_else(|| PolicyError::NotFound {
                id: id.to_string(),
                path: id.to_string(),
            })
        }
    }

    fn engine() -> Arc<AdmissionEngine> {
        let rules = vec![
            Rule {
                keywords: Keywords::Single("zelda".into()),
                action: RuleAction::Policy,
                policy: Some("zelda-quality-control".into()),
                reason: None,
                description: None,
            },
            Rule {
                keywords: Keywords::Single("rm -rf /".into()),
                action: RuleAction::Block,
                policy: None,
                reason: Some("destructive filesystem command".into()),
                description: None,
            },
        ];
        let store = MapStore(HashMap::from([(
            "zelda-quality-control".to_string(),
            "NO SPOILERS".to_string(),
        )]));
        Arc::new(AdmissionEngine::new(
            IntentClassifier::from_rules(&rules),
            Arc::new(store),
            vec!["session/prompt".into()],
            Some("\n--\n".into()),
        ))
    }

    /// Test-side ends of the four pipes.
    struct Harness {
        relay: Relay,
        client_tx: DuplexStream,
        client_rx: BufReader<DuplexStream>,
        agent_stdin: BufReader<DuplexStream>,
        agent_stdout: DuplexStream,
    }

    fn harness() -> Harness {
        let (client_tx, relay_client_in) = duplex(64 * 1024);
        let (relay_client_out, client_rx) = duplex(64 * 1024);
        let (relay_agent_in, agent_stdin) = duplex(64 * 1024);
        let (agent_stdout, relay_agent_out) = duplex(64 * 1024);

        let relay = Relay::spawn(
            engine(),
            FrameReader::new(
                BufReader::new(relay_client_in),
                StreamDirection::ClientToAgent,
            ),
            relay_client_out,
            DownstreamWriter::new(relay_agent_in),
            FrameReader::new(
                BufReader::new(relay_agent_out),
                StreamDirection::AgentToClient,
            ),
        );

        Harness {
            relay,
            client_tx,
            client_rx: BufReader::new(client_rx),
            agent_stdin: BufReader::new(agent_stdin),
            agent_stdout,
        }
    }

    async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        tokio::time::timeout(TIMEOUT, reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line
    }

    fn prompt(id: i64, text: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "session/prompt",
                "params": {"sessionId": "sess-1", "prompt": {"text": text}}
            })
        )
    }

    #[tokio::test]
    async fn test_non_prompt_forwarded_verbatim() {
        let mut h = harness();
        let line = "{\"jsonrpc\":\"2.0\",\"id\":0,\"method\":\"initialize\",\"params\":{}}\n";
        h.client_tx.write_all(line.as_bytes()).await.unwrap();
        assert_eq!(read_line(&mut h.agent_stdin).await, line);
    }

    #[tokio::test]
    async fn test_opaque_client_line_forwarded() {
        let mut h = harness();
        h.client_tx.write_all(b"  hello agent  \n\n").await.unwrap();
        assert_eq!(read_line(&mut h.agent_stdin).await, "  hello agent  \n");
    }

    #[tokio::test]
    async fn test_mutate_forwards_policy_and_notifies() {
        let mut h = harness();
        h.client_tx
            .write_all(prompt(1, "Zelda walkthrough").as_bytes())
            .await
            .unwrap();

        let forwarded: Value = serde_json::from_str(&read_line(&mut h.agent_stdin).await).unwrap();
        assert_eq!(
            forwarded["params"]["prompt"]["text"],
            "Zelda walkthrough\n--\nNO SPOILERS"
        );

        let notice: Value = serde_json::from_str(&read_line(&mut h.client_rx).await).unwrap();
        assert_eq!(notice["method"], "session/update");
        assert_eq!(notice["params"]["sessionId"], "sess-1");
    }

    #[tokio::test]
    async fn test_block_is_not_forwarded() {
        let mut h = harness();
        h.client_tx
            .write_all(prompt(2, "please rm -rf / now").as_bytes())
            .await
            .unwrap();
        h.client_tx
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n")
            .await
            .unwrap();

        // The first thing the agent sees is the ping, not the blocked prompt.
        let first: Value = serde_json::from_str(&read_line(&mut h.agent_stdin).await).unwrap();
        assert_eq!(first["method"], "ping");

        let notice: Value = serde_json::from_str(&read_line(&mut h.client_rx).await).unwrap();
        assert_eq!(notice["method"], "session/update");
        let text = notice["params"]["updates"][0]["text"].as_str().unwrap();
        assert!(text.contains("destructive filesystem command"));

        let refusal: Value = serde_json::from_str(&read_line(&mut h.client_rx).await).unwrap();
        assert_eq!(refusal["id"], 2);
        assert_eq!(refusal["result"]["stopReason"], "refusal");
        assert!(refusal.get("method").is_none());
    }

    #[tokio::test]
    async fn test_unsolicited_downstream_message_reaches_client() {
        let mut h = harness();
        let update = "{\"jsonrpc\":\"2.0\",\"method\":\"session/update\",\"params\":{\"sessionId\":\"sess-1\"}}\n";
        h.agent_stdout.write_all(update.as_bytes()).await.unwrap();
        assert_eq!(read_line(&mut h.client_rx).await, update);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_downstream_chatter_suppressed_and_logged() {
        let mut h = harness();
        h.agent_stdout
            .write_all(b"Starting goose session...\nloading extensions\n{\"id\":5,\"result\":{}}\n")
            .await
            .unwrap();

        assert_eq!(read_line(&mut h.client_rx).await, "{\"id\":5,\"result\":{}}\n");
        assert!(logs_contain("downstream chatter"));
        assert!(logs_contain("Starting goose session"));
    }

    #[tokio::test]
    async fn test_downstream_batch_and_scalar_json_forwarded() {
        let mut h = harness();
        h.agent_stdout
            .write_all(b"[{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}]\n42\n{\"id\":2,\"result\":{}}\n")
            .await
            .unwrap();

        assert_eq!(
            read_line(&mut h.client_rx).await,
            "[{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}]\n"
        );
        assert_eq!(read_line(&mut h.client_rx).await, "42\n");
        assert_eq!(read_line(&mut h.client_rx).await, "{\"id\":2,\"result\":{}}\n");
    }

    #[tokio::test]
    async fn test_client_eof_ends_relay_and_closes_agent_stdin() {
        let mut h = harness();
        drop(h.client_tx);

        let end = tokio::time::timeout(TIMEOUT, h.relay.wait(std::future::pending::<()>()))
            .await
            .unwrap();
        assert_eq!(end, RelayEnd::ClientClosed);

        let mut rest = String::new();
        let n = h.agent_stdin.read_line(&mut rest).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_downstream_close_ends_relay() {
        let mut h = harness();
        drop(h.agent_stdout);

        let end = tokio::time::timeout(TIMEOUT, h.relay.wait(std::future::pending::<()>()))
            .await
            .unwrap();
        assert_eq!(end, RelayEnd::DownstreamClosed);

        h.relay.stop_client(TIMEOUT).await;
        let mut rest = String::new();
        assert_eq!(h.agent_stdin.read_line(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_forwards_trailing_output() {
        let mut h = harness();
        drop(h.client_tx);
        assert_eq!(
            h.relay.wait(std::future::pending::<()>()).await,
            RelayEnd::ClientClosed
        );

        h.agent_stdout
            .write_all(b"{\"id\":9,\"result\":{\"stopReason\":\"end_turn\"}}\n")
            .await
            .unwrap();
        drop(h.agent_stdout);
        h.relay.drain(TIMEOUT).await;

        assert_eq!(
            read_line(&mut h.client_rx).await,
            "{\"id\":9,\"result\":{\"stopReason\":\"end_turn\"}}\n"
        );
    }
}
