//! goose-operator core: transport-agnostic admission control for agent prompts.
//!
//! This library holds everything the proxy decides without touching a pipe:
//! JSON-RPC classification, the decoded [`protocol::Message`] model and prompt
//! extraction, configuration loading, the file-backed policy store, the ordered
//! intent classifier, and the [`governance::AdmissionEngine`] that turns a
//! prompt into an allow / mutate / block verdict.
//!
//! The `goose-operator` binary crate drives this engine from two places: the
//! streaming relay and the one-shot runner.

pub mod config;
pub mod governance;
pub mod jsonrpc;
pub mod policy;
pub mod protocol;

/// Direction of traffic through the proxy.
///
/// Used as a structured logging field and to tag framing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    /// Editor/client stdin towards the agent's stdin.
    ClientToAgent,
    /// Agent stdout back towards the editor/client stdout.
    AgentToClient,
}

impl StreamDirection {
    /// Stable label for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamDirection::ClientToAgent => "client_to_agent",
            StreamDirection::AgentToClient => "agent_to_client",
        }
    }
}

impl std::fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
