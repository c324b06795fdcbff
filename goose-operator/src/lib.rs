//! goose-operator: stdio admission-control proxy for goose agents.
//!
//! The streaming driver ([`proxy`]) and the one-shot driver ([`oneshot`])
//! share one [`goose_operator_core::governance::AdmissionEngine`].

pub mod cli;
pub mod downstream;
pub mod error;
pub mod framing;
pub mod lifecycle;
pub mod oneshot;
pub mod proxy;
pub mod relay;
