//! Prompt governance: rule classification and admission decisions.

pub mod admission;
pub mod classifier;

pub use admission::{Admission, AdmissionEngine, Verdict};
pub use classifier::{Classification, IntentClassifier, Outcome};
