//! Per-iteration and per-postcondition verification outcomes.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::message::AnalysisMessage;

/// Overall verdict for a postcondition, or for a single path's contribution
/// to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Confirmed,
    Refuted,
    Unknown,
}

impl VerificationStatus {
    /// `spec.md` §3: "refuted dominates confirmed, which dominates unknown".
    pub fn worse_of(self, other: Self) -> Self {
        use VerificationStatus::*;
        match (self, other) {
            (Refuted, _) | (_, Refuted) => Refuted,
            (Unknown, _) | (_, Unknown) => Unknown,
            (Confirmed, Confirmed) => Confirmed,
        }
    }
}

/// Per-iteration outcome (`spec.md` §3 "Call Analysis").
///
/// `verification_status: None` stands for the spec's "none" status — an
/// ignored path that contributes no verdict at all.
#[derive(Debug, Clone, Default)]
pub struct CallAnalysis {
    pub verification_status: Option<VerificationStatus>,
    pub failing_precondition: Option<Condition>,
    pub failing_precondition_reason: Option<String>,
    pub messages: Vec<AnalysisMessage>,
}

impl CallAnalysis {
    pub fn status(status: VerificationStatus, messages: Vec<AnalysisMessage>) -> Self {
        Self {
            verification_status: Some(status),
            failing_precondition: None,
            failing_precondition_reason: None,
            messages,
        }
    }

    pub fn confirmed() -> Self {
        Self::status(VerificationStatus::Confirmed, Vec::new())
    }

    pub fn refuted(messages: Vec<AnalysisMessage>) -> Self {
        Self::status(VerificationStatus::Refuted, messages)
    }

    /// "None" verdict: the path is discarded without contributing anything
    /// (an ignore-attempt signal converted at the `CallDriver` boundary).
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn failing_precondition(condition: Condition, reason: Option<String>) -> Self {
        Self {
            verification_status: None,
            failing_precondition: Some(condition),
            failing_precondition_reason: reason,
            messages: Vec::new(),
        }
    }
}

/// Aggregate outcome for a single postcondition across every explored path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTreeAnalysis {
    pub messages: Vec<AnalysisMessage>,
    pub verification_status: VerificationStatus,
    pub num_confirmed_paths: u32,
}
