// crates/aegisflux-decision/src/segment.rs
// ============================================================================
// Module: Target Segmenter
// Description: Expands the primary target into related rollout targets.
// Purpose: Bound blast radius with ranked, related targets.
// Dependencies: aegisflux-core, tracing
// ============================================================================

//! ## Overview
//! Segmentation expands the primary target to at most `limit` related
//! targets ranked by `risk_score x confidence` descending. With no graph
//! data available, deterministic host-name-prefix fallbacks apply: `web`
//! hosts relate to their `db` and `lb` counterparts, `db` hosts to their
//! `app` counterpart, and everything else to a peer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::sync::Arc;

use aegisflux_core::RelatedTarget;
use aegisflux_core::Relationship;
use aegisflux_core::RiskLevel;

use crate::reasoner::Reasoner;

// ============================================================================
// SECTION: Segmenter
// ============================================================================

/// Third pipeline stage.
pub struct Segmenter {
    /// Optional reasoning provider with graph knowledge.
    reasoner: Option<Arc<dyn Reasoner>>,
}

impl Segmenter {
    /// Creates a segmenter with an optional reasoner.
    #[must_use]
    pub fn new(reasoner: Option<Arc<dyn Reasoner>>) -> Self {
        Self {
            reasoner,
        }
    }

    /// Expands the primary target to at most `limit` ranked related
    /// targets.
    pub async fn segment(&self, primary: &str, limit: usize) -> Vec<RelatedTarget> {
        let mut related = if let Some(reasoner) = &self.reasoner {
            match reasoner.related_targets(primary, limit).await {
                Ok(related) => related,
                Err(err) => {
                    tracing::warn!(
                        primary,
                        error = %err,
                        "reasoner segmentation failed, using prefix fallback"
                    );
                    Self::fallback_related(primary)
                }
            }
        } else {
            Self::fallback_related(primary)
        };
        rank_and_truncate(&mut related, limit);
        related
    }

    /// Deterministic host-name-prefix fallback.
    #[must_use]
    pub fn fallback_related(primary: &str) -> Vec<RelatedTarget> {
        let (prefix, suffix) = match primary.split_once('-') {
            Some((prefix, suffix)) => (prefix, suffix),
            None => (primary, ""),
        };
        let counterpart = |tier: &str| {
            if suffix.is_empty() { tier.to_string() } else { format!("{tier}-{suffix}") }
        };
        match prefix {
            "web" => vec![
                related(counterpart("db"), Relationship::Dependency, 0.8, 0.7),
                related(counterpart("lb"), Relationship::Upstream, 0.6, 0.6),
            ],
            "db" => vec![related(counterpart("app"), Relationship::Downstream, 0.7, 0.65)],
            _ => vec![related(format!("{primary}-peer"), Relationship::Peer, 0.5, 0.5)],
        }
    }
}

// ============================================================================
// SECTION: Ranking
// ============================================================================

/// Builds one related host target.
fn related(
    target_id: String,
    relationship: Relationship,
    risk_score: f64,
    confidence: f64,
) -> RelatedTarget {
    RelatedTarget {
        target_id,
        target_type: "host".to_string(),
        relationship,
        risk_score,
        risk_level: risk_level(risk_score),
        confidence,
    }
}

/// Classifies a risk score.
fn risk_level(score: f64) -> RiskLevel {
    if score >= 0.75 {
        RiskLevel::High
    } else if score >= 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Sorts by `risk_score x confidence` descending and truncates to `limit`.
fn rank_and_truncate(related: &mut Vec<RelatedTarget>, limit: usize) {
    related.sort_by(|a, b| {
        let left = b.risk_score * b.confidence;
        let right = a.risk_score * a.confidence;
        left.partial_cmp(&right).unwrap_or(Ordering::Equal)
    });
    related.truncate(limit);
}
