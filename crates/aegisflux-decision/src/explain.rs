// crates/aegisflux-decision/src/explain.rs
// ============================================================================
// Module: Explainer
// Description: Operator-readable plan summaries with secret redaction.
// Purpose: Produce 3-6 bullets from the assembled plan.
// Dependencies: aegisflux-core, tracing
// ============================================================================

//! ## Overview
//! The template explanation summarizes the finding, the decided strategy,
//! targets, compiled controls, and the plan lifetime. Reasoner output,
//! when present, is preferred but always passed through
//! [`redact_secrets`]; any reasoner failure falls back to the template. A
//! fully failed generation yields the literal [`EXPLANATION_FALLBACK`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use aegisflux_core::Plan;

use crate::reasoner::Reasoner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Literal recorded when no explanation could be generated.
pub const EXPLANATION_FALLBACK: &str = "Plan explanation could not be generated";

/// Key fragments whose values are masked during redaction.
const SECRET_KEY_FRAGMENTS: [&str; 7] =
    ["password", "secret", "token", "api_key", "apikey", "credential", "private_key"];

/// Mask substituted for redacted values.
const REDACTION_MASK: &str = "[REDACTED]";

// ============================================================================
// SECTION: Explainer
// ============================================================================

/// Fifth pipeline stage.
pub struct Explainer {
    /// Optional reasoning provider.
    reasoner: Option<Arc<dyn Reasoner>>,
}

impl Explainer {
    /// Creates an explainer with an optional reasoner.
    #[must_use]
    pub fn new(reasoner: Option<Arc<dyn Reasoner>>) -> Self {
        Self {
            reasoner,
        }
    }

    /// Produces the redacted explanation for an assembled plan.
    pub async fn explain(&self, plan: &Plan) -> String {
        if let Some(reasoner) = &self.reasoner {
            match reasoner.explain_plan(plan).await {
                Ok(text) if !text.trim().is_empty() => return redact_secrets(&text),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        plan = %plan.id,
                        error = %err,
                        "reasoner explanation failed, using template"
                    );
                }
            }
        }
        let rendered = template_explanation(plan);
        if rendered.trim().is_empty() {
            EXPLANATION_FALLBACK.to_string()
        } else {
            redact_secrets(&rendered)
        }
    }
}

// ============================================================================
// SECTION: Template
// ============================================================================

/// Renders the deterministic 3-6 bullet summary.
#[must_use]
pub fn template_explanation(plan: &Plan) -> String {
    let finding = &plan.finding;
    let mut bullets = vec![
        format!(
            "- {} finding on host {} (rule {}, confidence {:.2}).",
            finding.severity.as_str(),
            finding.host_id,
            finding.rule_id,
            finding.confidence
        ),
        format!(
            "- Strategy {} with canary size {}.",
            plan.strategy.mode.as_str(),
            plan.strategy.canary_size
        ),
        format!(
            "- {} target(s); primary {}.",
            plan.targets.len(),
            plan.targets.first().map_or("none", String::as_str)
        ),
    ];
    if plan.controls.is_empty() {
        bullets.push("- No controls compiled; the plan records intent only.".to_string());
    } else {
        let kinds: Vec<&str> = plan
            .controls
            .iter()
            .flat_map(|control| control.artifacts.iter())
            .filter(|artifact| !artifact.preview)
            .map(|artifact| artifact.kind.as_str())
            .collect();
        bullets.push(format!(
            "- {} control(s) compiled in simulate mode ({}).",
            plan.controls.len(),
            kinds.join(", ")
        ));
    }
    bullets.push(format!("- Plan expires after {} seconds.", plan.ttl_seconds));
    bullets.join("\n")
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Masks values of secret-looking `key=value` / `key: value` tokens.
///
/// Both attached values (`password=x`) and space-separated ones
/// (`password: x`) are masked.
#[must_use]
pub fn redact_secrets(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut redacted: Vec<String> = Vec::new();
        let mut mask_next = false;
        for token in line.split(' ') {
            if mask_next && !token.is_empty() {
                redacted.push(REDACTION_MASK.to_string());
                mask_next = false;
                continue;
            }
            redacted.push(match split_on_separator(token) {
                Some((key, separator, value)) if is_secret_key(key) => {
                    if value.is_empty() {
                        mask_next = true;
                        token.to_string()
                    } else {
                        format!("{key}{separator}{REDACTION_MASK}")
                    }
                }
                _ => token.to_string(),
            });
        }
        out.push(redacted.join(" "));
    }
    out.join("\n")
}

/// Splits a token on its first `=` or `:` separator.
fn split_on_separator(token: &str) -> Option<(&str, char, &str)> {
    let index = token.find(['=', ':'])?;
    let separator = token[index ..].chars().next()?;
    Some((&token[.. index], separator, &token[index + 1 ..]))
}

/// Returns true when a key names secret material.
fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}
