// crates/aegisflux-decision/src/policy.rs
// ============================================================================
// Module: Policy Writer
// Description: Compiles control intents into simulated policy controls.
// Purpose: Render deterministic policy artifacts from intent fields.
// Dependencies: aegisflux-core, uuid
// ============================================================================

//! ## Overview
//! Each intent becomes one [`PolicyControl`] in `simulate` mode. Scope is
//! inferred as explicit > pid > cgroup > finding host > `host/unknown`.
//! Artifact rendering is purely templated from intent fields; no network
//! calls are involved. The primary artifact kind follows the intent's
//! control type; a Kubernetes preview rides along for cluster rollouts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use aegisflux_core::ControlIntent;
use aegisflux_core::Finding;
use aegisflux_core::PolicyArtifact;
use aegisflux_core::PolicyArtifactKind;
use aegisflux_core::PolicyControl;
use uuid::Uuid;

use crate::planner::TARGET_FINDING_HOST;

// ============================================================================
// SECTION: Policy Writer
// ============================================================================

/// Second pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyWriter;

impl PolicyWriter {
    /// Creates a policy writer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compiles intents into simulated controls.
    ///
    /// `default_ttl_seconds` applies to intents that declare no lifetime;
    /// it comes from live config or `DECISION_DEFAULT_TTL_SECONDS`.
    #[must_use]
    pub fn compile(
        &self,
        finding: &Finding,
        intents: &[ControlIntent],
        default_ttl_seconds: u64,
    ) -> Vec<PolicyControl> {
        intents
            .iter()
            .map(|intent| self.compile_intent(finding, intent, default_ttl_seconds))
            .collect()
    }

    /// Compiles one intent.
    fn compile_intent(
        &self,
        finding: &Finding,
        intent: &ControlIntent,
        default_ttl_seconds: u64,
    ) -> PolicyControl {
        let (scope, scope_id) = infer_scope(finding, intent);
        let ttl_seconds =
            if intent.ttl_seconds > 0 { intent.ttl_seconds } else { default_ttl_seconds };
        let target = resolve_target(finding, intent);
        let kind = artifact_kind(&intent.control_type);
        let mut artifacts = vec![render_artifact(kind, intent, &target, ttl_seconds, false)];
        if kind != PolicyArtifactKind::Kubernetes {
            artifacts.push(render_artifact(
                PolicyArtifactKind::Kubernetes,
                intent,
                &target,
                ttl_seconds,
                true,
            ));
        }
        PolicyControl {
            control_id: Uuid::new_v4().to_string(),
            control_type: intent.control_type.clone(),
            mode: "simulate".to_string(),
            scope,
            scope_id,
            ttl_seconds,
            artifacts,
        }
    }
}

// ============================================================================
// SECTION: Inference Helpers
// ============================================================================

/// Infers (scope, scope_id): explicit > pid > cgroup > host > unknown.
fn infer_scope(finding: &Finding, intent: &ControlIntent) -> (String, String) {
    if let Some(explicit) = &intent.scope {
        return match explicit.split_once('/') {
            Some((kind, id)) => (kind.to_string(), id.to_string()),
            None => ("host".to_string(), explicit.clone()),
        };
    }
    if let Some(pid) = intent.pid {
        return ("pid".to_string(), pid.to_string());
    }
    if let Some(cgroup) = &intent.cgroup {
        return ("cgroup".to_string(), cgroup.clone());
    }
    if !finding.host_id.as_str().is_empty() {
        return ("host".to_string(), finding.host_id.to_string());
    }
    ("host".to_string(), "unknown".to_string())
}

/// Resolves the `finding_host` sentinel to the actual host.
fn resolve_target(finding: &Finding, intent: &ControlIntent) -> String {
    if intent.target == TARGET_FINDING_HOST && !finding.host_id.as_str().is_empty() {
        finding.host_id.to_string()
    } else {
        intent.target.clone()
    }
}

/// Maps a control type onto its primary artifact kind.
fn artifact_kind(control_type: &str) -> PolicyArtifactKind {
    if control_type.starts_with("cilium") {
        PolicyArtifactKind::Cilium
    } else if control_type.starts_with("ebpf") {
        PolicyArtifactKind::Ebpf
    } else if control_type.starts_with("k8s") || control_type.starts_with("kubernetes") {
        PolicyArtifactKind::Kubernetes
    } else {
        PolicyArtifactKind::Nftables
    }
}

// ============================================================================
// SECTION: Artifact Templates
// ============================================================================

/// Renders one artifact from intent fields.
fn render_artifact(
    kind: PolicyArtifactKind,
    intent: &ControlIntent,
    target: &str,
    ttl_seconds: u64,
    preview: bool,
) -> PolicyArtifact {
    let content = match kind {
        PolicyArtifactKind::Nftables => format!(
            "add table inet aegisflux\n\
             add chain inet aegisflux egress {{ type filter hook output priority 0 ; policy accept ; }}\n\
             add rule inet aegisflux egress meta l4proto tcp counter drop comment \"{}:{}\"\n",
            intent.control_type, target
        ),
        PolicyArtifactKind::Cilium => format!(
            "apiVersion: cilium.io/v2\n\
             kind: CiliumNetworkPolicy\n\
             metadata:\n  name: aegisflux-{}\nspec:\n  endpointSelector:\n    matchLabels:\n      host: {}\n  egressDeny:\n  - toEntities:\n    - world\n",
            intent.control_type, target
        ),
        PolicyArtifactKind::Ebpf => format!(
            "program: {}\nattach: cgroup_skb/egress\ntarget: {}\nverdict: drop\n",
            intent.control_type, target
        ),
        PolicyArtifactKind::Kubernetes => format!(
            "apiVersion: networking.k8s.io/v1\n\
             kind: NetworkPolicy\n\
             metadata:\n  name: aegisflux-{}\nspec:\n  podSelector:\n    matchLabels:\n      host: {}\n  policyTypes:\n  - Egress\n",
            intent.control_type, target
        ),
    };
    let mut metadata = BTreeMap::new();
    metadata.insert("template".to_string(), format!("{}_v1", kind.as_str()));
    metadata.insert("action".to_string(), intent.action.clone());
    metadata.insert("target".to_string(), target.to_string());
    metadata.insert("ttl_seconds".to_string(), ttl_seconds.to_string());
    PolicyArtifact {
        kind,
        content,
        metadata,
        preview,
    }
}
