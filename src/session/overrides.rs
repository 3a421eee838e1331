//! Model overrides and boundary rotation — the two state transitions that
//! keep session accounting honest across model changes.
//!
//! Both functions mutate an entry the caller exclusively owns and report what
//! changed; the caller decides whether to persist. Neither fails on
//! well-formed input.

use std::path::Path;

use super::store::resolve_transcript_path;
use super::types::{
    ModelOverrideSelection, ProfileOverrideSource, SessionEntry, now_rfc3339,
};

/// Result of [`apply_model_override`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedOverride {
    pub updated: bool,
}

/// Result of [`rotate_session_boundary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryRotation {
    pub rotated: bool,
    pub previous_session_id: Option<String>,
    pub next_session_id: Option<String>,
}

/// Record or clear provider/model/profile override fields on a session entry.
///
/// Fields are only touched when they actually differ, so repeated identical
/// calls report `updated == false` and cause no timestamp churn. Any mutation
/// also drops stale fallback-notice fields: a notice about an automatic model
/// fallback means nothing once the model is chosen explicitly.
pub fn apply_model_override(
    entry: &mut SessionEntry,
    selection: &ModelOverrideSelection,
    profile_override: Option<&str>,
    profile_override_source: ProfileOverrideSource,
) -> AppliedOverride {
    let mut updated = false;

    if selection.is_default {
        if entry.provider_override.take().is_some() {
            updated = true;
        }
        if entry.model_override.take().is_some() {
            updated = true;
        }
    } else {
        if entry.provider_override.as_deref() != Some(selection.provider.as_str()) {
            entry.provider_override = Some(selection.provider.clone());
            updated = true;
        }
        if entry.model_override.as_deref() != Some(selection.model.as_str()) {
            entry.model_override = Some(selection.model.clone());
            updated = true;
        }
    }

    match profile_override.filter(|profile| !profile.is_empty()) {
        Some(profile) => {
            if entry.auth_profile_override.as_deref() != Some(profile) {
                entry.auth_profile_override = Some(profile.to_string());
                updated = true;
            }
            if entry.auth_profile_override_source != Some(profile_override_source) {
                entry.auth_profile_override_source = Some(profile_override_source);
                updated = true;
            }
            // The compaction-count marker is one-shot; any override mutation
            // retires it.
            if entry.auth_profile_override_compaction_count.take().is_some() {
                updated = true;
            }
        }
        None => {
            if entry.auth_profile_override.take().is_some() {
                updated = true;
            }
            if entry.auth_profile_override_source.take().is_some() {
                updated = true;
            }
            if entry.auth_profile_override_compaction_count.take().is_some() {
                updated = true;
            }
        }
    }

    if updated {
        entry.fallback_notice_selected_model = None;
        entry.fallback_notice_active_model = None;
        entry.fallback_notice_reason = None;
        entry.updated_at = Some(now_rfc3339());
    }

    AppliedOverride { updated }
}

/// Start a fresh accounting boundary when the effective model label changes.
///
/// No-op when `next_label` is empty or equals `previous_label` — this is the
/// only gate keeping counters from silently spanning two models, so it is
/// called on every label comparison and must stay cheap on the unchanged
/// path. On rotation the entry gets a new session id and transcript target
/// (thread correlation preserved) and every boundary-scoped counter and flag
/// is reset in place. The previous session id is returned for audit logging.
pub fn rotate_session_boundary(
    entry: &mut SessionEntry,
    previous_label: &str,
    next_label: &str,
    agent_id: Option<&str>,
    workspace_dir: &Path,
) -> BoundaryRotation {
    if next_label.is_empty() || next_label == previous_label {
        return BoundaryRotation::default();
    }

    let previous_session_id = entry.session_id.clone();
    let next_session_id = uuid::Uuid::new_v4().to_string();

    entry.session_id = next_session_id.clone();
    entry.session_file = Some(
        resolve_transcript_path(
            workspace_dir,
            &next_session_id,
            agent_id,
            entry.last_thread_id.as_deref(),
        )
        .to_string_lossy()
        .into_owned(),
    );
    entry.system_sent = false;
    entry.aborted_last_run = false;
    entry.input_tokens = None;
    entry.output_tokens = None;
    entry.total_tokens = None;
    entry.total_tokens_fresh = None;
    entry.context_tokens = None;
    entry.compaction_count = 0;
    entry.memory_flush_at = None;
    entry.memory_flush_compaction_count = None;
    entry.system_prompt_report = None;
    entry.cli_session_ids = None;
    entry.claude_cli_session_id = None;
    entry.updated_at = Some(now_rfc3339());

    tracing::info!(
        previous = %previous_session_id,
        next = %next_session_id,
        from = previous_label,
        to = next_label,
        "rotated session boundary for model switch"
    );

    BoundaryRotation {
        rotated: true,
        previous_session_id: Some(previous_session_id),
        next_session_id: Some(next_session_id),
    }
}
