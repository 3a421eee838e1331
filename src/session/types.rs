//! Session types — the persisted session index entry and override selections.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Where a profile override came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileOverrideSource {
    Auto,
    User,
}

/// An entry in the session index (sessions.json).
///
/// The index is shared with the operator tooling that predates this crate, so
/// field names stay camelCase on disk. Optional fields are cleared by setting
/// them to `None`; absent fields are omitted from the serialized entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionEntry {
    pub session_id: String,
    /// Transcript path for the current accounting boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,

    // ── Model / profile overrides ────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_profile_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_profile_override_source: Option<ProfileOverrideSource>,
    /// One-shot marker tying a profile override to a compaction count; not a
    /// persistent override attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_profile_override_compaction_count: Option<u64>,

    // ── Accounting counters for the current boundary ─────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens_fresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<u64>,
    pub compaction_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_flush_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_flush_compaction_count: Option<u64>,

    // ── Run state ────────────────────────────────────────────────
    pub system_sent: bool,
    pub aborted_last_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_report: Option<serde_json::Value>,

    // ── Provider-CLI correlation ─────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_session_ids: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_cli_session_id: Option<String>,

    // ── Fallback notice (stale once the model is chosen explicitly) ──
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_notice_selected_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_notice_active_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_notice_reason: Option<String>,

    /// Thread/topic correlation id that survives boundary rotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl SessionEntry {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }
}

/// A requested provider/model selection, or the "use default" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOverrideSelection {
    pub provider: String,
    pub model: String,
    /// True when the selection means "drop overrides, use the account
    /// default" rather than a concrete pair.
    pub is_default: bool,
}

impl ModelOverrideSelection {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            is_default: false,
        }
    }

    pub fn account_default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            is_default: true,
        }
    }
}

/// RFC-3339 stamp used for `updated_at` fields.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
