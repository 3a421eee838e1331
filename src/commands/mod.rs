//! Inbound text commands — alias matching, authorization, and dispatch.
//!
//! The channel layer hands every inbound body to the dispatcher; a handler
//! that returns `None` lets the message fall through to normal agent
//! processing. `/cache_report` has four accepted surface forms, all one
//! semantic command: the alias set lives in one place so its behavior stays
//! provably exhaustive.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::report::scope::{ScopeArgs, parse_scope_args};
use crate::report::{ReportError, ReportRequest};
use crate::session::store::resolve_session_file;
use crate::session::types::SessionEntry;

/// Reply for a matched command whose arguments yield no parseable scope.
pub const CACHE_REPORT_USAGE_HINT: &str = "⚙️ Usage: /cache_report [session|turns N]";

// Alias surface forms, each anchored to end-of-message so a wrapped body
// ending in the command still matches and a mid-sentence mention does not.
static CACHE_REPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)(?:^|\s)/cache_report(?:\s+(?<args>.*))?$",
        r"(?is)(?:^|\s)/cache-report(?:\s+(?<args>.*))?$",
        r"(?is)(?:^|\s)/cache\s+report(?:\s+(?<args>.*))?$",
        r"(?is)(?:^|\s)cache\s+report(?:\s+(?<args>.*))?$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static command pattern"))
    .collect()
});

/// Match a message body against the cache-report alias set.
///
/// Returns the trimmed argument string on a match, `None` otherwise.
pub fn match_cache_report(body: &str) -> Option<String> {
    let trimmed = body.trim();
    for pattern in CACHE_REPORT_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(trimmed) {
            let args = captures.name("args").map_or("", |m| m.as_str());
            return Some(args.trim().to_string());
        }
    }
    None
}

/// Match and parse in one step; `None` means "not this command".
pub fn parse_cache_report_args(body: &str) -> Option<ScopeArgs> {
    match_cache_report(body).map(|args| parse_scope_args(&args))
}

/// One inbound message, as seen by command handlers. The outer dispatcher has
/// already normalized the body and decided sender authorization.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub body: String,
    pub session_key: String,
    pub sender_id: String,
    pub is_authorized: bool,
    pub allow_text_commands: bool,
    pub provider: String,
    pub model: String,
    pub agent_id: Option<String>,
    pub session_entry: Option<SessionEntry>,
}

/// A handled command. `reply: None` means "handled, suppress any reply" —
/// used for unauthorized senders, which must not fall through to other
/// handlers either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub reply: Option<String>,
}

/// What the dispatcher tells the channel layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub handled: bool,
    pub reply: Option<String>,
}

/// A text command. Returning `None` lets the message continue to the agent.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, request: &CommandRequest) -> Option<CommandOutcome>;
}

/// Walks registered handlers and stops at the first one that claims the
/// message.
pub struct CommandDispatcher {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register(mut self, handler: Box<dyn CommandHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub async fn dispatch(&self, request: &CommandRequest) -> DispatchResult {
        for handler in &self.handlers {
            if let Some(outcome) = handler.handle(request).await {
                tracing::debug!(handler = handler.name(), "command handled");
                return DispatchResult {
                    handled: true,
                    reply: outcome.reply,
                };
            }
        }
        DispatchResult {
            handled: false,
            reply: None,
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ── /cache_report ────────────────────────────────────────────────

/// The `/cache_report` handler.
pub struct CacheReportCommand {
    workspace_dir: PathBuf,
}

impl CacheReportCommand {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for CacheReportCommand {
    fn name(&self) -> &str {
        "cache_report"
    }

    async fn handle(&self, request: &CommandRequest) -> Option<CommandOutcome> {
        if !request.allow_text_commands {
            return None;
        }
        match_cache_report(&request.body)?;

        if !request.is_authorized {
            let sender = if request.sender_id.is_empty() {
                "<unknown>"
            } else {
                request.sender_id.as_str()
            };
            tracing::debug!(sender, "ignoring /cache_report from unauthorized sender");
            return Some(CommandOutcome { reply: None });
        }

        Some(CommandOutcome {
            reply: Some(build_cache_report_reply(request, &self.workspace_dir)),
        })
    }
}

/// Build the reply text for a cache-report request. Every failure resolves to
/// a string; nothing propagates.
pub fn build_cache_report_reply(request: &CommandRequest, workspace_dir: &Path) -> String {
    let Some(args) = parse_cache_report_args(&request.body) else {
        return CACHE_REPORT_USAGE_HINT.to_string();
    };

    let session_file = request
        .session_entry
        .as_ref()
        .and_then(|entry| resolve_session_file(entry, workspace_dir, request.agent_id.as_deref()));

    crate::report::run(&ReportRequest {
        session_file,
        session_key: request.session_key.as_str(),
        provider: request.provider.as_str(),
        model: request.model.as_str(),
        args,
    })
    .unwrap_or_else(|err: ReportError| err.to_string())
}
