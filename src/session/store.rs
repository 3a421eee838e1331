//! Session index persistence and transcript path resolution.
//!
//! The index (sessions.json) maps a session key (`channel:peer`) to its
//! [`SessionEntry`]. Access is cached and lazy-loaded; every mutation
//! persists atomically (temp file then rename) so a crash mid-write never
//! corrupts the index.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use super::types::SessionEntry;

/// Agent scope used when none is given.
pub const DEFAULT_AGENT_ID: &str = "main";

/// Transcript target for a session id under an agent scope.
///
/// `<workspace>/sessions/<agent>/<session-id>.jsonl`, with a `-topic-<id>`
/// suffix when a thread correlation id exists.
pub fn resolve_transcript_path(
    workspace_dir: &Path,
    session_id: &str,
    agent_id: Option<&str>,
    thread_id: Option<&str>,
) -> PathBuf {
    let agent = match agent_id {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_AGENT_ID,
    };
    let file_name = match thread_id {
        Some(thread) if !thread.is_empty() => format!("{session_id}-topic-{thread}.jsonl"),
        _ => format!("{session_id}.jsonl"),
    };
    workspace_dir.join("sessions").join(agent).join(file_name)
}

/// Resolve the transcript file for an entry.
///
/// A non-empty `session_file` on the entry wins (tilde-expanded); otherwise
/// the path is derived from the session id. `None` means "no session file
/// resolvable" — the caller's resource-absence condition.
pub fn resolve_session_file(
    entry: &SessionEntry,
    workspace_dir: &Path,
    agent_id: Option<&str>,
) -> Option<PathBuf> {
    if let Some(file) = entry.session_file.as_deref() {
        let trimmed = file.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(shellexpand::tilde(trimmed).into_owned()));
        }
    }
    if entry.session_id.is_empty() {
        return None;
    }
    Some(resolve_transcript_path(
        workspace_dir,
        &entry.session_id,
        agent_id,
        entry.last_thread_id.as_deref(),
    ))
}

/// Manages the sessions.json index file.
pub struct SessionStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, SessionEntry>>,
    loaded: AtomicBool,
}

impl SessionStore {
    /// Create a store rooted at `dir`. The index file is `dir/sessions.json`.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            cache: Mutex::new(HashMap::new()),
            loaded: AtomicBool::new(false),
        }
    }

    /// Look up a session by key. Returns `None` if it does not exist.
    pub fn get(&self, session_key: &str) -> Result<Option<SessionEntry>> {
        self.ensure_loaded()?;
        let guard = self
            .cache
            .lock()
            .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;
        Ok(guard.get(session_key).cloned())
    }

    /// Insert or update an entry, then persist to disk.
    pub fn set(&self, session_key: &str, entry: SessionEntry) -> Result<()> {
        self.ensure_loaded()?;
        {
            let mut guard = self
                .cache
                .lock()
                .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;
            guard.insert(session_key.to_string(), entry);
        }
        self.persist()
    }

    /// All entries, sorted by session key.
    pub fn list(&self) -> Result<Vec<(String, SessionEntry)>> {
        self.ensure_loaded()?;
        let guard = self
            .cache
            .lock()
            .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;
        let mut entries: Vec<(String, SessionEntry)> = guard
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Remove a session from the index. Returns `true` if it existed.
    pub fn remove(&self, session_key: &str) -> Result<bool> {
        self.ensure_loaded()?;
        let existed;
        {
            let mut guard = self
                .cache
                .lock()
                .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;
            existed = guard.remove(session_key).is_some();
        }
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    // ── Internal helpers ─────────────────────────────────────────

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        let index_path = self.index_path();
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;

        // Double-check under the lock.
        if self.loaded.load(Ordering::Relaxed) {
            return Ok(());
        }

        if index_path.exists() {
            let data = fs::read_to_string(&index_path)
                .with_context(|| format!("reading {}", index_path.display()))?;
            let entries: BTreeMap<String, SessionEntry> = serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", index_path.display()))?;
            guard.extend(entries);
        }

        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Serialize the cache to sessions.json atomically, keys sorted.
    fn persist(&self) -> Result<()> {
        let index_path = self.index_path();

        if let Some(parent) = index_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let guard = self
            .cache
            .lock()
            .map_err(|e| anyhow::anyhow!("session store lock poisoned: {e}"))?;

        let entries: BTreeMap<&String, &SessionEntry> = guard.iter().collect();
        let data = serde_json::to_string_pretty(&entries).context("serializing sessions index")?;

        let tmp_path = index_path.with_extension("json.tmp");
        fs::write(&tmp_path, &data)
            .with_context(|| format!("writing temp file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &index_path).with_context(|| {
            format!(
                "renaming {} to {}",
                tmp_path.display(),
                index_path.display()
            )
        })?;

        Ok(())
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("sessions.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str) -> SessionEntry {
        SessionEntry::new(id)
    }

    #[test]
    fn transcript_paths_follow_the_naming_convention() {
        let workspace = Path::new("/ws");

        assert_eq!(
            resolve_transcript_path(workspace, "sess-1", None, None),
            PathBuf::from("/ws/sessions/main/sess-1.jsonl")
        );
        assert_eq!(
            resolve_transcript_path(workspace, "sess-1", Some("support"), None),
            PathBuf::from("/ws/sessions/support/sess-1.jsonl")
        );
        assert_eq!(
            resolve_transcript_path(workspace, "sess-1", Some("main"), Some("t42")),
            PathBuf::from("/ws/sessions/main/sess-1-topic-t42.jsonl")
        );
    }

    #[test]
    fn explicit_session_file_wins_over_derived_path() {
        let mut e = entry("sess-1");
        e.session_file = Some("/var/log/agent/sess-1.jsonl".into());

        let resolved = resolve_session_file(&e, Path::new("/ws"), None).unwrap();
        assert_eq!(resolved, PathBuf::from("/var/log/agent/sess-1.jsonl"));
    }

    #[test]
    fn blank_session_file_falls_back_to_derived_path() {
        let mut e = entry("sess-1");
        e.session_file = Some("   ".into());
        e.last_thread_id = Some("t7".into());

        let resolved = resolve_session_file(&e, Path::new("/ws"), Some("ops")).unwrap();
        assert_eq!(resolved, PathBuf::from("/ws/sessions/ops/sess-1-topic-t7.jsonl"));
    }

    #[test]
    fn entry_without_id_or_file_is_unresolvable() {
        let e = SessionEntry::default();
        assert!(resolve_session_file(&e, Path::new("/ws"), None).is_none());
    }

    #[test]
    fn store_get_set_list_remove() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());

        assert!(store.list().unwrap().is_empty());
        assert!(store.get("whatsapp:+1555").unwrap().is_none());

        store.set("whatsapp:+1555", entry("sess-1")).unwrap();
        store.set("telegram:42", entry("sess-2")).unwrap();

        let got = store.get("whatsapp:+1555").unwrap().unwrap();
        assert_eq!(got.session_id, "sess-1");

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        // Sorted by key.
        assert_eq!(all[0].0, "telegram:42");

        assert!(store.remove("telegram:42").unwrap());
        assert!(!store.remove("telegram:42").unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn store_persists_to_disk_and_reloads() {
        let tmp = TempDir::new().unwrap();

        {
            let store = SessionStore::new(tmp.path());
            let mut e = entry("sess-1");
            e.total_tokens = Some(999);
            store.set("whatsapp:+1555", e).unwrap();
        }

        {
            let store = SessionStore::new(tmp.path());
            let got = store.get("whatsapp:+1555").unwrap().unwrap();
            assert_eq!(got.total_tokens, Some(999));
        }
    }

    #[test]
    fn upsert_replaces_the_entry() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());

        store.set("k", entry("sess-1")).unwrap();
        store.set("k", entry("sess-2")).unwrap();

        assert_eq!(store.get("k").unwrap().unwrap().session_id, "sess-2");
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
