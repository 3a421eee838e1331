//! Session state — index entries, persistence, and the model-switch
//! transitions that reset accounting boundaries.

pub mod overrides;
pub mod store;
pub mod types;

pub use overrides::{AppliedOverride, BoundaryRotation, apply_model_override, rotate_session_boundary};
pub use store::{SessionStore, resolve_session_file, resolve_transcript_path};
pub use types::{ModelOverrideSelection, ProfileOverrideSource, SessionEntry};
