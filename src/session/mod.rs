//! Session state and the store that owns it.
//!
//! DESIGN
//! ======
//! `types` holds the value types (`SessionState`, `Record`) that get
//! snapshotted, persisted and handed to observers. `store` holds the single
//! mutable owner of that state and the observer registry. Nothing outside the
//! store can mutate a `SessionState`; callers only ever see snapshots.

pub mod store;
pub mod types;
