//! nete-core - Core library for nete
//!
//! This crate contains the shared models, note storage, the HTTP client used
//! to talk to a backend, and the synchronization engine that reconciles two
//! replicas of a note collection.

pub mod client;
pub mod error;
pub mod models;
pub mod storage;
pub mod sync;
pub mod util;

pub use client::{ClientError, NeteClient, NeteUrl};
pub use error::{Error, Result};
pub use models::{Note, NoteDraft, NoteId, NoteIndexEntry, NoteSummary, RevisionId, SyncStatus};
pub use storage::{FilesystemNoteStore, MemoryNoteStore, NoteStore};
pub use sync::{RemoteNoteClient, SyncError, SyncReport, Synchronizer};
