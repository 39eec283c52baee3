//! Journal entries stored locally in SQLite, with debounced backup and
//! sharing through Google Drive.

pub mod config;
pub mod storage;
pub mod sync;
