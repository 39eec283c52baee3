mod insights;
mod models;
mod service;
mod sqlite_storage;

pub use insights::{MoodCount, MoodInsights, MoodPoint, MOOD_TREND_POINTS};
pub use models::*;
pub use service::PersistenceService;
pub use sqlite_storage::{SqliteStorage, StorageError};
