//! Database layer for the local store

mod connection;
mod migrations;
mod queue_repository;
mod record_repository;

pub use connection::Database;
pub use queue_repository::{LibSqlQueueRepository, ResponseCacheRepository, SyncQueueRepository};
pub use record_repository::{LibSqlRecordRepository, RecordRepository};
