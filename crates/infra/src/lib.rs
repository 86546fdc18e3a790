//! Infrastructure layer: record stores and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use store::{
    InMemoryRecordStore, InMemorySingletonStore, RecordStore, SingletonStore, StoreError,
    StoreResult,
};

#[cfg(feature = "postgres")]
pub use store::postgres::{PostgresRecordStore, PostgresSingletonStore};
