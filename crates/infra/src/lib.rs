//! Infrastructure layer: persistence backends, change feed, orchestration, config.

pub mod config;
pub mod notify;
pub mod service;
pub mod store;


pub use config::{AppConfig, ConfigError, StoreBackend};
pub use notify::{ChangeFeed, ChangeKind, NotifyingVoucherStore, VoucherChange};
pub use service::{ServiceError, VoucherService};
pub use store::{
    AnyVoucherStore, InMemoryVoucherStore, LocalVoucherStore, PostgresVoucherStore, StoreError,
    VoucherStore,
};
