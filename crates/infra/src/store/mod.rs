//! Voucher persistence boundary.
//!
//! One trait, several backends; a deployment picks exactly one of them.

pub mod any;
pub mod in_memory;
pub mod local;
pub mod postgres;
pub mod r#trait;

pub use any::AnyVoucherStore;
pub use in_memory::InMemoryVoucherStore;
pub use local::LocalVoucherStore;
pub use postgres::PostgresVoucherStore;
pub use r#trait::{StoreError, VoucherStore};
