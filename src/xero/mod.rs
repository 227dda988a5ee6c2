//! Accounting API surface: enumerated operations, tenant resolution, executor.

pub mod api;
pub(crate) mod connections;
pub mod operations;

pub use api::XeroApi;
pub use operations::AccountingOperation;
