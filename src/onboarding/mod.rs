//! Device onboarding core: connect to a device, fingerprint it, match the
//! fingerprint against inventory and upsert the device records.

mod bulk;
mod connector;
mod error;
mod matcher;
mod reconciler;
mod store;
mod target;

pub use bulk::{parse_bulk_csv, RowError};
pub use connector::{ConnectParams, DeviceConnector, DeviceFingerprint, SshConnector};
pub use error::{fail_reason, OnboardError};
pub use reconciler::Reconciler;
pub use store::{InventoryStore, Lookup, StoreError, StoreResult, TaskStore};
