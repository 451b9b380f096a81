//! Storage seams the onboarding core depends on.
//!
//! The reconciler only talks to inventory and task status through these
//! traits; the SQLite `Store` and the NetBox client both implement
//! `InventoryStore`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::*;

use super::error::ObjectKind;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate slug, primary IP, ...)
    #[error("uniqueness violation: {0}")]
    UniqueViolation(String),

    /// Terminal state was already recorded for this task
    #[error("onboarding task {0} is not pending")]
    NotPending(String),

    #[error("inventory store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One lookup criterion used when matching inventory objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Slug(String),
    SlugIexact(String),
    NameIexact(String),
    ModelIexact(String),
    PartNumberIexact(String),
}

impl Lookup {
    /// Whether the criterion exists on objects of `kind`.
    /// Device types have a model instead of a name.
    pub fn applies_to(&self, kind: ObjectKind) -> bool {
        match self {
            Lookup::Slug(_) | Lookup::SlugIexact(_) => true,
            Lookup::NameIexact(_) => kind != ObjectKind::DeviceType,
            Lookup::ModelIexact(_) | Lookup::PartNumberIexact(_) => kind == ObjectKind::DeviceType,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Lookup::Slug(v)
            | Lookup::SlugIexact(v)
            | Lookup::NameIexact(v)
            | Lookup::ModelIexact(v)
            | Lookup::PartNumberIexact(v) => v,
        }
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Slug(v) => write!(f, "slug={}", v),
            Lookup::SlugIexact(v) => write!(f, "slug~={}", v),
            Lookup::NameIexact(v) => write!(f, "name~={}", v),
            Lookup::ModelIexact(v) => write!(f, "model~={}", v),
            Lookup::PartNumberIexact(v) => write!(f, "part_number~={}", v),
        }
    }
}

/// CRUD over the inventory entities touched by onboarding
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_site(&self, slug: &str) -> StoreResult<Option<Site>>;

    async fn find_manufacturers(&self, lookup: &Lookup) -> StoreResult<Vec<Manufacturer>>;
    async fn create_manufacturer(&self, req: &CreateManufacturerRequest) -> StoreResult<Manufacturer>;

    async fn find_platforms(&self, lookup: &Lookup) -> StoreResult<Vec<Platform>>;
    async fn create_platform(&self, req: &CreatePlatformRequest) -> StoreResult<Platform>;

    async fn find_device_types(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceType>>;
    async fn create_device_type(&self, req: &CreateDeviceTypeRequest) -> StoreResult<DeviceType>;

    async fn find_device_roles(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceRole>>;
    async fn create_device_role(&self, req: &CreateDeviceRoleRequest) -> StoreResult<DeviceRole>;

    /// Devices whose primary IP has the given host address (no prefix length)
    async fn find_devices_by_primary_ip(&self, host: &str) -> StoreResult<Vec<Device>>;
    async fn find_devices_by_name(&self, name: &str) -> StoreResult<Vec<Device>>;
    async fn create_device(&self, req: &CreateDeviceRequest) -> StoreResult<Device>;
    async fn update_device(&self, id: i64, req: &UpdateDeviceRequest) -> StoreResult<Device>;

    async fn get_or_create_interface(&self, device_id: i64, name: &str) -> StoreResult<Interface>;
    /// Returns the IP record for `host`, creating `host/prefix_length` if absent
    async fn get_or_create_ip_address(&self, host: &str, prefix_length: u8) -> StoreResult<IpAddress>;
    async fn assign_ip_address(&self, ip_id: i64, interface_id: i64) -> StoreResult<IpAddress>;
    async fn set_primary_ip(&self, device_id: i64, ip_id: i64) -> StoreResult<Device>;
}

/// Persistence for onboarding task outcomes
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, id: &str, req: &OnboardingRequest) -> StoreResult<OnboardingTask>;
    async fn get_task(&self, id: &str) -> StoreResult<Option<OnboardingTask>>;
    async fn mark_task_started(&self, id: &str, ip_address: &str) -> StoreResult<()>;
    /// Terminal transition to `succeeded`; fails with `NotPending` if already terminal
    async fn complete_task(&self, id: &str, device_id: i64) -> StoreResult<OnboardingTask>;
    /// Terminal transition to `failed`; fails with `NotPending` if already terminal
    async fn fail_task(
        &self,
        id: &str,
        reason: &str,
        message: &str,
        device_id: Option<i64>,
    ) -> StoreResult<OnboardingTask>;
    /// Terminal transition to `skipped`; fails with `NotPending` if already terminal
    async fn skip_task(&self, id: &str, message: &str) -> StoreResult<OnboardingTask>;

    /// False only when onboarding was switched off for the device
    async fn onboarding_enabled(&self, device_id: i64) -> StoreResult<bool>;
    /// Start tracking a device touched by onboarding (no-op when tracked)
    async fn track_device(&self, device_id: i64) -> StoreResult<()>;
}
