use async_trait::async_trait;

use crate::models::*;
use crate::onboarding::{InventoryStore, Lookup, StoreResult, TaskStore};

use super::{
    device_roles::DeviceRoleRepo, device_types::DeviceTypeRepo, devices::DeviceRepo,
    interfaces::{InterfaceRepo, IpAddressRepo}, manufacturers::ManufacturerRepo,
    onboarding_devices::OnboardingDeviceRepo, platforms::PlatformRepo, sites::SiteRepo, store_error, tasks::TaskRepo, Store,
};

#[async_trait]
impl InventoryStore for Store {
    async fn find_site(&self, slug: &str) -> StoreResult<Option<Site>> {
        SiteRepo::get_by_slug(&self.pool, slug).await.map_err(store_error)
    }

    async fn find_manufacturers(&self, lookup: &Lookup) -> StoreResult<Vec<Manufacturer>> {
        ManufacturerRepo::find(&self.pool, lookup).await.map_err(store_error)
    }

    async fn create_manufacturer(&self, req: &CreateManufacturerRequest) -> StoreResult<Manufacturer> {
        ManufacturerRepo::create(&self.pool, req).await.map_err(store_error)
    }

    async fn find_platforms(&self, lookup: &Lookup) -> StoreResult<Vec<Platform>> {
        PlatformRepo::find(&self.pool, lookup).await.map_err(store_error)
    }

    async fn create_platform(&self, req: &CreatePlatformRequest) -> StoreResult<Platform> {
        PlatformRepo::create(&self.pool, req).await.map_err(store_error)
    }

    async fn find_device_types(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceType>> {
        DeviceTypeRepo::find(&self.pool, lookup).await.map_err(store_error)
    }

    async fn create_device_type(&self, req: &CreateDeviceTypeRequest) -> StoreResult<DeviceType> {
        DeviceTypeRepo::create(&self.pool, req).await.map_err(store_error)
    }

    async fn find_device_roles(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceRole>> {
        DeviceRoleRepo::find(&self.pool, lookup).await.map_err(store_error)
    }

    async fn create_device_role(&self, req: &CreateDeviceRoleRequest) -> StoreResult<DeviceRole> {
        DeviceRoleRepo::create(&self.pool, req).await.map_err(store_error)
    }

    async fn find_devices_by_primary_ip(&self, host: &str) -> StoreResult<Vec<Device>> {
        DeviceRepo::find_by_primary_ip(&self.pool, host).await.map_err(store_error)
    }

    async fn find_devices_by_name(&self, name: &str) -> StoreResult<Vec<Device>> {
        DeviceRepo::find_by_name(&self.pool, name).await.map_err(store_error)
    }

    async fn create_device(&self, req: &CreateDeviceRequest) -> StoreResult<Device> {
        DeviceRepo::create(&self.pool, req).await.map_err(store_error)
    }

    async fn update_device(&self, id: i64, req: &UpdateDeviceRequest) -> StoreResult<Device> {
        DeviceRepo::update(&self.pool, id, req).await.map_err(store_error)
    }

    async fn get_or_create_interface(&self, device_id: i64, name: &str) -> StoreResult<Interface> {
        InterfaceRepo::get_or_create(&self.pool, device_id, name)
            .await
            .map_err(store_error)
    }

    async fn get_or_create_ip_address(&self, host: &str, prefix_length: u8) -> StoreResult<IpAddress> {
        IpAddressRepo::get_or_create(&self.pool, host, prefix_length)
            .await
            .map_err(store_error)
    }

    async fn assign_ip_address(&self, ip_id: i64, interface_id: i64) -> StoreResult<IpAddress> {
        IpAddressRepo::assign(&self.pool, ip_id, interface_id)
            .await
            .map_err(store_error)
    }

    async fn set_primary_ip(&self, device_id: i64, ip_id: i64) -> StoreResult<Device> {
        DeviceRepo::set_primary_ip(&self.pool, device_id, ip_id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl TaskStore for Store {
    async fn create_task(&self, id: &str, req: &OnboardingRequest) -> StoreResult<OnboardingTask> {
        TaskRepo::create(&self.pool, id, req).await.map_err(store_error)
    }

    async fn get_task(&self, id: &str) -> StoreResult<Option<OnboardingTask>> {
        TaskRepo::get(&self.pool, id).await.map_err(store_error)
    }

    async fn mark_task_started(&self, id: &str, ip_address: &str) -> StoreResult<()> {
        TaskRepo::mark_started(&self.pool, id, ip_address)
            .await
            .map_err(store_error)
    }

    async fn complete_task(&self, id: &str, device_id: i64) -> StoreResult<OnboardingTask> {
        TaskRepo::finish(&self.pool, id, task_status::SUCCEEDED, None, "", Some(device_id))
            .await
            .map_err(store_error)
    }

    async fn fail_task(
        &self,
        id: &str,
        reason: &str,
        message: &str,
        device_id: Option<i64>,
    ) -> StoreResult<OnboardingTask> {
        TaskRepo::finish(&self.pool, id, task_status::FAILED, Some(reason), message, device_id)
            .await
            .map_err(store_error)
    }

    async fn skip_task(&self, id: &str, message: &str) -> StoreResult<OnboardingTask> {
        TaskRepo::finish(&self.pool, id, task_status::SKIPPED, None, message, None)
            .await
            .map_err(store_error)
    }

    async fn onboarding_enabled(&self, device_id: i64) -> StoreResult<bool> {
        OnboardingDeviceRepo::is_enabled(&self.pool, device_id)
            .await
            .map_err(store_error)
    }

    async fn track_device(&self, device_id: i64) -> StoreResult<()> {
        OnboardingDeviceRepo::ensure(&self.pool, device_id)
            .await
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::StoreError;

    async fn store() -> Store {
        Store::with_pool_size(":memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn test_terminal_transition_only_from_pending() {
        let store = store().await;
        let req = OnboardingRequest::new("192.0.2.10", "nyc01");
        let task = TaskStore::create_task(&store, "t-1", &req).await.unwrap();
        assert_eq!(task.status, task_status::PENDING);

        TaskStore::mark_task_started(&store, "t-1", "192.0.2.10").await.unwrap();
        let failed = TaskStore::fail_task(&store, "t-1", "fail-connect", "timed out", None)
            .await
            .unwrap();
        assert_eq!(failed.status, task_status::FAILED);
        assert_eq!(failed.failed_reason.as_deref(), Some("fail-connect"));
        assert_eq!(failed.ip_address.as_deref(), Some("192.0.2.10"));
        assert!(failed.completed_at.is_some());

        let err = TaskStore::complete_task(&store, "t-1", 7).await.unwrap_err();
        assert!(matches!(err, StoreError::NotPending(_)));
        let stored = TaskStore::get_task(&store, "t-1").await.unwrap().unwrap();
        assert_eq!(stored.status, task_status::FAILED);
    }

    #[tokio::test]
    async fn test_task_keeps_request_fields() {
        let store = store().await;
        let mut req = OnboardingRequest::new("sw1.example.net", "nyc01");
        req.platform = Some("cisco_ios".into());
        req.port = 2222;
        req.stack_separator = Some('/');
        TaskStore::create_task(&store, "t-2", &req).await.unwrap();

        let pending = store.list_pending_tasks().await.unwrap();
        assert_eq!(pending.len(), 1);
        let rebuilt = pending[0].to_request();
        assert_eq!(rebuilt.target, "sw1.example.net");
        assert_eq!(rebuilt.platform.as_deref(), Some("cisco_ios"));
        assert_eq!(rebuilt.port, 2222);
        assert_eq!(rebuilt.stack_separator, Some('/'));
        assert!(rebuilt.credentials.is_none());
    }

    #[tokio::test]
    async fn test_primary_ip_is_unique_across_devices() {
        let store = store().await;
        let site = store
            .create_site(&CreateSiteRequest {
                name: "NYC 01".into(),
                slug: "nyc01".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let m = store
            .create_manufacturer(&CreateManufacturerRequest { name: "Cisco".into(), slug: "cisco".into() })
            .await
            .unwrap();
        let dt = store
            .create_device_type(&CreateDeviceTypeRequest {
                manufacturer_id: m.id,
                model: "C9300".into(),
                slug: "c9300".into(),
                part_number: String::new(),
            })
            .await
            .unwrap();
        let role = store
            .create_device_role(&CreateDeviceRoleRequest {
                name: "network".into(),
                slug: "network".into(),
                color: "ff0000".into(),
            })
            .await
            .unwrap();
        let new_device = |name: &str| CreateDeviceRequest {
            name: name.to_string(),
            site_id: site.id,
            role_id: role.id,
            device_type_id: dt.id,
            manufacturer_id: m.id,
            platform_id: None,
            serial: String::new(),
            status: "active".into(),
        };
        let a = InventoryStore::create_device(&store, &new_device("a")).await.unwrap();
        let b = InventoryStore::create_device(&store, &new_device("b")).await.unwrap();

        let ip = InventoryStore::get_or_create_ip_address(&store, "198.51.100.7", 24).await.unwrap();
        assert_eq!(ip.address, "198.51.100.7/24");
        let again = InventoryStore::get_or_create_ip_address(&store, "198.51.100.7", 0).await.unwrap();
        assert_eq!(again.id, ip.id);
        assert_eq!(again.address, "198.51.100.7/24");

        let a = InventoryStore::set_primary_ip(&store, a.id, ip.id).await.unwrap();
        assert_eq!(a.primary_ip.as_deref(), Some("198.51.100.7/24"));
        let found = InventoryStore::find_devices_by_primary_ip(&store, "198.51.100.7").await.unwrap();
        assert_eq!(found.len(), 1);

        let err = InventoryStore::set_primary_ip(&store, b.id, ip.id).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }
}
