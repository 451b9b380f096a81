use async_trait::async_trait;
use std::net::IpAddr;

use crate::models::*;
use crate::onboarding::{InventoryStore, Lookup, StoreError, StoreResult};

use super::client::{NetBoxApiError, NetBoxClient};
use super::types::*;

fn store_error(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<NetBoxApiError>() {
        Some(api) if api.is_unique_violation() => StoreError::UniqueViolation(api.body.clone()),
        _ => StoreError::Backend(format!("{:#}", err)),
    }
}

/// NetBox filter for a lookup criterion
fn lookup_filter(lookup: &Lookup) -> (&'static str, String) {
    let key = match lookup {
        Lookup::Slug(_) => "slug",
        Lookup::SlugIexact(_) => "slug__ie",
        Lookup::NameIexact(_) => "name__ie",
        Lookup::ModelIexact(_) => "model__ie",
        Lookup::PartNumberIexact(_) => "part_number__ie",
    };
    (key, lookup.value().to_string())
}

impl NetBoxClient {
    async fn find<N, T>(&self, endpoint: &str, lookup: &Lookup) -> StoreResult<Vec<T>>
    where
        N: serde::de::DeserializeOwned + Into<T>,
    {
        if matches!(lookup, Lookup::PartNumberIexact(v) if v.is_empty()) {
            return Ok(Vec::new());
        }
        let found: Vec<N> = self
            .list(endpoint, &[lookup_filter(lookup)])
            .await
            .map_err(store_error)?;
        Ok(found.into_iter().map(Into::into).collect())
    }

    /// Every IP record for the host; the same address may exist once per VRF
    async fn get_ips_by_host(&self, host: &str) -> StoreResult<Vec<NbIpAddress>> {
        self.list("/ipam/ip-addresses/", &[("address", host.to_string())])
            .await
            .map_err(store_error)
    }
}

/// Devices seen through several IP records, first occurrence wins
fn dedupe_devices(devices: impl IntoIterator<Item = Device>) -> Vec<Device> {
    let mut seen = std::collections::HashSet::new();
    devices.into_iter().filter(|d| seen.insert(d.id)).collect()
}

#[async_trait]
impl InventoryStore for NetBoxClient {
    async fn find_site(&self, slug: &str) -> StoreResult<Option<Site>> {
        let mut sites = self
            .find::<NbSite, Site>("/dcim/sites/", &Lookup::Slug(slug.to_string()))
            .await?;
        Ok(sites.pop())
    }

    async fn find_manufacturers(&self, lookup: &Lookup) -> StoreResult<Vec<Manufacturer>> {
        self.find::<NbManufacturer, _>("/dcim/manufacturers/", lookup).await
    }

    async fn create_manufacturer(&self, req: &CreateManufacturerRequest) -> StoreResult<Manufacturer> {
        let body = serde_json::json!({ "name": req.name, "slug": req.slug });
        let created: NbManufacturer = self
            .create("/dcim/manufacturers/", &body)
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn find_platforms(&self, lookup: &Lookup) -> StoreResult<Vec<Platform>> {
        self.find::<NbPlatform, _>("/dcim/platforms/", lookup).await
    }

    async fn create_platform(&self, req: &CreatePlatformRequest) -> StoreResult<Platform> {
        let body = serde_json::json!({
            "name": req.name,
            "slug": req.slug,
            "napalm_driver": req.driver,
        });
        let created: NbPlatform = self
            .create("/dcim/platforms/", &body)
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn find_device_types(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceType>> {
        self.find::<NbDeviceType, _>("/dcim/device-types/", lookup).await
    }

    async fn create_device_type(&self, req: &CreateDeviceTypeRequest) -> StoreResult<DeviceType> {
        let created: NbDeviceType = self
            .create(
                "/dcim/device-types/",
                &DeviceTypeCreate {
                    manufacturer: req.manufacturer_id,
                    model: req.model.clone(),
                    slug: req.slug.clone(),
                    part_number: req.part_number.clone(),
                },
            )
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn find_device_roles(&self, lookup: &Lookup) -> StoreResult<Vec<DeviceRole>> {
        self.find::<NbDeviceRole, _>("/dcim/device-roles/", lookup).await
    }

    async fn create_device_role(&self, req: &CreateDeviceRoleRequest) -> StoreResult<DeviceRole> {
        let body = serde_json::json!({ "name": req.name, "slug": req.slug, "color": req.color });
        let created: NbDeviceRole = self
            .create("/dcim/device-roles/", &body)
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn find_devices_by_primary_ip(&self, host: &str) -> StoreResult<Vec<Device>> {
        let key = match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => "primary_ip6_id",
            _ => "primary_ip4_id",
        };
        let mut devices = Vec::new();
        for ip in self.get_ips_by_host(host).await? {
            let found: Vec<NbDevice> = self
                .list("/dcim/devices/", &[(key, ip.id.to_string())])
                .await
                .map_err(store_error)?;
            devices.extend(found.into_iter().map(Device::from));
        }
        Ok(dedupe_devices(devices))
    }

    async fn find_devices_by_name(&self, name: &str) -> StoreResult<Vec<Device>> {
        let found: Vec<NbDevice> = self
            .list("/dcim/devices/", &[("name", name.to_string())])
            .await
            .map_err(store_error)?;
        Ok(found.into_iter().map(Into::into).collect())
    }

    async fn create_device(&self, req: &CreateDeviceRequest) -> StoreResult<Device> {
        let created: NbDevice = self
            .create(
                "/dcim/devices/",
                &DeviceCreate {
                    name: req.name.clone(),
                    device_type: req.device_type_id,
                    role: req.role_id,
                    site: req.site_id,
                    platform: req.platform_id,
                    status: req.status.clone(),
                    serial: req.serial.clone(),
                },
            )
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    /// The manufacturer follows the device type in NetBox and is not patched
    async fn update_device(&self, id: i64, req: &UpdateDeviceRequest) -> StoreResult<Device> {
        let patch = DevicePatch {
            name: req.name.clone(),
            site: req.site_id,
            role: req.role_id,
            device_type: req.device_type_id,
            platform: req.platform_id,
            serial: req.serial.clone(),
            ..Default::default()
        };
        let updated: NbDevice = self
            .patch("/dcim/devices/", id, &patch)
            .await
            .map_err(store_error)?;
        Ok(updated.into())
    }

    async fn get_or_create_interface(&self, device_id: i64, name: &str) -> StoreResult<Interface> {
        let found: Vec<NbInterface> = self
            .list(
                "/dcim/interfaces/",
                &[("device_id", device_id.to_string()), ("name", name.to_string())],
            )
            .await
            .map_err(store_error)?;
        if let Some(iface) = found.into_iter().next() {
            return Ok(iface.into());
        }

        let created: NbInterface = self
            .create(
                "/dcim/interfaces/",
                &InterfaceCreate {
                    device: device_id,
                    name: name.to_string(),
                    iface_type: "virtual".to_string(),
                },
            )
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn get_or_create_ip_address(&self, host: &str, prefix_length: u8) -> StoreResult<IpAddress> {
        if let Some(ip) = self.get_ips_by_host(host).await?.into_iter().next() {
            return Ok(ip.into());
        }

        let created: NbIpAddress = self
            .create(
                "/ipam/ip-addresses/",
                &IpAddressCreate {
                    address: format!("{}/{}", host, prefix_length),
                    status: "active".to_string(),
                },
            )
            .await
            .map_err(store_error)?;
        Ok(created.into())
    }

    async fn assign_ip_address(&self, ip_id: i64, interface_id: i64) -> StoreResult<IpAddress> {
        let updated: NbIpAddress = self
            .patch(
                "/ipam/ip-addresses/",
                ip_id,
                &IpAddressAssign {
                    assigned_object_type: "dcim.interface".to_string(),
                    assigned_object_id: interface_id,
                },
            )
            .await
            .map_err(store_error)?;
        Ok(updated.into())
    }

    async fn set_primary_ip(&self, device_id: i64, ip_id: i64) -> StoreResult<Device> {
        let ip: Vec<NbIpAddress> = self
            .list("/ipam/ip-addresses/", &[("id", ip_id.to_string())])
            .await
            .map_err(store_error)?;
        let is_v6 = ip
            .first()
            .map(|ip| host_of(&ip.address).parse::<IpAddr>().map(|a| a.is_ipv6()).unwrap_or(false))
            .unwrap_or(false);

        let patch = if is_v6 {
            DevicePatch {
                primary_ip6: Some(ip_id),
                ..Default::default()
            }
        } else {
            DevicePatch {
                primary_ip4: Some(ip_id),
                ..Default::default()
            }
        };
        let updated: NbDevice = self
            .patch("/dcim/devices/", device_id, &patch)
            .await
            .map_err(store_error)?;
        Ok(updated.into())
    }
}
