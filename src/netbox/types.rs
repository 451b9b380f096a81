use serde::{Deserialize, Serialize};

use crate::models::*;

// --- NetBox API types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChoice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbSite {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbManufacturer {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbPlatform {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub napalm_driver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbDeviceType {
    pub id: i64,
    pub model: String,
    pub slug: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(default)]
    pub manufacturer: Option<NestedRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbDeviceRole {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbIpAddress {
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub assigned_object_id: Option<i64>,
}

/// Device type as nested in a device; carries the manufacturer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbNestedDeviceType {
    pub id: i64,
    #[serde(default)]
    pub manufacturer: Option<NestedRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbDevice {
    pub id: i64,
    pub name: Option<String>,
    pub device_type: NbNestedDeviceType,
    #[serde(alias = "device_role")]
    pub role: NestedRef,
    pub site: NestedRef,
    #[serde(default)]
    pub platform: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<StatusChoice>,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub primary_ip4: Option<NbIpAddress>,
    #[serde(default)]
    pub primary_ip6: Option<NbIpAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbInterface {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub device: Option<NestedRef>,
}

// --- Create / update request types ---

#[derive(Debug, Serialize)]
pub(crate) struct DeviceTypeCreate {
    pub manufacturer: i64,
    pub model: String,
    pub slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub part_number: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeviceCreate {
    pub name: String,
    pub device_type: i64,
    pub role: i64,
    pub site: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<i64>,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial: String,
}

/// PATCH body; absent fields are left untouched by NetBox
#[derive(Debug, Default, Serialize)]
pub(crate) struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip6: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InterfaceCreate {
    pub device: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub iface_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IpAddressCreate {
    pub address: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IpAddressAssign {
    pub assigned_object_type: String,
    pub assigned_object_id: i64,
}

// --- Conversions into inventory models ---

/// Host part of a CIDR address
pub fn host_of(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}

impl From<NbSite> for Site {
    fn from(s: NbSite) -> Self {
        Site {
            id: s.id,
            name: s.name,
            slug: s.slug,
            description: s.description,
        }
    }
}

impl From<NbManufacturer> for Manufacturer {
    fn from(m: NbManufacturer) -> Self {
        Manufacturer {
            id: m.id,
            name: m.name,
            slug: m.slug,
        }
    }
}

impl From<NbPlatform> for Platform {
    fn from(p: NbPlatform) -> Self {
        // platforms without a driver fall back to their slug
        let driver = p
            .napalm_driver
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| p.slug.clone());
        Platform {
            id: p.id,
            name: p.name,
            driver,
            slug: p.slug,
        }
    }
}

impl From<NbDeviceType> for DeviceType {
    fn from(dt: NbDeviceType) -> Self {
        DeviceType {
            id: dt.id,
            manufacturer_id: dt.manufacturer.map(|m| m.id).unwrap_or_default(),
            model: dt.model,
            slug: dt.slug,
            part_number: dt.part_number,
        }
    }
}

impl From<NbDeviceRole> for DeviceRole {
    fn from(r: NbDeviceRole) -> Self {
        DeviceRole {
            id: r.id,
            name: r.name,
            slug: r.slug,
            color: r.color,
        }
    }
}

impl From<NbInterface> for Interface {
    fn from(i: NbInterface) -> Self {
        Interface {
            id: i.id,
            device_id: i.device.map(|d| d.id).unwrap_or_default(),
            name: i.name,
        }
    }
}

impl From<NbIpAddress> for IpAddress {
    fn from(ip: NbIpAddress) -> Self {
        IpAddress {
            id: ip.id,
            host: host_of(&ip.address).to_string(),
            address: ip.address,
            interface_id: ip.assigned_object_id,
        }
    }
}

impl From<NbDevice> for Device {
    fn from(d: NbDevice) -> Self {
        let primary = d.primary_ip4.or(d.primary_ip6);
        Device {
            id: d.id,
            name: d.name.unwrap_or_default(),
            site_id: d.site.id,
            role_id: d.role.id,
            device_type_id: d.device_type.id,
            manufacturer_id: d.device_type.manufacturer.map(|m| m.id).unwrap_or_default(),
            platform_id: d.platform.map(|p| p.id),
            serial: d.serial,
            status: d.status.map(|s| s.value).unwrap_or_default(),
            primary_ip_id: primary.as_ref().map(|ip| ip.id),
            primary_ip: primary.map(|ip| ip.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_from_netbox_json() {
        let json = r#"{
            "id": 12,
            "name": "nyc01-sw01",
            "device_type": {"id": 3, "manufacturer": {"id": 1, "name": "Cisco", "slug": "cisco"}},
            "device_role": {"id": 4, "name": "network", "slug": "network"},
            "site": {"id": 2, "name": "NYC 01", "slug": "nyc01"},
            "platform": null,
            "status": {"value": "active", "label": "Active"},
            "serial": "ABC123",
            "primary_ip4": {"id": 9, "address": "198.51.100.5/24"},
            "primary_ip6": null
        }"#;
        let device: Device = serde_json::from_str::<NbDevice>(json).unwrap().into();
        assert_eq!(device.name, "nyc01-sw01");
        assert_eq!(device.manufacturer_id, 1);
        assert_eq!(device.role_id, 4);
        assert_eq!(device.platform_id, None);
        assert_eq!(device.status, "active");
        assert_eq!(device.primary_ip_id, Some(9));
        assert_eq!(device.primary_ip.as_deref(), Some("198.51.100.5/24"));
    }

    #[test]
    fn test_platform_driver_from_napalm_driver() {
        let with_driver: Platform = serde_json::from_str::<NbPlatform>(
            r#"{"id": 1, "name": "Cisco IOS-XE", "slug": "cisco-iosxe", "napalm_driver": "ios"}"#,
        )
        .unwrap()
        .into();
        assert_eq!(with_driver.driver, "ios");
        assert_eq!(with_driver.slug, "cisco-iosxe");

        let blank: Platform = serde_json::from_str::<NbPlatform>(
            r#"{"id": 2, "name": "EOS", "slug": "eos", "napalm_driver": ""}"#,
        )
        .unwrap()
        .into();
        assert_eq!(blank.driver, "eos");

        let missing: Platform =
            serde_json::from_str::<NbPlatform>(r#"{"id": 3, "name": "Junos", "slug": "junos"}"#)
                .unwrap()
                .into();
        assert_eq!(missing.driver, "junos");
    }

    #[test]
    fn test_ip_host_strips_prefix() {
        let ip: IpAddress = NbIpAddress {
            id: 1,
            address: "2001:db8::1/64".into(),
            assigned_object_id: None,
        }
        .into();
        assert_eq!(ip.host, "2001:db8::1");
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = DevicePatch {
            serial: Some("X".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"serial":"X"}"#);
    }
}
