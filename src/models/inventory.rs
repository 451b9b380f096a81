use serde::{Deserialize, Serialize};

/// Site a device is installed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Platform (network OS family) with the driver used to talk to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub driver: String,
}

/// Hardware model, always owned by a single manufacturer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: i64,
    pub manufacturer_id: i64,
    pub model: String,
    pub slug: String,
    #[serde(default)]
    pub part_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRole {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
}

/// Device represents one inventory device record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub site_id: i64,
    pub role_id: i64,
    pub device_type_id: i64,
    pub manufacturer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<i64>,
    pub serial: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip_id: Option<i64>,
    /// Primary IP in CIDR notation, joined from the IP address record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub id: i64,
    pub device_id: i64,
    pub name: String,
}

/// IP address in CIDR form; `host` is the address without prefix length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: i64,
    pub address: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateManufacturerRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlatformRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub driver: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceTypeRequest {
    pub manufacturer_id: i64,
    pub model: String,
    pub slug: String,
    #[serde(default)]
    pub part_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRoleRequest {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_role_color")]
    pub color: String,
}

fn default_role_color() -> String {
    "9e9e9e".to_string()
}

#[derive(Debug, Clone)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub site_id: i64,
    pub role_id: i64,
    pub device_type_id: i64,
    pub manufacturer_id: i64,
    pub platform_id: Option<i64>,
    pub serial: String,
    pub status: String,
}

/// Partial device update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub site_id: Option<i64>,
    pub role_id: Option<i64>,
    pub device_type_id: Option<i64>,
    pub manufacturer_id: Option<i64>,
    pub platform_id: Option<i64>,
    pub serial: Option<String>,
}
