use chrono::{DateTime, Utc};
use sqlx::{Row, sqlite::SqliteRow};

use crate::models::*;
use crate::onboarding::Lookup;

/// Columns default to '' rather than NULL
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// WHERE clause (with one bind placeholder) for a lookup criterion.
/// Case-insensitive criteria compare with NOCASE; empty part numbers never match.
pub fn lookup_clause(lookup: &Lookup) -> &'static str {
    match lookup {
        Lookup::Slug(_) => "slug = ?",
        Lookup::SlugIexact(_) => "slug = ? COLLATE NOCASE",
        Lookup::NameIexact(_) => "name = ? COLLATE NOCASE",
        Lookup::ModelIexact(_) => "model = ? COLLATE NOCASE",
        Lookup::PartNumberIexact(_) => "part_number = ? COLLATE NOCASE AND part_number != ''",
    }
}

pub fn map_site_row(row: &SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

pub fn map_manufacturer_row(row: &SqliteRow) -> Manufacturer {
    Manufacturer {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

pub fn map_platform_row(row: &SqliteRow) -> Platform {
    Platform {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        driver: row.get("driver"),
    }
}

pub fn map_device_type_row(row: &SqliteRow) -> DeviceType {
    DeviceType {
        id: row.get("id"),
        manufacturer_id: row.get("manufacturer_id"),
        model: row.get("model"),
        slug: row.get("slug"),
        part_number: row.get("part_number"),
    }
}

pub fn map_device_role_row(row: &SqliteRow) -> DeviceRole {
    DeviceRole {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
    }
}

/// Map a SQLite row to a Device struct (expects the primary IP join)
pub fn map_device_row(row: &SqliteRow) -> Device {
    Device {
        id: row.get("id"),
        name: row.get("name"),
        site_id: row.get("site_id"),
        role_id: row.get("role_id"),
        device_type_id: row.get("device_type_id"),
        manufacturer_id: row.get("manufacturer_id"),
        platform_id: row.try_get::<Option<i64>, _>("platform_id").ok().flatten(),
        serial: row.get("serial"),
        status: row.get("status"),
        primary_ip_id: row.try_get::<Option<i64>, _>("primary_ip_id").ok().flatten(),
        primary_ip: row.try_get::<Option<String>, _>("primary_ip").ok().flatten(),
    }
}

pub fn map_interface_row(row: &SqliteRow) -> Interface {
    Interface {
        id: row.get("id"),
        device_id: row.get("device_id"),
        name: row.get("name"),
    }
}

pub fn map_ip_address_row(row: &SqliteRow) -> IpAddress {
    IpAddress {
        id: row.get("id"),
        address: row.get("address"),
        host: row.get("host"),
        interface_id: row.try_get::<Option<i64>, _>("interface_id").ok().flatten(),
    }
}

/// Map a SQLite row to an OnboardingTask struct
pub fn map_task_row(row: &SqliteRow) -> OnboardingTask {
    let port: i64 = row.get("port");
    let timeout: i64 = row.get("timeout");
    let separator: Option<String> = row.get("stack_separator");
    OnboardingTask {
        id: row.get("id"),
        target: row.get("target"),
        ip_address: none_if_empty(row.get("ip_address")),
        site: row.get("site"),
        platform: none_if_empty(row.get("platform")),
        device_type: none_if_empty(row.get("device_type")),
        role: none_if_empty(row.get("role")),
        port: u16::try_from(port).unwrap_or(22),
        timeout: u64::try_from(timeout).unwrap_or(30),
        stack_separator: separator.and_then(|s| s.chars().next()),
        status: row.get("status"),
        failed_reason: none_if_empty(row.get("failed_reason")),
        message: row.get("message"),
        created_device_id: row.try_get::<Option<i64>, _>("created_device_id").ok().flatten(),
        requested_by: none_if_empty(row.get("requested_by")),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    }
}

/// Map a tracking row joined with its latest task columns
pub fn map_onboarding_device_row(row: &SqliteRow) -> OnboardingDevice {
    OnboardingDevice {
        device_id: row.get("device_id"),
        enabled: row.get("enabled"),
        status: row.try_get::<Option<String>, _>("last_status").ok().flatten(),
        last_task_id: row.try_get::<Option<String>, _>("last_task_id").ok().flatten(),
        last_check_attempt_date: row
            .try_get::<Option<DateTime<Utc>>, _>("last_attempt")
            .ok()
            .flatten(),
        last_check_successful_date: row
            .try_get::<Option<DateTime<Utc>>, _>("last_success")
            .ok()
            .flatten(),
    }
}
