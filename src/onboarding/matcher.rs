use async_trait::async_trait;

use crate::models::*;
use crate::utils::slugify;

use super::error::{ObjectKind, OnboardError};
use super::store::{InventoryStore, Lookup, StoreResult};

/// Inventory objects the matcher can look up by `Lookup`
#[async_trait]
trait Findable: Sized + Send {
    const KIND: ObjectKind;

    async fn find(store: &dyn InventoryStore, lookup: &Lookup) -> StoreResult<Vec<Self>>;
}

#[async_trait]
impl Findable for Manufacturer {
    const KIND: ObjectKind = ObjectKind::Manufacturer;

    async fn find(store: &dyn InventoryStore, lookup: &Lookup) -> StoreResult<Vec<Self>> {
        store.find_manufacturers(lookup).await
    }
}

#[async_trait]
impl Findable for Platform {
    const KIND: ObjectKind = ObjectKind::Platform;

    async fn find(store: &dyn InventoryStore, lookup: &Lookup) -> StoreResult<Vec<Self>> {
        store.find_platforms(lookup).await
    }
}

#[async_trait]
impl Findable for DeviceType {
    const KIND: ObjectKind = ObjectKind::DeviceType;

    async fn find(store: &dyn InventoryStore, lookup: &Lookup) -> StoreResult<Vec<Self>> {
        store.find_device_types(lookup).await
    }
}

#[async_trait]
impl Findable for DeviceRole {
    const KIND: ObjectKind = ObjectKind::DeviceRole;

    async fn find(store: &dyn InventoryStore, lookup: &Lookup) -> StoreResult<Vec<Self>> {
        store.find_device_roles(lookup).await
    }
}

/// Caller-supplied slugs that override discovery
#[derive(Debug, Clone, Copy, Default)]
pub struct Hints<'h> {
    pub platform: Option<&'h str>,
    pub device_type: Option<&'h str>,
    pub role: Option<&'h str>,
}

impl<'h> From<&'h OnboardingRequest> for Hints<'h> {
    fn from(req: &'h OnboardingRequest) -> Self {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        Self {
            platform: non_empty(&req.platform),
            device_type: non_empty(&req.device_type),
            role: non_empty(&req.role),
        }
    }
}

/// References a device record is built from
#[derive(Debug, Clone)]
pub struct ResolvedReferences {
    pub device_type: DeviceType,
    pub platform: Platform,
    pub role: DeviceRole,
}

impl ResolvedReferences {
    /// Manufacturer is implied by the device type
    pub fn manufacturer_id(&self) -> i64 {
        self.device_type.manufacturer_id
    }
}

/// Resolves (and per policy creates) the inventory objects a device refers to
pub struct Matcher<'a> {
    store: &'a dyn InventoryStore,
    policy: &'a OnboardingPolicy,
}

impl<'a> Matcher<'a> {
    pub fn new(store: &'a dyn InventoryStore, policy: &'a OnboardingPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn resolve(
        &self,
        platform_family: &str,
        vendor: &str,
        model: &str,
        hints: Hints<'_>,
    ) -> Result<ResolvedReferences, OnboardError> {
        let device_type = self.resolve_device_type(vendor, model, hints.device_type).await?;
        let platform = self.resolve_platform(platform_family, hints.platform).await?;
        let role = self.resolve_role(hints.role).await?;
        Ok(ResolvedReferences {
            device_type,
            platform,
            role,
        })
    }

    pub async fn resolve_site(&self, slug: &str) -> Result<Site, OnboardError> {
        self.store
            .find_site(slug)
            .await?
            .ok_or_else(|| OnboardError::missing(ObjectKind::Site, slug))
    }

    /// Resolve a device type, creating it (and its manufacturer) per policy.
    /// An existing type owned by another manufacturer is a conflict.
    pub async fn resolve_device_type(
        &self,
        vendor: &str,
        model: &str,
        hint: Option<&str>,
    ) -> Result<DeviceType, OnboardError> {
        if let Some(slug) = hint {
            let device_type = self.hinted::<DeviceType>(slug).await?;
            let manufacturer = self.match_object::<Manufacturer>(vendor, &slugify(vendor)).await?;
            return same_manufacturer(device_type, manufacturer.as_ref(), vendor);
        }
        let model = model.trim();
        if model.is_empty() {
            return Err(OnboardError::missing(ObjectKind::DeviceType, "<undiscovered model>"));
        }

        let manufacturer = self.match_object::<Manufacturer>(vendor, &slugify(vendor)).await?;

        if let Some(device_type) = self.match_object::<DeviceType>(model, &slugify(model)).await? {
            return same_manufacturer(device_type, manufacturer.as_ref(), vendor);
        }

        if !self.policy.create_device_type_if_missing {
            return Err(OnboardError::missing(ObjectKind::DeviceType, model));
        }

        let manufacturer = match manufacturer {
            Some(m) => m,
            None if self.policy.create_manufacturer_if_missing => {
                let created = self
                    .store
                    .create_manufacturer(&CreateManufacturerRequest {
                        name: vendor.to_string(),
                        slug: slugify(vendor),
                    })
                    .await?;
                tracing::info!("CREATE: manufacturer {}", created.slug);
                created
            }
            None => return Err(OnboardError::missing(ObjectKind::Manufacturer, vendor)),
        };

        let created = self
            .store
            .create_device_type(&CreateDeviceTypeRequest {
                manufacturer_id: manufacturer.id,
                model: model.to_string(),
                slug: slugify(model),
                part_number: String::new(),
            })
            .await?;
        tracing::info!("CREATE: device type {} ({})", created.slug, manufacturer.slug);
        Ok(created)
    }

    /// Platform slug is the hint, else the configured mapping of the
    /// detected family, else the family itself.
    pub async fn resolve_platform(&self, family: &str, hint: Option<&str>) -> Result<Platform, OnboardError> {
        if let Some(slug) = hint {
            return self.hinted::<Platform>(slug).await;
        }
        let name = self
            .policy
            .platform_map
            .get(family)
            .map(String::as_str)
            .unwrap_or(family);
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(OnboardError::UnsupportedPlatform("no platform family detected".to_string()));
        }

        if let Some(platform) = self.match_object::<Platform>(name, &slug).await? {
            return Ok(platform);
        }
        if !self.policy.create_platform_if_missing {
            return Err(OnboardError::missing(ObjectKind::Platform, slug));
        }

        let created = self
            .store
            .create_platform(&CreatePlatformRequest {
                name: name.to_string(),
                slug,
                driver: family.to_string(),
            })
            .await?;
        tracing::info!("CREATE: platform {} (driver {})", created.slug, created.driver);
        Ok(created)
    }

    pub async fn resolve_role(&self, hint: Option<&str>) -> Result<DeviceRole, OnboardError> {
        if let Some(slug) = hint {
            return self.hinted::<DeviceRole>(slug).await;
        }
        let name = self.policy.default_device_role.as_str();
        let slug = slugify(name);

        if let Some(role) = self.match_object::<DeviceRole>(name, &slug).await? {
            return Ok(role);
        }
        if !self.policy.create_device_role_if_missing {
            return Err(OnboardError::missing(ObjectKind::DeviceRole, slug));
        }

        let created = self
            .store
            .create_device_role(&CreateDeviceRoleRequest {
                name: name.to_string(),
                slug,
                color: self.policy.default_device_role_color.to_lowercase(),
            })
            .await?;
        tracing::info!("CREATE: device role {}", created.slug);
        Ok(created)
    }

    /// Lookup chain for a discovered value under the configured strategy
    fn criteria(&self, kind: ObjectKind, value: &str, slug: &str) -> Vec<Lookup> {
        let exact = Lookup::Slug(slug.to_string());
        if self.policy.object_match_strategy == MatchStrategy::Strict {
            return vec![exact];
        }
        [
            exact,
            Lookup::SlugIexact(slug.to_string()),
            Lookup::NameIexact(value.to_string()),
            Lookup::ModelIexact(value.to_string()),
            Lookup::PartNumberIexact(value.to_string()),
        ]
        .into_iter()
        .filter(|l| l.applies_to(kind))
        .collect()
    }

    /// First criterion with exactly one candidate wins; more than one
    /// candidate for a criterion is ambiguous.
    async fn match_object<T: Findable>(&self, value: &str, slug: &str) -> Result<Option<T>, OnboardError> {
        for lookup in self.criteria(T::KIND, value, slug) {
            let mut found = T::find(self.store, &lookup).await?;
            match found.len() {
                0 => continue,
                1 => return Ok(found.pop()),
                n => {
                    return Err(OnboardError::Conflict(format!(
                        "ambiguous {} match for '{}': {} candidates by {}",
                        T::KIND,
                        value,
                        n,
                        lookup
                    )))
                }
            }
        }
        Ok(None)
    }

    /// Hints name an existing object by exact slug and are never created
    async fn hinted<T: Findable>(&self, slug: &str) -> Result<T, OnboardError> {
        let mut found = T::find(self.store, &Lookup::Slug(slug.to_string())).await?;
        if found.len() > 1 {
            return Err(OnboardError::Conflict(format!(
                "ambiguous {} hint '{}': {} candidates",
                T::KIND,
                slug,
                found.len()
            )));
        }
        found.pop().ok_or_else(|| {
            OnboardError::Conflict(format!("hinted {} '{}' does not exist", T::KIND, slug))
        })
    }
}

/// A device type is only usable when it belongs to the discovered vendor
fn same_manufacturer(
    device_type: DeviceType,
    manufacturer: Option<&Manufacturer>,
    vendor: &str,
) -> Result<DeviceType, OnboardError> {
    match manufacturer {
        Some(m) if m.id == device_type.manufacturer_id => Ok(device_type),
        _ => Err(OnboardError::Conflict(format!(
            "device type {} exists under a different manufacturer than {}",
            device_type.slug, vendor
        ))),
    }
}
