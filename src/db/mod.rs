mod device_roles;
mod device_types;
mod devices;
mod interfaces;
mod inventory;
mod manufacturers;
mod onboarding_devices;
mod platforms;
pub(crate) mod row_helpers;
mod settings;
mod sites;
mod tasks;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;
use crate::onboarding::StoreError;

/// Typed "resource not found" error, downcast to 404 by the API layer
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Classify a repository error for the onboarding core
pub(crate) fn store_error(err: anyhow::Error) -> StoreError {
    let err = match err.downcast::<StoreError>() {
        Ok(store_err) => return store_err,
        Err(err) => err,
    };
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation(db_err.message().to_string());
        }
    }
    StoreError::Backend(format!("{:#}", err))
}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        // Initialize default policy if not exists
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool)
            .await?;

        if count.0 == 0 {
            let defaults = OnboardingPolicy::default();
            let data = serde_json::to_string(&defaults)?;
            sqlx::query("INSERT INTO settings (id, data) VALUES (1, ?)")
                .bind(&data)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    // ========== Settings Operations ==========

    pub async fn get_policy(&self) -> Result<OnboardingPolicy> {
        settings::SettingsRepo::get(&self.pool).await
    }

    pub async fn update_policy(&self, policy: &OnboardingPolicy) -> Result<()> {
        settings::SettingsRepo::update(&self.pool, policy).await
    }

    // ========== Site Operations ==========

    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        sites::SiteRepo::list(&self.pool).await
    }

    pub async fn get_site_by_slug(&self, slug: &str) -> Result<Option<Site>> {
        sites::SiteRepo::get_by_slug(&self.pool, slug).await
    }

    pub async fn create_site(&self, req: &CreateSiteRequest) -> Result<Site> {
        sites::SiteRepo::create(&self.pool, req).await
    }

    pub async fn delete_site(&self, id: i64) -> Result<()> {
        sites::SiteRepo::delete(&self.pool, id).await
    }

    // ========== Manufacturer Operations ==========

    pub async fn list_manufacturers(&self) -> Result<Vec<Manufacturer>> {
        manufacturers::ManufacturerRepo::list(&self.pool).await
    }

    // ========== Platform Operations ==========

    pub async fn list_platforms(&self) -> Result<Vec<Platform>> {
        platforms::PlatformRepo::list(&self.pool).await
    }

    pub async fn create_platform(&self, req: &CreatePlatformRequest) -> Result<Platform> {
        platforms::PlatformRepo::create(&self.pool, req).await
    }

    // ========== Device Type Operations ==========

    pub async fn list_device_types(&self) -> Result<Vec<DeviceType>> {
        device_types::DeviceTypeRepo::list(&self.pool).await
    }

    // ========== Device Role Operations ==========

    pub async fn list_device_roles(&self) -> Result<Vec<DeviceRole>> {
        device_roles::DeviceRoleRepo::list(&self.pool).await
    }

    pub async fn create_device_role(&self, req: &CreateDeviceRoleRequest) -> Result<DeviceRole> {
        device_roles::DeviceRoleRepo::create(&self.pool, req).await
    }

    // ========== Device Operations ==========

    pub async fn list_devices_paged(&self, limit: i64, offset: i64) -> Result<Vec<Device>> {
        devices::DeviceRepo::list_paged(&self.pool, limit, offset).await
    }

    pub async fn get_device(&self, id: i64) -> Result<Option<Device>> {
        devices::DeviceRepo::get(&self.pool, id).await
    }

    /// Deleting a device also drops its onboarding tracking row
    pub async fn delete_device(&self, id: i64) -> Result<()> {
        devices::DeviceRepo::delete(&self.pool, id).await?;
        onboarding_devices::OnboardingDeviceRepo::delete(&self.pool, id).await
    }

    pub async fn list_interfaces(&self, device_id: i64) -> Result<Vec<Interface>> {
        interfaces::InterfaceRepo::list_by_device(&self.pool, device_id).await
    }

    // ========== Onboarding Task Operations ==========

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<OnboardingTask>> {
        tasks::TaskRepo::list_filtered(&self.pool, filter).await
    }

    pub async fn list_pending_tasks(&self) -> Result<Vec<OnboardingTask>> {
        tasks::TaskRepo::list_pending(&self.pool).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<OnboardingTask>> {
        tasks::TaskRepo::get(&self.pool, id).await
    }

    // ========== Onboarding Device Operations ==========

    pub async fn get_onboarding_device(&self, device_id: i64) -> Result<Option<OnboardingDevice>> {
        onboarding_devices::OnboardingDeviceRepo::get(&self.pool, device_id).await
    }

    pub async fn set_onboarding_enabled(&self, device_id: i64, enabled: bool) -> Result<OnboardingDevice> {
        onboarding_devices::OnboardingDeviceRepo::set_enabled(&self.pool, device_id, enabled).await
    }
}
