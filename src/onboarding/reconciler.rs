use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::models::*;

use super::connector::{ConnectParams, DeviceConnector, DeviceFingerprint};
use super::error::{fail_reason, ObjectKind, OnboardError};
use super::matcher::{Hints, Matcher};
use super::store::{InventoryStore, StoreError, TaskStore};
use super::target::resolve_target;

/// Attributes a device record should end up with
struct DeviceSpec<'s> {
    name: String,
    site_id: i64,
    device_type: &'s DeviceType,
    platform_id: i64,
    role_id: i64,
    role_hinted: bool,
    serial: String,
}

/// How a task that did not fail ended
enum Reconciled {
    Onboarded(i64),
    /// Onboarding is switched off for the device already holding the address
    Skipped(i64),
}

/// Drives one onboarding attempt from target to task outcome
pub struct Reconciler {
    inventory: Arc<dyn InventoryStore>,
    tasks: Arc<dyn TaskStore>,
    connector: Arc<dyn DeviceConnector>,
    default_credentials: Credentials,
}

impl Reconciler {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        tasks: Arc<dyn TaskStore>,
        connector: Arc<dyn DeviceConnector>,
        default_credentials: Credentials,
    ) -> Self {
        Self {
            inventory,
            tasks,
            connector,
            default_credentials,
        }
    }

    /// Record a new task for `req` and run it. Always returns an outcome.
    pub async fn onboard(&self, req: &OnboardingRequest, policy: &OnboardingPolicy) -> OnboardingTask {
        let id = Uuid::new_v4().to_string();
        match self.tasks.create_task(&id, req).await {
            Ok(task) => self.run_task(&task, req.credentials.as_ref(), policy).await,
            Err(e) => {
                tracing::error!("Failed to record onboarding task for {}: {}", req.target, e);
                let task = OnboardingTask::unrecorded(&id, req);
                finished(task, task_status::FAILED, Some(fail_reason::STORE), e.to_string(), None)
            }
        }
    }

    /// Run an accepted task to its terminal state.
    /// Credentials are passed separately because tasks never store them.
    pub async fn run_task(
        &self,
        task: &OnboardingTask,
        credentials: Option<&Credentials>,
        policy: &OnboardingPolicy,
    ) -> OnboardingTask {
        if task.is_terminal() {
            tracing::warn!("Onboarding task {} already {}, not running again", task.id, task.status);
            return task.clone();
        }

        let req = task.to_request();
        let mut existing_device: Option<i64> = None;
        let result = self
            .reconcile(task, &req, credentials, policy, &mut existing_device)
            .await;

        let stored = match &result {
            Ok(Reconciled::Onboarded(device_id)) => {
                tracing::info!("Onboarding task {} succeeded: device {}", task.id, device_id);
                self.tasks.complete_task(&task.id, *device_id).await
            }
            Ok(Reconciled::Skipped(device_id)) => {
                tracing::info!("Onboarding task {} skipped: disabled for device {}", task.id, device_id);
                self.tasks
                    .skip_task(&task.id, &skip_message(*device_id))
                    .await
            }
            Err(e) => {
                tracing::warn!("Onboarding task {} failed ({}): {}", task.id, e.reason(), e);
                self.tasks
                    .fail_task(&task.id, e.reason(), &e.to_string(), existing_device)
                    .await
            }
        };

        let touched = match &result {
            Ok(Reconciled::Onboarded(device_id)) => Some(*device_id),
            Ok(Reconciled::Skipped(_)) => None,
            Err(_) => existing_device,
        };
        if let Some(device_id) = touched {
            if let Err(e) = self.tasks.track_device(device_id).await {
                tracing::warn!("Failed to track onboarding state of device {}: {}", device_id, e);
            }
        }

        match stored {
            Ok(outcome) => outcome,
            Err(StoreError::NotPending(_)) => match self.tasks.get_task(&task.id).await {
                Ok(Some(outcome)) => outcome,
                _ => self.in_memory_outcome(task, &result, existing_device),
            },
            Err(e) => {
                tracing::error!("Failed to record outcome of onboarding task {}: {}", task.id, e);
                self.in_memory_outcome(task, &result, existing_device)
            }
        }
    }

    fn in_memory_outcome(
        &self,
        task: &OnboardingTask,
        result: &Result<Reconciled, OnboardError>,
        existing_device: Option<i64>,
    ) -> OnboardingTask {
        match result {
            Ok(Reconciled::Onboarded(device_id)) => {
                finished(task.clone(), task_status::SUCCEEDED, None, String::new(), Some(*device_id))
            }
            Ok(Reconciled::Skipped(device_id)) => finished(
                task.clone(),
                task_status::SKIPPED,
                None,
                skip_message(*device_id),
                None,
            ),
            Err(e) => finished(
                task.clone(),
                task_status::FAILED,
                Some(e.reason()),
                e.to_string(),
                existing_device,
            ),
        }
    }

    async fn reconcile(
        &self,
        task: &OnboardingTask,
        req: &OnboardingRequest,
        credentials: Option<&Credentials>,
        policy: &OnboardingPolicy,
        existing_device: &mut Option<i64>,
    ) -> Result<Reconciled, OnboardError> {
        let matcher = Matcher::new(self.inventory.as_ref(), policy);
        let hints = Hints::from(req);

        let address = resolve_target(&req.target, req.port).await?;
        let host = address.to_string();
        self.tasks.mark_task_started(&task.id, &host).await?;

        tracing::info!("CHECK: task {} target {} ({}) site {}", task.id, req.target, host, req.site);
        let site = matcher.resolve_site(&req.site).await?;
        let mut device = single_device(
            self.inventory.find_devices_by_primary_ip(&host).await?,
            "primary IP",
            &host,
        )?;
        *existing_device = device.as_ref().map(|d| d.id);
        if let Some(known) = &device {
            if !self.tasks.onboarding_enabled(known.id).await? {
                return Ok(Reconciled::Skipped(known.id));
            }
        }

        let driver_hint = match hints.platform {
            Some(slug) => Some(matcher.resolve_platform("", Some(slug)).await?.driver)
                .filter(|d| !d.is_empty()),
            None => None,
        };

        let creds = credentials
            .cloned()
            .unwrap_or_default()
            .merged_over(&self.default_credentials);
        let (Some(username), Some(password)) = (creds.username, creds.password) else {
            return Err(OnboardError::Auth(
                "no credentials supplied and no default credentials configured".to_string(),
            ));
        };
        let params = ConnectParams {
            address,
            port: req.port,
            username,
            password,
            secret: creds.secret,
            timeout: Duration::from_secs(req.timeout),
            driver_hint,
        };

        tracing::info!("COLLECT: identifying {}:{}", host, req.port);
        let fingerprint = self.connector.identify(&params).await?;
        let hostname = fingerprint.hostname.trim().to_string();
        if hostname.is_empty() {
            return Err(OnboardError::Execute(format!("{} reported no hostname", host)));
        }
        tracing::info!(
            "COLLECT: {} is {} {} ({}), serial {}, {} stack member(s)",
            hostname,
            fingerprint.vendor,
            fingerprint.model,
            fingerprint.platform,
            fingerprint.serial,
            fingerprint.stack_members.len()
        );

        if device.is_none() {
            device = single_device(
                self.inventory.find_devices_by_name(&hostname).await?,
                "name",
                &hostname,
            )?;
            *existing_device = device.as_ref().map(|d| d.id);
        }

        let (model, serial) = primary_identity(&fingerprint);
        let refs = match matcher
            .resolve(&fingerprint.platform, &fingerprint.vendor, &model, hints)
            .await
        {
            Err(OnboardError::MissingObject {
                kind: ObjectKind::DeviceType,
                name,
            }) if device.is_some() => Err(OnboardError::Conflict(format!(
                "discovered device type {} does not match the stored type and device type creation is disabled",
                name
            ))),
            other => other,
        }?;

        let primary = self
            .upsert_device(
                device,
                DeviceSpec {
                    name: hostname.clone(),
                    site_id: site.id,
                    device_type: &refs.device_type,
                    platform_id: refs.platform.id,
                    role_id: refs.role.id,
                    role_hinted: hints.role.is_some(),
                    serial,
                },
                policy,
            )
            .await?;
        *existing_device = Some(primary.id);

        if policy.create_management_interface_if_missing {
            let iface_name = fingerprint
                .mgmt_interface
                .clone()
                .unwrap_or_else(|| policy.default_management_interface.clone());
            let prefix_length = fingerprint
                .mgmt_prefix_length
                .unwrap_or(policy.default_management_prefix_length);

            let iface = self.inventory.get_or_create_interface(primary.id, &iface_name).await?;
            let ip = self.inventory.get_or_create_ip_address(&host, prefix_length).await?;
            self.inventory.assign_ip_address(ip.id, iface.id).await?;
            if primary.primary_ip_id != Some(ip.id) {
                self.inventory.set_primary_ip(primary.id, ip.id).await?;
            }
            tracing::info!("ASSIGN: {} on {} as primary IP of {}", ip.address, iface.name, primary.name);
        }

        let separator = req.stack_separator.unwrap_or(policy.stack_separator);
        for member in stack_secondaries(&fingerprint) {
            let member_name = format!("{}{}{}", hostname, separator, member.index);
            let device_type = matcher
                .resolve_device_type(&fingerprint.vendor, &member.model, None)
                .await?;
            let existing = single_device(
                self.inventory.find_devices_by_name(&member_name).await?,
                "name",
                &member_name,
            )?;
            self.upsert_device(
                existing,
                DeviceSpec {
                    name: member_name,
                    site_id: site.id,
                    device_type: &device_type,
                    platform_id: refs.platform.id,
                    role_id: refs.role.id,
                    role_hinted: hints.role.is_some(),
                    serial: member.serial.clone(),
                },
                policy,
            )
            .await?;
        }

        Ok(Reconciled::Onboarded(primary.id))
    }

    /// Create the device, or update the existing one within the limits of
    /// the skip flags. A type change with type creation disabled conflicts
    /// regardless of the skip flags.
    async fn upsert_device(
        &self,
        existing: Option<Device>,
        spec: DeviceSpec<'_>,
        policy: &OnboardingPolicy,
    ) -> Result<Device, OnboardError> {
        let Some(device) = existing else {
            let created = self
                .inventory
                .create_device(&CreateDeviceRequest {
                    name: spec.name,
                    site_id: spec.site_id,
                    role_id: spec.role_id,
                    device_type_id: spec.device_type.id,
                    manufacturer_id: spec.device_type.manufacturer_id,
                    platform_id: Some(spec.platform_id),
                    serial: spec.serial,
                    status: policy.default_device_status.clone(),
                })
                .await?;
            tracing::info!("CREATE: device {} (id {})", created.name, created.id);
            return Ok(created);
        };

        if device.device_type_id != spec.device_type.id && !policy.create_device_type_if_missing {
            return Err(OnboardError::Conflict(format!(
                "device {} is stored with a different device type than discovered {}",
                device.name, spec.device_type.slug
            )));
        }

        let update = UpdateDeviceRequest {
            name: Some(spec.name),
            site_id: Some(spec.site_id),
            role_id: spec.role_hinted.then_some(spec.role_id),
            device_type_id: (!policy.skip_device_type_on_update).then_some(spec.device_type.id),
            manufacturer_id: (!policy.skip_manufacturer_on_update)
                .then_some(spec.device_type.manufacturer_id),
            platform_id: Some(spec.platform_id),
            serial: Some(spec.serial),
        };
        let updated = self.inventory.update_device(device.id, &update).await?;
        tracing::info!("UPDATE: device {} (id {})", updated.name, updated.id);
        Ok(updated)
    }
}

/// At most one device may match an identifying key
fn single_device(mut found: Vec<Device>, key: &str, value: &str) -> Result<Option<Device>, OnboardError> {
    if found.len() > 1 {
        return Err(OnboardError::Conflict(format!(
            "{} devices share {} {}",
            found.len(),
            key,
            value
        )));
    }
    Ok(found.pop())
}

/// Model and serial of the primary unit: the lowest-index stack member for
/// stacks, the chassis otherwise.
fn primary_identity(fp: &DeviceFingerprint) -> (String, String) {
    if fp.stack_members.len() > 1 {
        if let Some(first) = fp.stack_members.iter().min_by_key(|m| m.index) {
            let model = if first.model.is_empty() { fp.model.clone() } else { first.model.clone() };
            let serial = if first.serial.is_empty() { fp.serial.clone() } else { first.serial.clone() };
            return (model, serial);
        }
    }
    (fp.model.clone(), fp.serial.clone())
}

/// Stack members other than the primary, in index order
fn stack_secondaries(fp: &DeviceFingerprint) -> Vec<&crate::drivers::StackMember> {
    if fp.stack_members.len() < 2 {
        return Vec::new();
    }
    let mut members: Vec<_> = fp.stack_members.iter().collect();
    members.sort_by_key(|m| m.index);
    members.into_iter().skip(1).collect()
}

fn skip_message(device_id: i64) -> String {
    format!("onboarding is disabled for device {}", device_id)
}

fn finished(
    mut task: OnboardingTask,
    status: &str,
    reason: Option<&str>,
    message: String,
    device_id: Option<i64>,
) -> OnboardingTask {
    task.status = status.to_string();
    task.failed_reason = reason.map(str::to_string);
    task.message = message;
    task.created_device_id = device_id;
    task.completed_at = Some(Utc::now());
    task
}
