// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only tenant configuration lookups and the TOML-backed store.

use std::collections::HashMap;

use async_trait::async_trait;
use voxline_config::model::VoxlineConfig;
use voxline_core::{TransferDestination, VoxlineError};

use crate::time_condition::TimeConditionConfig;

/// Source of transfer destinations, keyed by tenant.
#[async_trait]
pub trait DestinationStore: Send + Sync + 'static {
    /// All destinations of `domain_uuid`, disabled ones included, in
    /// configuration order. Unknown tenants yield an empty list.
    async fn destinations(
        &self,
        domain_uuid: &str,
    ) -> Result<Vec<TransferDestination>, VoxlineError>;

    /// Tenant-local timezone, when the tenant configures one.
    async fn timezone(&self, _domain_uuid: &str) -> Result<Option<String>, VoxlineError> {
        Ok(None)
    }
}

/// Source of named business-hours schedules, keyed by tenant.
#[async_trait]
pub trait TimeConditionStore: Send + Sync + 'static {
    async fn time_condition(
        &self,
        domain_uuid: &str,
        condition_uuid: &str,
    ) -> Result<Option<TimeConditionConfig>, VoxlineError>;
}

#[derive(Debug, Default)]
struct TenantData {
    timezone: Option<String>,
    destinations: Vec<TransferDestination>,
    conditions: HashMap<String, TimeConditionConfig>,
}

/// Tenant data taken from the `[[domains]]` configuration tables.
#[derive(Debug, Default)]
pub struct StaticStore {
    tenants: HashMap<String, TenantData>,
}

impl StaticStore {
    /// Builds the store. Time conditions whose schedule does not parse are
    /// skipped with a warning, so lookups treat them as unrestricted.
    pub fn from_config(config: &VoxlineConfig) -> Self {
        let mut tenants = HashMap::new();
        for domain in &config.domains {
            let timezone = domain
                .timezone
                .clone()
                .unwrap_or_else(|| config.service.default_timezone.clone());
            let mut conditions = HashMap::new();
            for entry in &domain.time_conditions {
                match TimeConditionConfig::from_entry(entry, &timezone) {
                    Ok(condition) => {
                        conditions.insert(entry.uuid.clone(), condition);
                    }
                    Err(e) => tracing::warn!(
                        domain_uuid = %domain.domain_uuid,
                        time_condition = %entry.uuid,
                        error = %e,
                        "skipping time condition with invalid schedule"
                    ),
                }
            }
            tenants.insert(
                domain.domain_uuid.clone(),
                TenantData {
                    timezone: Some(timezone),
                    destinations: domain.destinations.clone(),
                    conditions,
                },
            );
        }
        Self { tenants }
    }

    /// Adds or replaces one tenant's destinations.
    pub fn with_destinations(
        mut self,
        domain_uuid: impl Into<String>,
        destinations: Vec<TransferDestination>,
    ) -> Self {
        self.tenants.entry(domain_uuid.into()).or_default().destinations = destinations;
        self
    }

    pub fn with_time_condition(
        mut self,
        domain_uuid: impl Into<String>,
        condition: TimeConditionConfig,
    ) -> Self {
        self.tenants
            .entry(domain_uuid.into())
            .or_default()
            .conditions
            .insert(condition.uuid.clone(), condition);
        self
    }

    pub fn with_timezone(mut self, domain_uuid: impl Into<String>, timezone: &str) -> Self {
        self.tenants.entry(domain_uuid.into()).or_default().timezone = Some(timezone.to_string());
        self
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

#[async_trait]
impl DestinationStore for StaticStore {
    async fn destinations(
        &self,
        domain_uuid: &str,
    ) -> Result<Vec<TransferDestination>, VoxlineError> {
        Ok(self
            .tenants
            .get(domain_uuid)
            .map(|t| t.destinations.clone())
            .unwrap_or_default())
    }

    async fn timezone(&self, domain_uuid: &str) -> Result<Option<String>, VoxlineError> {
        Ok(self.tenants.get(domain_uuid).and_then(|t| t.timezone.clone()))
    }
}

#[async_trait]
impl TimeConditionStore for StaticStore {
    async fn time_condition(
        &self,
        domain_uuid: &str,
        condition_uuid: &str,
    ) -> Result<Option<TimeConditionConfig>, VoxlineError> {
        Ok(self
            .tenants
            .get(domain_uuid)
            .and_then(|t| t.conditions.get(condition_uuid))
            .cloned())
    }
}
