// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached, per-tenant access to transfer destinations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use voxline_core::{DestinationType, TransferDestination, VoxlineError};

use crate::cache::TtlCache;
use crate::matching;
use crate::store::DestinationStore;

/// Loads destinations through a [`DestinationStore`] and answers matching
/// queries against them.
pub struct DestinationLoader {
    store: Arc<dyn DestinationStore>,
    cache: TtlCache<Arc<Vec<TransferDestination>>>,
    default_timezone: String,
}

impl DestinationLoader {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        cache_ttl: Duration,
        default_timezone: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache: TtlCache::new(cache_ttl),
            default_timezone: default_timezone.into(),
        }
    }

    /// Every stored destination of the tenant, disabled ones included.
    pub async fn load(
        &self,
        domain_uuid: &str,
    ) -> Result<Arc<Vec<TransferDestination>>, VoxlineError> {
        if let Some(cached) = self.cache.get(domain_uuid) {
            return Ok(cached);
        }
        let destinations = Arc::new(self.store.destinations(domain_uuid).await?);
        tracing::debug!(
            domain_uuid,
            count = destinations.len(),
            "loaded transfer destinations"
        );
        self.cache
            .insert(domain_uuid.to_string(), Arc::clone(&destinations));
        Ok(destinations)
    }

    /// Best match for a spoken or typed destination name.
    pub async fn find(
        &self,
        domain_uuid: &str,
        query: &str,
    ) -> Result<Option<TransferDestination>, VoxlineError> {
        let destinations = self.load(domain_uuid).await?;
        let found = matching::find_by_alias(query, &destinations).cloned();
        match &found {
            Some(dest) => tracing::info!(
                domain_uuid,
                query,
                destination = %dest.name,
                "destination matched"
            ),
            None => tracing::debug!(domain_uuid, query, "no destination matched"),
        }
        Ok(found)
    }

    /// Best match among destinations of one type. Numeric queries also match
    /// the destination number.
    pub async fn find_of_type(
        &self,
        domain_uuid: &str,
        query: &str,
        destination_type: DestinationType,
    ) -> Result<Option<TransferDestination>, VoxlineError> {
        let destinations = self.load(domain_uuid).await?;
        let by_number = matching::find_by_number(query, &destinations)
            .filter(|d| d.destination_type == destination_type);
        Ok(by_number
            .or_else(|| matching::find_by_alias_of_type(query, &destinations, destination_type))
            .cloned())
    }

    /// Enabled destination dialled at `number`.
    pub async fn find_by_number(
        &self,
        domain_uuid: &str,
        number: &str,
    ) -> Result<Option<TransferDestination>, VoxlineError> {
        let destinations = self.load(domain_uuid).await?;
        Ok(matching::find_by_number(number, &destinations).cloned())
    }

    pub async fn get_default(
        &self,
        domain_uuid: &str,
    ) -> Result<Option<TransferDestination>, VoxlineError> {
        let destinations = self.load(domain_uuid).await?;
        Ok(matching::get_default(&destinations).cloned())
    }

    /// Current wall-clock time in the tenant's timezone.
    ///
    /// An unresolvable timezone falls back to the service default, then UTC.
    pub async fn tenant_now(&self, domain_uuid: &str) -> Result<NaiveDateTime, VoxlineError> {
        let configured = self.store.timezone(domain_uuid).await?;
        let name = configured.as_deref().unwrap_or(&self.default_timezone);
        let tz = name
            .parse::<Tz>()
            .or_else(|_| self.default_timezone.parse::<Tz>())
            .unwrap_or_else(|_| {
                tracing::warn!(domain_uuid, timezone = name, "unknown timezone, using UTC");
                Tz::UTC
            });
        Ok(Utc::now().with_timezone(&tz).naive_local())
    }

    /// Whether `dest` is inside its working hours right now, tenant-local.
    pub async fn is_available_now(
        &self,
        domain_uuid: &str,
        dest: &TransferDestination,
    ) -> Result<bool, VoxlineError> {
        if dest.working_hours.is_none() {
            return Ok(true);
        }
        let now = self.tenant_now(domain_uuid).await?;
        Ok(matching::is_within_working_hours(dest, now))
    }

    /// Drops the cached list for one tenant.
    pub fn invalidate(&self, domain_uuid: &str) {
        self.cache.invalidate(domain_uuid);
        tracing::info!(domain_uuid, "destination cache invalidated");
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}
