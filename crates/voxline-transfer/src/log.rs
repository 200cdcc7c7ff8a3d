// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory transfer audit log, partitioned by tenant.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use voxline_core::DestinationType;

/// One transfer attempt as recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferLogEntry {
    pub timestamp: DateTime<Utc>,
    pub call_uuid: String,
    pub domain_uuid: String,
    pub success: bool,
    pub destination_type: Option<DestinationType>,
    pub destination_value: Option<String>,
    pub destination_dialplan: Option<String>,
    pub error: Option<String>,
    pub attempt: u32,
}

/// Bounded per-tenant log. When a tenant's log grows past `capacity` the
/// oldest entries are dropped until `trim_to` remain.
pub struct TransferLog {
    capacity: usize,
    trim_to: usize,
    tenants: DashMap<String, VecDeque<TransferLogEntry>>,
}

impl TransferLog {
    pub fn new(capacity: usize, trim_to: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            trim_to: trim_to.min(capacity).max(1),
            tenants: DashMap::new(),
        }
    }

    pub fn record(&self, entry: TransferLogEntry) {
        let mut log = self.tenants.entry(entry.domain_uuid.clone()).or_default();
        log.push_back(entry);
        if log.len() > self.capacity {
            let excess = log.len() - self.trim_to;
            log.drain(..excess);
        }
    }

    /// The newest `limit` entries of one tenant, oldest first.
    pub fn entries(&self, domain_uuid: &str, limit: usize) -> Vec<TransferLogEntry> {
        self.tenants
            .get(domain_uuid)
            .map(|log| {
                let skip = log.len().saturating_sub(limit);
                log.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// The newest `limit` entries across all tenants, oldest first.
    pub fn all_entries(&self, limit: usize) -> Vec<TransferLogEntry> {
        let mut all: Vec<TransferLogEntry> = self
            .tenants
            .iter()
            .flat_map(|log| log.value().iter().cloned().collect::<Vec<_>>())
            .collect();
        all.sort_by_key(|e| e.timestamp);
        let skip = all.len().saturating_sub(limit);
        all.split_off(skip)
    }

    pub fn len(&self, domain_uuid: &str) -> usize {
        self.tenants.get(domain_uuid).map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.iter().all(|log| log.is_empty())
    }
}
