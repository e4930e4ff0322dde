//! Per-session record of what each submission attempt did

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::models::ResourceRef;

/// Outcome of one planned operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Created,
    /// Already existed with this session's annotation
    Adopted,
    Updated,
    Failed,
    /// Unchanged since an earlier attempt
    Skipped,
}

impl OperationStatus {
    /// Whether the resource is known to exist on the server
    pub fn exists(self) -> bool {
        matches!(
            self,
            OperationStatus::Created
                | OperationStatus::Adopted
                | OperationStatus::Updated
                | OperationStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub key: String,
    pub resource: ResourceRef,
    /// Fingerprint of the payload last sent for this operation
    pub fingerprint: String,
    pub status: OperationStatus,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    attempts: u32,
    entries: Vec<LedgerEntry>,
    /// Resources created by earlier attempts under a name the plan dropped
    orphans: Vec<ResourceRef>,
}

impl Ledger {
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn orphans(&self) -> &[ResourceRef] {
        &self.orphans
    }

    pub(crate) fn start_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Move the resource recorded for `key` to the orphans when the plan now
    /// targets `planned` instead. Returns the resource that was moved.
    pub(crate) fn retire(&mut self, key: &str, planned: &ResourceRef) -> Option<ResourceRef> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.key == key && e.status.exists() && e.resource != *planned)?;
        entry.status = OperationStatus::Pending;
        entry.updated_at = Utc::now();
        let previous = entry.resource.clone();
        if !self.orphans.contains(&previous) {
            self.orphans.push(previous.clone());
        }
        Some(previous)
    }

    /// Insert or replace the entry for `key`
    pub fn record(
        &mut self,
        key: &str,
        resource: ResourceRef,
        fingerprint: String,
        status: OperationStatus,
        message: Option<String>,
    ) {
        if status.exists() {
            self.orphans.retain(|o| *o != resource);
        }
        let entry = LedgerEntry {
            key: key.to_string(),
            resource,
            fingerprint,
            status,
            message,
            updated_at: Utc::now(),
        };
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Resources known to exist: planned ones in plan order, then orphans
    pub fn existing(&self) -> Vec<ResourceRef> {
        self.entries
            .iter()
            .filter(|e| e.status.exists())
            .map(|e| e.resource.clone())
            .chain(self.orphans.iter().cloned())
            .collect()
    }

    pub fn status(&self, key: &str) -> Option<OperationStatus> {
        self.entry(key).map(|e| e.status)
    }
}
