//! In-memory inscription status records, keyed by generated request id.
//! Scratch bookkeeping for the front end's polling loop; nothing persists.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InscriptionStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InscriptionRecord {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub status: InscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_paid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: u64,
}

/// Owned by the server state; the mutex serializes request-scoped updates.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    inner: Mutex<HashMap<String, InscriptionRecord>>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending record and return its id.
    pub fn begin(&self, file_name: &str, file_type: &str) -> String {
        let id = crate::create_request_id();
        let record = InscriptionRecord {
            id: id.clone(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            status: InscriptionStatus::Pending,
            txid: None,
            ordinal_id: None,
            fee_paid: None,
            error: None,
            timestamp: now_secs(),
        };
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.clone(), record);
        id
    }

    pub fn complete(&self, id: &str, txid: &str, ordinal_id: &str, fee_paid: Option<u64>) {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(r) = map.get_mut(id) {
            r.status = InscriptionStatus::Success;
            r.txid = Some(txid.to_string());
            r.ordinal_id = Some(ordinal_id.to_string());
            r.fee_paid = fee_paid;
        }
    }

    pub fn fail(&self, id: &str, error: &str) {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(r) = map.get_mut(id) {
            r.status = InscriptionStatus::Failed;
            r.error = Some(error.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<InscriptionRecord> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<InscriptionRecord> {
        let mut out: Vec<InscriptionRecord> = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        out
    }
}
