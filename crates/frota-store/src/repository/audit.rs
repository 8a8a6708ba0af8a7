//! # Audit Repository
//!
//! Contracts removed from `contracts_terminated` are kept under
//! `audit/{category}/{id}` with who removed them and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use frota_core::{Contract, UserMeta};

use super::{decode, decode_children};
use crate::error::StoreResult;
use crate::path;
use crate::store::DocumentStore;

/// A removed contract plus its removal stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(flatten)]
    pub contract: Contract,
    pub removido_por: UserMeta,
    pub removido_em: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(contract: Contract, by: UserMeta, at: DateTime<Utc>) -> Self {
        AuditEntry {
            contract,
            removido_por: by,
            removido_em: at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditRepository {
    store: Arc<dyn DocumentStore>,
}

impl AuditRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        AuditRepository { store }
    }

    pub async fn get(&self, category: &str, id: &str) -> StoreResult<Option<AuditEntry>> {
        let path = path::audit_entry(category, id);
        match self.store.read(&path).await? {
            Some(value) => {
                let mut entry: AuditEntry = decode(&path, value)?;
                entry.contract.id = id.to_string();
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    pub async fn list(&self, category: &str) -> StoreResult<Vec<AuditEntry>> {
        let collection = path::audit_category(category);
        let node = self.store.read(&collection).await?;
        Ok(decode_children::<AuditEntry>(&collection, node)
            .into_iter()
            .map(|(id, mut entry)| {
                entry.contract.id = id;
                entry
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Store;
    use serde_json::json;

    #[test]
    fn test_entry_serializes_flat() {
        let mut contract = Contract::default();
        contract.cliente.nome = "Rui".into();
        let at = Utc::now();
        let entry = AuditEntry::new(contract, UserMeta::anonymous(), at);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["cliente"]["nome"], json!("Rui"));
        assert_eq!(value["removidoPor"]["nome"], json!("—"));
        assert!(value.get("contract").is_none());

        let back: AuditEntry = serde_json::from_value(value).unwrap();
        assert!(back.contract.extra.get("removidoPor").is_none());
        assert_eq!(back.removido_em, at);
    }

    #[tokio::test]
    async fn test_list_category() {
        let store = Store::memory();
        store
            .raw()
            .write(
                "audit/terminated_removed/c9",
                json!({
                    "cliente": {"nome": "Rui"},
                    "removidoPor": {"nome": "Ops"},
                    "removidoEm": "2024-05-01T10:00:00Z"
                }),
            )
            .await
            .unwrap();

        let entries = store.audit().list("terminated_removed").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].contract.id, "c9");
        assert_eq!(entries[0].removido_por.nome, "Ops");
        assert!(store.audit().list("other").await.unwrap().is_empty());
    }
}
