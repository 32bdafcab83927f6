// lib/src/lib.rs

//! Core of the prescription lifecycle service: record store engines, the
//! lifecycle engine, the inventory ledger, role-scoped queries and the audit
//! trail.

pub mod audit;
pub mod config;
pub mod inventory;
pub mod lifecycle;
pub mod query;
pub mod roster;
pub mod storage_engine;

use std::sync::Arc;

use anyhow::Result;

pub use crate::audit::AuditTrail;
pub use crate::config::{HmsConfig, StorageConfig, StorageEngineType};
pub use crate::inventory::{DeleteOutcome, InventoryLedger};
pub use crate::lifecycle::{DoctorUpdateOutcome, IssueOutcome, LabResultOutcome, LifecycleEngine};
pub use crate::query::QueryService;
pub use crate::storage_engine::{create_storage, RecordStore};

/// The services sharing one store, as wired by the server.
#[derive(Clone)]
pub struct HmsServices {
    pub store: Arc<dyn RecordStore>,
    pub audit: AuditTrail,
    pub lifecycle: LifecycleEngine,
    pub inventory: InventoryLedger,
    pub query: QueryService,
}

impl HmsServices {
    pub fn new(store: Arc<dyn RecordStore>, config: &HmsConfig) -> Self {
        let audit = AuditTrail::new(store.clone());
        HmsServices {
            lifecycle: LifecycleEngine::new(store.clone(), audit.clone(), config.lifecycle.clone()),
            inventory: InventoryLedger::new(store.clone(), audit.clone(), config.inventory.clone()),
            query: QueryService::new(store.clone(), audit.clone(), config.inventory.clone(), config.query.clone()),
            audit,
            store,
        }
    }

    /// Opens the configured store and wires the services over it.
    pub fn from_config(config: &HmsConfig) -> Result<Self> {
        let store = create_storage(&config.storage)?;
        Ok(Self::new(store, config))
    }
}
