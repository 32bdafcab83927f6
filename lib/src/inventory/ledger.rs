// lib/src/inventory/ledger.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;

use models::medical::{
    Actor, AuditAction, AuditEntry, EntityRef, Medicine, MedicineCategory, MedicineInput, MedicinePatch, NewMedicine,
};
use models::{HmsError, HmsResult, RecordId, RowFailure, ValidationError, ValidationResult};

use crate::audit::AuditTrail;
use crate::config::InventoryConfig;
use crate::storage_engine::{MedicineUpdate, RecordStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What `delete_medicine` did with the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Still referenced by prescription lines; kept but hidden from stock.
    Retired,
}

fn parse_name(raw: &str) -> ValidationResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name".into()));
    }
    Ok(name.to_string())
}

fn parse_quantity(raw: i64) -> ValidationResult<u32> {
    if raw < 0 {
        return Err(ValidationError::invalid("quantity", "must not be negative"));
    }
    u32::try_from(raw).map_err(|_| ValidationError::invalid("quantity", "is too large"))
}

fn parse_expiry(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::invalid("expiry_date", format!("'{}' is not a YYYY-MM-DD date", raw)))
}

/// Checks an add-medicine payload field by field.
pub fn validate_medicine_input(input: MedicineInput) -> ValidationResult<NewMedicine> {
    Ok(NewMedicine {
        name: parse_name(&input.name)?,
        category: input.category.parse::<MedicineCategory>()?,
        quantity: parse_quantity(input.quantity)?,
        expiry_date: parse_expiry(&input.expiry_date)?,
    })
}

/// Medicine stock. Quantities never go below zero.
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn RecordStore>,
    audit: AuditTrail,
    config: InventoryConfig,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditTrail, config: InventoryConfig) -> Self {
        InventoryLedger { store, audit, config }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub async fn get_medicine(&self, id: RecordId) -> HmsResult<Medicine> {
        self.store.get_medicine(id).await?.ok_or_else(|| HmsError::not_found("medicine", id))
    }

    pub async fn add_medicine(&self, actor: &Actor, input: MedicineInput) -> HmsResult<Medicine> {
        let new = validate_medicine_input(input)?;
        self.insert(actor, new).await
    }

    async fn insert(&self, actor: &Actor, new: NewMedicine) -> HmsResult<Medicine> {
        let now = Utc::now();
        let medicine = Medicine {
            id: self.store.next_id().await?,
            name: new.name,
            category: new.category,
            quantity: new.quantity,
            expiry_date: new.expiry_date,
            retired: false,
            created_at: now,
            updated_at: now,
        };
        self.store.put_medicine(medicine.clone()).await?;
        self.audit
            .record(AuditEntry::new(
                actor,
                AuditAction::MedicineAdded,
                EntityRef::Medicine(medicine.id),
                format!("{} ({}) x{}", medicine.name, medicine.category, medicine.quantity),
            ))
            .await?;
        Ok(medicine)
    }

    /// Applies the fields present in `patch`. Nothing is written when any of
    /// them is invalid. Stock moved by issuance meanwhile is kept unless the
    /// patch sets `quantity` itself.
    pub async fn edit_medicine(&self, actor: &Actor, id: RecordId, patch: MedicinePatch) -> HmsResult<Medicine> {
        let update = MedicineUpdate {
            name: patch.name.as_deref().map(parse_name).transpose()?,
            category: patch.category.as_deref().map(str::parse::<MedicineCategory>).transpose()?,
            quantity: patch.quantity.map(parse_quantity).transpose()?,
            expiry_date: patch.expiry_date.as_deref().map(parse_expiry).transpose()?,
            retired: None,
        };
        if update.is_empty() {
            return self.get_medicine(id).await;
        }
        let medicine = self.store.update_medicine(id, update.clone()).await?;
        self.audit
            .record(AuditEntry::new(
                actor,
                AuditAction::MedicineEdited,
                EntityRef::Medicine(id),
                format!("changed {}", update.changed_fields().join(", ")),
            ))
            .await?;
        Ok(medicine)
    }

    /// Hard-deletes an unreferenced medicine. One that prescription lines
    /// still point at is retired instead so their detail views keep resolving.
    pub async fn delete_medicine(&self, actor: &Actor, id: RecordId) -> HmsResult<DeleteOutcome> {
        let medicine = self.get_medicine(id).await?;
        let referenced = self.store.list_lines().await?.iter().any(|line| line.medicine_id == id);
        if referenced {
            if !medicine.retired {
                let retire = MedicineUpdate { retired: Some(true), ..Default::default() };
                self.store.update_medicine(id, retire).await?;
            }
            warn!("Medicine {} is referenced by prescriptions; retired instead of deleted", id);
            self.audit
                .record(AuditEntry::new(actor, AuditAction::MedicineRetired, EntityRef::Medicine(id), medicine.name))
                .await?;
            return Ok(DeleteOutcome::Retired);
        }
        if !self.store.delete_medicine(id).await? {
            return Err(HmsError::not_found("medicine", id));
        }
        self.audit
            .record(AuditEntry::new(actor, AuditAction::MedicineDeleted, EntityRef::Medicine(id), medicine.name))
            .await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Atomic compare-and-subtract.
    pub async fn decrement(&self, actor: &Actor, id: RecordId, amount: u32) -> HmsResult<Medicine> {
        if amount == 0 {
            return Err(ValidationError::invalid("amount", "must be positive").into());
        }
        let medicine = self.store.decrement_stock(id, amount).await?;
        self.audit
            .record(AuditEntry::new(
                actor,
                AuditAction::StockDecremented,
                EntityRef::Medicine(id),
                format!("-{} -> {}", amount, medicine.quantity),
            ))
            .await?;
        Ok(medicine)
    }

    /// Validates and inserts each row on its own. Rows are numbered from 1.
    /// When any row fails, the rows that did go in are reported alongside
    /// the failures as a `PartialApplication`.
    pub async fn bulk_import(&self, actor: &Actor, rows: Vec<MedicineInput>) -> HmsResult<Vec<Medicine>> {
        let mut applied = Vec::new();
        let mut failed = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            let outcome = match validate_medicine_input(row) {
                Ok(new) => self.insert(actor, new).await,
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(medicine) => applied.push(medicine),
                Err(e) => failed.push(RowFailure { row: index + 1, reason: e.to_string() }),
            }
        }
        info!("Bulk import: {} row(s) applied, {} row(s) failed", applied.len(), failed.len());
        if failed.is_empty() {
            Ok(applied)
        } else {
            Err(HmsError::PartialApplication { applied: applied.iter().map(|m| m.id).collect(), failed })
        }
    }
}
