// lib/src/storage_engine/storage_utils.rs

use bincode::config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::Serialize;

use models::{HmsError, HmsResult, RecordId};

/// Serializes a record to bytes using bincode.
pub fn serialize_record<T: Serialize>(record: &T) -> HmsResult<Vec<u8>> {
    encode_to_vec(record, config::standard()).map_err(|e| HmsError::Serialization(e.to_string()))
}

/// Deserializes bytes written by [`serialize_record`].
pub fn deserialize_record<T: DeserializeOwned>(bytes: &[u8]) -> HmsResult<T> {
    decode_from_slice(bytes, config::standard())
        .map(|(val, _)| val)
        .map_err(|e| HmsError::Serialization(e.to_string()))
}

/// Big-endian so that sled iterates records in id order.
pub fn id_key(id: RecordId) -> [u8; 8] {
    id.to_be_bytes()
}

/// Line keys are prefixed with the owning prescription so a prescription's
/// lines can be read with one prefix scan.
pub fn line_key(prescription_id: RecordId, line_id: RecordId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&prescription_id.to_be_bytes());
    key[8..].copy_from_slice(&line_id.to_be_bytes());
    key
}

pub fn id_from_key(bytes: &[u8]) -> Option<RecordId> {
    let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(RecordId::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::medical::{Medicine, MedicineCategory};

    #[test]
    fn line_keys_sort_by_prescription_then_line() {
        assert!(line_key(1, 900) < line_key(2, 3));
        assert!(line_key(2, 3) < line_key(2, 4));
        assert_eq!(id_from_key(&line_key(7, 1)), Some(7));
    }

    #[test]
    fn medicine_survives_bincode() {
        let now = chrono::Utc::now();
        let medicine = Medicine {
            id: 12,
            name: "Cetirizine".into(),
            category: MedicineCategory::Tablet,
            quantity: 40,
            expiry_date: chrono::NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            retired: false,
            created_at: now,
            updated_at: now,
        };
        let bytes = serialize_record(&medicine).unwrap();
        let back: Medicine = deserialize_record(&bytes).unwrap();
        assert_eq!(back, medicine);
    }
}
