//! Adapter for drug records in the prototype's storage shape.

use serde::{Deserialize, Serialize};

use super::item::{InventoryItem, Unit};
use super::timestamp::parse_instant;

/// Drug record as written by the prototype front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDrug {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    pub quantity: u32,
    /// `YYYY-MM-DD`
    pub expiry_date: String,
    #[serde(default)]
    pub batch_number: String,
    pub threshold: u32,
}

impl TryFrom<LegacyDrug> for InventoryItem {
    type Error = String;

    /// The prototype stored an expiry date instead of a stocking date and
    /// shelf life, so the expiry date becomes `created_at` with a zero use
    /// period. The derived expiry is then exactly the stored one.
    fn try_from(drug: LegacyDrug) -> Result<Self, Self::Error> {
        let expiry = parse_instant(&drug.expiry_date).ok_or_else(|| {
            format!(
                "legacy drug '{}' has an invalid expiry date: {}",
                drug.name, drug.expiry_date
            )
        })?;

        let mut parts = Vec::new();
        if !drug.dosage.trim().is_empty() {
            parts.push(drug.dosage.trim().to_string());
        }
        if !drug.batch_number.trim().is_empty() {
            parts.push(format!("batch {}", drug.batch_number.trim()));
        }

        Ok(InventoryItem {
            id: drug.id,
            name: drug.name,
            description: parts.join(", "),
            quantity: drug.quantity,
            unit: Unit::Tablets,
            price: 0.0,
            use_period: 0,
            reorder_level: drug.threshold,
            created_at: expiry,
            updated_at: expiry,
        })
    }
}

/// A persisted drug record in either shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredDrug {
    Current(InventoryItem),
    Legacy(LegacyDrug),
}

impl TryFrom<StoredDrug> for InventoryItem {
    type Error = String;

    fn try_from(stored: StoredDrug) -> Result<Self, Self::Error> {
        match stored {
            StoredDrug::Current(item) => Ok(item),
            StoredDrug::Legacy(drug) => drug.try_into(),
        }
    }
}
