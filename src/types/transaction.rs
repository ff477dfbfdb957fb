//! Transaction request payload accepted by `POST /predict`

use crate::error::PredictError;
use serde_json::{Map, Value};

/// Request fields that must all be present for a prediction
pub const REQUIRED_FIELDS: [&str; 6] = [
    "transactionType",
    "amount",
    "originOldBalance",
    "originNewBalance",
    "destOldBalance",
    "destNewBalance",
];

/// A transaction submitted for scoring.
///
/// Presence of every field is checked on construction. Values are kept as raw
/// JSON so that coercion to numbers happens during feature extraction, where
/// a failure is reported as a processing error rather than a validation one.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    /// Transaction type label, e.g. "CASH_OUT" or "cash out"
    pub transaction_type: Value,

    /// Transaction amount
    pub amount: Value,

    /// Origin account balance before the transaction
    pub origin_old_balance: Value,

    /// Origin account balance after the transaction
    pub origin_new_balance: Value,

    /// Destination account balance before the transaction
    pub dest_old_balance: Value,

    /// Destination account balance after the transaction
    pub dest_new_balance: Value,
}

impl TransactionInput {
    /// Parse a request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PredictError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| not_an_object())?;
        Self::from_value(value)
    }

    /// Build from an already decoded JSON document.
    pub fn from_value(value: Value) -> Result<Self, PredictError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(not_an_object()),
        }
    }

    /// Build from a JSON object, failing if any required field is absent.
    ///
    /// A field explicitly set to `null` counts as present.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, PredictError> {
        if !REQUIRED_FIELDS.iter().all(|field| map.contains_key(*field)) {
            return Err(PredictError::missing_fields());
        }

        let mut take = |field: &str| map.remove(field).unwrap_or(Value::Null);

        Ok(Self {
            transaction_type: take("transactionType"),
            amount: take("amount"),
            origin_old_balance: take("originOldBalance"),
            origin_new_balance: take("originNewBalance"),
            dest_old_balance: take("destOldBalance"),
            dest_new_balance: take("destNewBalance"),
        })
    }

    /// Numeric request fields paired with their request names
    pub fn numeric_fields(&self) -> [(&'static str, &Value); 5] {
        [
            ("amount", &self.amount),
            ("originOldBalance", &self.origin_old_balance),
            ("originNewBalance", &self.origin_new_balance),
            ("destOldBalance", &self.dest_old_balance),
            ("destNewBalance", &self.dest_new_balance),
        ]
    }
}

fn not_an_object() -> PredictError {
    PredictError::Validation("Request body must be a JSON object".to_string())
}
