//! Feature extraction for fraud model inference.
//!
//! Maps a transaction request onto the columns the classifier was trained on:
//! five balance/amount fields plus a one-hot encoding of the transaction type.
//! Features are emitted in the exact order recorded with the model artifact.

use crate::error::{ModelError, PredictError};
use crate::types::transaction::TransactionInput;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Request field name to training column name for the numeric inputs
pub const BALANCE_FIELD_MAP: [(&str, &str); 5] = [
    ("amount", "amount"),
    ("originOldBalance", "oldbalanceOrg"),
    ("originNewBalance", "newbalanceOrig"),
    ("destOldBalance", "oldbalanceDest"),
    ("destNewBalance", "newbalanceDest"),
];

/// Prefix of the one-hot transaction type columns
const TYPE_COLUMN_PREFIX: &str = "type_";

/// Transaction categories seen during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    CashIn,
    CashOut,
    Debit,
    Payment,
    Transfer,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::CashIn,
        TransactionType::CashOut,
        TransactionType::Debit,
        TransactionType::Payment,
        TransactionType::Transfer,
    ];

    /// One-hot column name for this category
    pub fn column(self) -> &'static str {
        match self {
            TransactionType::CashIn => "type_CASH_IN",
            TransactionType::CashOut => "type_CASH_OUT",
            TransactionType::Debit => "type_DEBIT",
            TransactionType::Payment => "type_PAYMENT",
            TransactionType::Transfer => "type_TRANSFER",
        }
    }

    /// Resolve a raw request label such as `"cash out"` or `"CASH_OUT"`.
    ///
    /// Returns `None` for categories the model was not trained on.
    pub fn parse(raw: &str) -> Option<Self> {
        let column = Self::normalize(raw);
        Self::ALL.into_iter().find(|t| t.column() == column)
    }

    /// Normalized one-hot column name for a raw label: spaces become
    /// underscores, letters are uppercased and the `type_` prefix is added.
    pub fn normalize(raw: &str) -> String {
        format!("{}{}", TYPE_COLUMN_PREFIX, raw.replace(' ', "_").to_uppercase())
    }
}

/// Ordered list of feature names the classifier expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema, rejecting empty, blank or duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self, ModelError> {
        if names.is_empty() {
            return Err(ModelError::InvalidSchema("no feature names".to_string()));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(ModelError::InvalidSchema("blank feature name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ModelError::InvalidSchema(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    /// Parse a comma separated list, e.g. `"amount,oldbalanceOrg,type_DEBIT"`.
    pub fn from_delimited(raw: &str) -> Result<Self, ModelError> {
        let names = raw
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Feature extractor that transforms transaction requests into model input rows.
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    /// Create a new feature extractor for the given column ordering.
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Named feature values derived from the request, before ordering.
    ///
    /// Every known one-hot column is present (0.0 or 1.0); an unknown
    /// transaction type leaves all of them at 0.0.
    pub fn named_features(
        &self,
        input: &TransactionInput,
    ) -> Result<HashMap<&'static str, f64>, PredictError> {
        let mut features = HashMap::with_capacity(BALANCE_FIELD_MAP.len() + TransactionType::ALL.len());

        for transaction_type in TransactionType::ALL {
            features.insert(transaction_type.column(), 0.0);
        }

        let raw_type = input.transaction_type.as_str().ok_or_else(|| {
            PredictError::invalid_field(
                "transactionType",
                format!("transactionType must be a string, got {}", input.transaction_type),
            )
        })?;
        if let Some(transaction_type) = TransactionType::parse(raw_type) {
            features.insert(transaction_type.column(), 1.0);
        }

        for ((request_field, value), (_, column)) in
            input.numeric_fields().into_iter().zip(BALANCE_FIELD_MAP)
        {
            features.insert(column, coerce_f64(request_field, value)?);
        }

        Ok(features)
    }

    /// Extract a single feature row ordered by the schema.
    ///
    /// Schema columns the request does not produce are filled with 0.0.
    pub fn extract(&self, input: &TransactionInput) -> Result<Vec<f64>, PredictError> {
        let features = self.named_features(input)?;

        Ok(self
            .schema
            .names()
            .iter()
            .map(|name| features.get(name.as_str()).copied().unwrap_or(0.0))
            .collect())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

/// Coerce a JSON value to a float.
///
/// Numbers pass through, booleans map to 0.0/1.0, and strings are parsed
/// after trimming whitespace. Anything else is a processing error.
pub fn coerce_f64(field: &str, value: &Value) -> Result<f64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        PredictError::invalid_field(field, format!("could not convert {} to float: {}", field, value))
    })
}
