use serde::{Deserialize, Serialize};

/// Non-fatal issue accumulated during an operation and returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Non-zero cost pool with a zero proration denominator
    ZeroDenominator,
    /// Items of a category present in a batch without a duty pool
    MissingDutyPool,
    /// Item without a category in a batch that carries duty pools
    UncategorizedItem,
    /// Sales row with no active sku_map entry
    UnmappedSku,
    /// Demand that could not be fully filled from inventory
    Shortfall,
    /// Imported sales row outside the declared month window
    OutsideMonth,
    /// Row dropped during CSV parsing
    SkippedRow,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
