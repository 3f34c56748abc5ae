/// Marketplace key for the cross-marketplace summary row
pub const ALL_MARKETPLACES: &str = "ALL";

/// Synthetic batch id used when allocating against negative inventory
pub const PENDING_BATCH_ID: &str = "PENDING";

/// Default transaction label selecting order rows in sales imports
pub const DEFAULT_ORDER_LABEL: &str = "Order";

/// Default transaction label for refund rows (ignored by the normalizer)
pub const DEFAULT_REFUND_LABEL: &str = "Refund";

/// Decimal precision for report boundaries (month summary)
pub const REPORT_DECIMAL_PRECISION: u32 = 2;

/// Default wall-clock budget for a month rebuild, in seconds
pub const DEFAULT_REBUILD_TIMEOUT_SECS: u64 = 600;
