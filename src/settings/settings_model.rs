use chrono_tz::Tz;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ORDER_LABEL, DEFAULT_REBUILD_TIMEOUT_SECS, DEFAULT_REFUND_LABEL};
use crate::errors::{ConfigError, Error, Result};

/// Database model for a single settings row
#[derive(Queryable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::app_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AppSetting {
    pub setting_key: String,
    pub setting_value: String,
}

/// Effective core configuration, merged from stored rows over defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoreSettings {
    /// Sales rows whose type matches this label (case-insensitively) are orders
    pub order_label: String,
    /// Rows matching this label are counted and skipped by the normalizer
    pub refund_label: String,
    /// Reporting timezone used for month windows (IANA name)
    pub reporting_timezone: String,
    /// Permit allocating a shortfall remainder against a synthetic pending lot
    pub allow_negative_lots: bool,
    /// Permit non-integer kit multipliers in the catalog
    pub allow_fractional_kits: bool,
    /// Wall-clock budget for a month rebuild
    pub rebuild_timeout_secs: u64,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            order_label: DEFAULT_ORDER_LABEL.to_string(),
            refund_label: DEFAULT_REFUND_LABEL.to_string(),
            reporting_timezone: "UTC".to_string(),
            allow_negative_lots: false,
            allow_fractional_kits: false,
            rebuild_timeout_secs: DEFAULT_REBUILD_TIMEOUT_SECS,
        }
    }
}

impl CoreSettings {
    pub fn reporting_tz(&self) -> Result<Tz> {
        self.reporting_timezone.parse::<Tz>().map_err(|_| {
            Error::Config(ConfigError::InvalidValue(format!(
                "unknown timezone '{}'",
                self.reporting_timezone
            )))
        })
    }
}

/// Partial update; only present fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub order_label: Option<String>,
    pub refund_label: Option<String>,
    pub reporting_timezone: Option<String>,
    pub allow_negative_lots: Option<bool>,
    pub allow_fractional_kits: Option<bool>,
    pub rebuild_timeout_secs: Option<u64>,
}
