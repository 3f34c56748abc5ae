use std::sync::Arc;

use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::app_settings::dsl::*;
use crate::settings::settings_model::{AppSetting, CoreSettings, SettingsUpdate};

pub struct SettingsRepository {
    pool: Arc<DbPool>,
}

impl SettingsRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        SettingsRepository { pool }
    }

    pub fn get_settings(&self) -> Result<CoreSettings> {
        let mut conn = get_connection(&self.pool)?;
        let all_settings: Vec<(String, String)> = app_settings
            .select((setting_key, setting_value))
            .load::<(String, String)>(&mut conn)
            .map_err(Error::from)?;

        let mut settings = CoreSettings::default();

        for (key, value) in all_settings {
            match key.as_str() {
                "order_label" => settings.order_label = value,
                "refund_label" => settings.refund_label = value,
                "reporting_timezone" => settings.reporting_timezone = value,
                "allow_negative_lots" => {
                    settings.allow_negative_lots = value.parse().unwrap_or(false);
                }
                "allow_fractional_kits" => {
                    settings.allow_fractional_kits = value.parse().unwrap_or(false);
                }
                "rebuild_timeout_secs" => {
                    settings.rebuild_timeout_secs =
                        value.parse().unwrap_or(settings.rebuild_timeout_secs);
                }
                _ => {} // Ignore unknown settings
            }
        }

        Ok(settings)
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        let mut rows: Vec<AppSetting> = Vec::new();
        if let Some(ref v) = update.order_label {
            rows.push(row("order_label", v.clone()));
        }
        if let Some(ref v) = update.refund_label {
            rows.push(row("refund_label", v.clone()));
        }
        if let Some(ref v) = update.reporting_timezone {
            rows.push(row("reporting_timezone", v.clone()));
        }
        if let Some(v) = update.allow_negative_lots {
            rows.push(row("allow_negative_lots", v.to_string()));
        }
        if let Some(v) = update.allow_fractional_kits {
            rows.push(row("allow_fractional_kits", v.to_string()));
        }
        if let Some(v) = update.rebuild_timeout_secs {
            rows.push(row("rebuild_timeout_secs", v.to_string()));
        }

        for setting in rows {
            diesel::replace_into(app_settings)
                .values(&setting)
                .execute(&mut conn)?;
        }

        Ok(())
    }
}

fn row(key: &str, value: String) -> AppSetting {
    AppSetting {
        setting_key: key.to_string(),
        setting_value: value,
    }
}
