use std::sync::Arc;

use log::info;

use crate::db::DbPool;
use crate::errors::Result;
use crate::settings::settings_model::{CoreSettings, SettingsUpdate};
use crate::settings::SettingsRepository;

/// Service for reading and updating the core configuration.
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            repo: SettingsRepository::new(pool),
        }
    }

    pub fn get_settings(&self) -> Result<CoreSettings> {
        self.repo.get_settings()
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<CoreSettings> {
        if let Some(ref tz) = update.reporting_timezone {
            // Validate before persisting so a bad tz never reaches month windows
            let probe = CoreSettings {
                reporting_timezone: tz.clone(),
                ..CoreSettings::default()
            };
            probe.reporting_tz()?;
        }

        self.repo.update_settings(update)?;
        info!("Core settings updated");
        self.repo.get_settings()
    }
}
