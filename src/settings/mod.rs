pub(crate) mod settings_model;
pub(crate) mod settings_repository;
pub(crate) mod settings_service;

pub use settings_model::{AppSetting, CoreSettings, SettingsUpdate};
pub use settings_repository::SettingsRepository;
pub use settings_service::SettingsService;
