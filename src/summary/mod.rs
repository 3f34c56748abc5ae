pub(crate) mod summary_model;
pub(crate) mod summary_repository;
pub(crate) mod summary_service;

pub use summary_model::{MonthSummary, MonthSummaryDB};
pub use summary_repository::SummaryRepository;
pub use summary_service::SummaryService;
