pub(crate) mod inbound_model;
pub(crate) mod inbound_repository;
pub(crate) mod inbound_service;

pub use inbound_model::{
    Batch, BatchDB, BatchInput, DutyPool, DutyPoolDB, DutyPoolInput, ImportCounts, InboundImport,
    InboundItem, InboundItemDB, InboundItemInput,
};
pub use inbound_repository::InboundRepository;
pub use inbound_service::InboundService;
