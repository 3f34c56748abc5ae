pub(crate) mod allocation_model;
pub(crate) mod allocation_repository;
pub(crate) mod allocation_service;
pub(crate) mod fifo_engine;
pub(crate) mod reversal_service;

pub use allocation_model::{
    AllocationDetail, AllocationDetailDB, FifoOutcome, LotState, PlannedAllocation, RebuildReport,
    ReversalReport, ShortfallEvent,
};
pub use allocation_repository::AllocationRepository;
pub use allocation_service::AllocationService;
pub use fifo_engine::allocate_fifo;
pub use reversal_service::ReversalService;
