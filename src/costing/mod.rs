pub(crate) mod allocator;
pub(crate) mod costing_model;
pub(crate) mod costing_repository;
pub(crate) mod costing_service;

pub use allocator::allocate_costs;
pub use costing_model::{InventoryRow, LotCost, LotCostDB};
pub use costing_repository::CostingRepository;
pub use costing_service::CostingService;
