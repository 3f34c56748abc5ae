use std::sync::Arc;

use log::info;

use crate::db::DbPool;
use crate::errors::Result;
use crate::inbound::inbound_model::*;
use crate::inbound::InboundRepository;

/// Service for the inbound ledger.
///
/// Import only writes the ledger tables; recomputing `lot_cost` is the cost
/// service's job and is orchestrated by the command surface.
pub struct InboundService {
    repo: InboundRepository,
}

impl InboundService {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            repo: InboundRepository::new(pool),
        }
    }

    pub fn import_inbound(&self, import: InboundImport) -> Result<ImportCounts> {
        import.validate()?;

        let counts = self.repo.upsert_import(import)?;
        info!(
            "Imported inbound batch: {} items, {} duty pools",
            counts.items, counts.duty_pools
        );
        Ok(counts)
    }

    pub fn get_batches(&self) -> Result<Vec<Batch>> {
        self.repo.get_batches()
    }

    pub fn get_items(&self) -> Result<Vec<InboundItem>> {
        self.repo.get_items()
    }

    pub fn get_items_for_batch(&self, batch_id: &str) -> Result<Vec<InboundItem>> {
        self.repo.get_items_for_batch(batch_id)
    }

    pub fn get_duty_pools(&self) -> Result<Vec<DutyPool>> {
        self.repo.get_duty_pools()
    }
}
