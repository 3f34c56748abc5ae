use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;

use crate::catalog::catalog_model::*;
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::{categories, products, sku_maps};

/// Repository for catalog master data
pub struct CatalogRepository {
    pool: Arc<DbPool>,
}

impl CatalogRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn get_products(&self) -> Result<Vec<Product>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = products::table
            .order(products::internal_sku.asc())
            .load::<ProductDB>(&mut conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub fn get_product(&self, sku: &str) -> Result<Option<Product>> {
        let mut conn = get_connection(&self.pool)?;

        products::table
            .find(sku)
            .first::<ProductDB>(&mut conn)
            .optional()
            .map(|opt| opt.map(Product::from))
            .map_err(Error::from)
    }

    /// Upserts products and registers any categories they reference.
    pub fn upsert_products(&self, inputs: Vec<ProductInput>) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().naive_utc();

        conn.transaction::<usize, Error, _>(|conn| {
            let mut count = 0;
            for input in inputs {
                if let Some(ref cat) = input.category {
                    ensure_category(conn, cat)?;
                }
                let db: ProductDB = input.into_db(now);
                diesel::insert_into(products::table)
                    .values(&db)
                    .on_conflict(products::internal_sku)
                    .do_update()
                    .set((
                        products::category.eq(db.category.clone()),
                        products::cbm_per_unit.eq(db.cbm_per_unit.clone()),
                        products::updated_at.eq(db.updated_at),
                    ))
                    .execute(conn)?;
                count += 1;
            }
            Ok(count)
        })
    }

    pub fn upsert_sku_mappings(&self, inputs: Vec<SkuMappingInput>) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().naive_utc();

        conn.transaction::<usize, Error, _>(|conn| {
            let mut count = 0;
            for input in inputs {
                let db: SkuMapDB = input.into_db(now);
                diesel::insert_into(sku_maps::table)
                    .values(&db)
                    .on_conflict((
                        sku_maps::marketplace,
                        sku_maps::amazon_sku,
                        sku_maps::internal_sku,
                    ))
                    .do_update()
                    .set((
                        sku_maps::unit_multiplier.eq(db.unit_multiplier.clone()),
                        sku_maps::is_active.eq(db.is_active),
                        sku_maps::updated_at.eq(db.updated_at),
                    ))
                    .execute(conn)?;
                count += 1;
            }
            Ok(count)
        })
    }

    /// All active mappings, ordered for deterministic kit expansion.
    pub fn get_active_mappings(&self, marketplace: Option<&str>) -> Result<Vec<SkuMapping>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = sku_maps::table
            .filter(sku_maps::is_active.eq(true))
            .into_boxed();

        if let Some(mp) = marketplace {
            query = query.filter(sku_maps::marketplace.eq(mp));
        }

        let rows = query
            .order((
                sku_maps::marketplace.asc(),
                sku_maps::amazon_sku.asc(),
                sku_maps::internal_sku.asc(),
            ))
            .load::<SkuMapDB>(&mut conn)?;

        Ok(rows.into_iter().map(SkuMapping::from).collect())
    }
}

fn ensure_category(
    conn: &mut crate::db::DbConnection,
    cat: &str,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::insert_into(categories::table)
        .values((
            categories::name.eq(cat),
            categories::created_at.eq(Utc::now().naive_utc()),
        ))
        .on_conflict(categories::name)
        .do_nothing()
        .execute(conn)?;
    Ok(())
}
