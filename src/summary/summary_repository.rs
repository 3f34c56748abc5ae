use std::sync::Arc;

use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::month_summaries;
use crate::summary::summary_model::{MonthSummary, MonthSummaryDB};

/// Repository for month summaries
pub struct SummaryRepository {
    pool: Arc<DbPool>,
}

impl SummaryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Replaces all summary rows of one month in a single transaction.
    pub fn replace_month(&self, ym: &str, rows: Vec<MonthSummary>) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;

        conn.transaction::<usize, Error, _>(|conn| {
            diesel::delete(month_summaries::table.filter(month_summaries::ym.eq(ym)))
                .execute(conn)?;

            let db_rows: Vec<MonthSummaryDB> =
                rows.into_iter().map(MonthSummary::into_db).collect();
            let count = db_rows.len();
            diesel::insert_into(month_summaries::table)
                .values(&db_rows)
                .execute(conn)?;

            Ok(count)
        })
    }

    pub fn get_for_month(&self, ym: &str) -> Result<Vec<MonthSummary>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = month_summaries::table
            .filter(month_summaries::ym.eq(ym))
            .order(month_summaries::marketplace.asc())
            .load::<MonthSummaryDB>(&mut conn)?;

        Ok(rows.into_iter().map(MonthSummary::from).collect())
    }

    /// Latest summary rows, most recently updated first.
    pub fn recent(&self, limit: i64) -> Result<Vec<MonthSummary>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = month_summaries::table
            .order(month_summaries::updated_at.desc())
            .limit(limit)
            .load::<MonthSummaryDB>(&mut conn)?;

        Ok(rows.into_iter().map(MonthSummary::from).collect())
    }
}
