//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! A dataset is written inside one transaction: either all four tables
//! land or none do.

use crate::{
    dataset::Dataset,
    error::SimResult,
    export::CsvExporter,
    types::{format_date, format_timestamp},
};
use rusqlite::{params, Connection};

/// The four tables of the dataset, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Merchants,
    SubscriptionEvents,
    AppEvents,
    Revenue,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Self::Merchants,
        Self::SubscriptionEvents,
        Self::AppEvents,
        Self::Revenue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Merchants          => "dim_merchants",
            Self::SubscriptionEvents => "fact_subscription_events",
            Self::AppEvents          => "fact_app_events",
            Self::Revenue            => "fact_recovered_sales_daily",
        }
    }

    pub fn has_event_type(&self) -> bool {
        matches!(self, Self::SubscriptionEvents | Self::AppEvents)
    }
}

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the dataset database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Drop and recreate the schema.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_schema.sql"))?;
        Ok(())
    }

    // ── Write ──────────────────────────────────────────────────

    /// Export the flat files, then rebuild the schema and commit the
    /// tables. A failed export leaves the database untouched.
    pub fn publish(&mut self, dataset: &Dataset, exporter: &CsvExporter) -> SimResult<()> {
        exporter.export(dataset)?;
        self.migrate()?;
        self.write_dataset(dataset)
    }

    pub fn write_dataset(&mut self, dataset: &Dataset) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO dim_merchants (
                    merchant_id, install_date, country, acquisition_channel, industry, is_active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for m in &dataset.merchants {
                stmt.execute(params![
                    m.merchant_id,
                    format_date(&m.install_date),
                    m.country,
                    m.acquisition_channel,
                    m.industry,
                    m.is_active,
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_subscription_events (
                    event_id, merchant_id, event_timestamp, event_type, monthly_price, plan_code_raw
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for s in &dataset.subscription_events {
                stmt.execute(params![
                    s.event_id as i64,
                    s.merchant_id,
                    format_timestamp(&s.event_timestamp),
                    s.event_type,
                    s.monthly_price,
                    s.plan_code_raw,
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_app_events (
                    event_id, merchant_id, event_timestamp, event_type, metadata
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for a in &dataset.app_events {
                stmt.execute(params![
                    a.event_id as i64,
                    a.merchant_id,
                    format_timestamp(&a.event_timestamp),
                    a.event_type,
                    a.metadata,
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_recovered_sales_daily (
                    id, merchant_id, event_date, recovered_sales_nzd
                ) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for r in &dataset.revenue {
                stmt.execute(params![
                    r.id as i64,
                    r.merchant_id,
                    format_date(&r.event_date),
                    r.recovered_sales_nzd,
                ])?;
            }
        }
        tx.commit()?;

        log::info!(
            "store: wrote {} merchants, {} subscription events, {} app events, {} revenue rows",
            dataset.merchants.len(),
            dataset.subscription_events.len(),
            dataset.app_events.len(),
            dataset.revenue.len(),
        );
        Ok(())
    }

    // ── Read-only checks ───────────────────────────────────────

    pub fn row_count(&self, table: Table) -> SimResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Event types folded to lower case, most frequent first.
    /// Empty for tables without an event_type column.
    pub fn event_type_counts(&self, table: Table) -> SimResult<Vec<(String, i64)>> {
        if !table.has_event_type() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT lower(event_type) AS event_type, COUNT(*) AS n
             FROM {}
             GROUP BY 1
             ORDER BY n DESC, event_type ASC",
            table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    pub fn churned_merchant_count(&self) -> SimResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(DISTINCT merchant_id)
             FROM fact_subscription_events
             WHERE event_type = 'cancel'",
            [],
            |row| row.get(0),
        )?)
    }

    /// App-event and revenue rows dated at or after their merchant's cancel.
    /// Zero for any dataset this crate generates.
    pub fn rows_after_cancel(&self) -> SimResult<i64> {
        Ok(self.conn.query_row(
            "WITH cancels AS (
                SELECT merchant_id, event_timestamp AS cancel_ts
                FROM fact_subscription_events
                WHERE event_type = 'cancel'
             )
             SELECT
                (SELECT COUNT(*) FROM fact_app_events a
                 JOIN cancels c ON c.merchant_id = a.merchant_id
                 WHERE a.event_timestamp >= c.cancel_ts)
              + (SELECT COUNT(*) FROM fact_recovered_sales_daily r
                 JOIN cancels c ON c.merchant_id = r.merchant_id
                 WHERE r.event_date >= date(c.cancel_ts))",
            [],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backed_store_runs_in_wal_mode() {
        let path = std::env::temp_dir().join(format!("stockradar-wal-{}.db", std::process::id()));
        let store = SimStore::open(path.to_str().unwrap()).expect("open store");
        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        drop(store);
        for suffix in ["", "-wal", "-shm"] {
            std::fs::remove_file(format!("{}{suffix}", path.display())).ok();
        }
    }
}
