//! Flat-file export: one comma-delimited file per table, header row first.
//!
//! Rows are serialized from the same structs the store writes, so the text
//! encodings (timestamps, dates, floats, empty metadata) match the database.

use crate::{
    dataset::{Dataset, TableRow},
    error::SimResult,
    store::Table,
};
use std::{fs, io::Write, path::PathBuf};

pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.csv", table.name()))
    }

    pub fn export(&self, dataset: &Dataset) -> SimResult<()> {
        fs::create_dir_all(&self.dir)?;
        for table in Table::ALL {
            let path = self.path_for(table);
            let file = fs::File::create(&path)?;
            write_table(file, table, dataset)?;
            log::debug!("export: wrote {}", path.display());
        }
        log::info!("export: {} tables written to {}", Table::ALL.len(), self.dir.display());
        Ok(())
    }
}

/// Serialize one table of `dataset` into `writer`.
pub fn write_table<W: Write>(writer: W, table: Table, dataset: &Dataset) -> SimResult<()> {
    match table {
        Table::Merchants          => write_rows(writer, &dataset.merchants),
        Table::SubscriptionEvents => write_rows(writer, &dataset.subscription_events),
        Table::AppEvents          => write_rows(writer, &dataset.app_events),
        Table::Revenue            => write_rows(writer, &dataset.revenue),
    }
}

/// Header row, then one record per row. The header is written even when
/// there are no rows.
pub fn write_rows<W: Write, T: TableRow>(writer: W, rows: &[T]) -> SimResult<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(T::COLUMNS)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}
