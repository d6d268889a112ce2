use crate::model::AnalysisResult;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to encode analysis: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// A previously persisted analysis, newest first when listed.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: i64,
    pub product_name: String,
    pub catalog_id: i64,
    pub analysis_date: DateTime<Utc>,
    pub avg_price: Decimal,
    pub result: AnalysisResult,
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database and creates the history table if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS market_analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL,
                catalog_id INTEGER NOT NULL,
                analysis_date TEXT NOT NULL,
                sales_volume INTEGER NOT NULL,
                avg_price TEXT NOT NULL,
                analysis_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_market_analyses_product
                ON market_analyses (product_name, analysis_date);
            ",
        )?;

        Ok(Self { conn })
    }

    /// Appends one analysis to the history.
    pub fn save_analysis(&self, product_name: &str, result: &AnalysisResult) -> Result<i64, StorageError> {
        let payload = serde_json::to_string(result)?;
        self.conn.execute(
            "INSERT INTO market_analyses (
                product_name, catalog_id, analysis_date, sales_volume, avg_price, analysis_data
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product_name,
                result.catalog_info.id,
                result.analysis_date.to_rfc3339(),
                result.sales_volume as i64,
                result.avg_price.to_string(),
                payload,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Latest `limit` analyses for a product, newest first.
    pub fn get_historical_analyses(
        &self,
        product_name: &str,
        limit: usize,
    ) -> Result<Vec<StoredAnalysis>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_name, catalog_id, analysis_date, avg_price, analysis_data
             FROM market_analyses
             WHERE product_name = ?1
             ORDER BY analysis_date DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![product_name, limit as i64], Self::map_row)?;
        let mut analyses = Vec::new();
        for row in rows {
            let (id, product_name, catalog_id, date, avg, data) = row?;
            analyses.push(StoredAnalysis {
                id,
                product_name,
                catalog_id,
                analysis_date: date
                    .parse()
                    .map_err(|e| StorageError::Corrupt(format!("analysis {id} date: {e}")))?,
                avg_price: Decimal::from_str(&avg)
                    .map_err(|e| StorageError::Corrupt(format!("analysis {id} avg_price: {e}")))?,
                result: serde_json::from_str(&data)?,
            });
        }

        Ok(analyses)
    }

    #[allow(clippy::type_complexity)]
    fn map_row(row: &Row) -> Result<(i64, String, i64, String, String, String), rusqlite::Error> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }
}
