use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::cleaner::{clean, CleanSummary};
use crate::db::{init_db, insert_merchants, insert_transactions, reset_raw};
use crate::error::{InsightsError, Result};
use crate::loader::{file_checksum, load_merchants, load_transactions};

/// Owns the engine connection and the two input files, and keeps the cleaned
/// table around between tasks. The cache holds only while both input files
/// keep the same content; any change triggers a full reload and re-clean.
pub struct Job {
    conn: Connection,
    transactions_path: PathBuf,
    merchants_path: PathBuf,
    cached: Option<(String, CleanSummary)>,
}

impl Job {
    pub fn new(conn: Connection, transactions_path: &Path, merchants_path: &Path) -> Result<Self> {
        for path in [transactions_path, merchants_path] {
            if !path.exists() {
                return Err(InsightsError::InputNotFound(path.display().to_string()));
            }
        }
        init_db(&conn)?;
        Ok(Self {
            conn,
            transactions_path: transactions_path.to_path_buf(),
            merchants_path: merchants_path.to_path_buf(),
            cached: None,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn fingerprint(&self) -> Result<String> {
        let t = file_checksum(&self.transactions_path)?;
        let m = file_checksum(&self.merchants_path)?;
        Ok(format!("{t}:{m}"))
    }

    /// Load and clean the inputs unless the cached table is still current.
    pub fn cleaned(&mut self) -> Result<&CleanSummary> {
        let fingerprint = self.fingerprint()?;
        let fresh = matches!(&self.cached, Some((fp, _)) if *fp == fingerprint);
        if fresh {
            debug!("inputs unchanged, reusing cleaned table");
        } else {
            info!(
                transactions = %self.transactions_path.display(),
                merchants = %self.merchants_path.display(),
                "loading and cleaning data"
            );
            let transactions = load_transactions(&self.transactions_path)?;
            let merchants = load_merchants(&self.merchants_path)?;
            reset_raw(&self.conn)?;
            insert_transactions(&self.conn, &transactions)?;
            insert_merchants(&self.conn, &merchants)?;
            let summary = clean(&self.conn)?;
            self.cached = Some((fingerprint, summary));
        }
        let (_, summary) = self
            .cached
            .as_ref()
            .ok_or_else(|| InsightsError::Other("cleaned data unavailable".into()))?;
        Ok(summary)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| InsightsError::Db(e))
    }
}
