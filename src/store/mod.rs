//! Append-only CSV log store for signals, trade outcomes and bot health.
//!
//! Each stream is one file under the store directory. Headers are written
//! when a file is created, rows are only ever appended.

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::SignalResult;
use crate::models::{Direction, Timeframe, TrendLabel};
use crate::strategies::Signal;
use crate::trading::TradeOutcome;

const SIGNALS_FILE: &str = "signals.csv";
const TRADES_FILE: &str = "trades.csv";
const HEALTH_FILE: &str = "health.csv";

/// Delivery state of a logged signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Sent,
    NotifyFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub score: u8,
    pub entry: Option<f64>,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub rr_ratio: Option<f64>,
    pub status: SignalStatus,
    pub trend: TrendLabel,
}

impl SignalRecord {
    pub fn from_signal(signal: &Signal, status: SignalStatus) -> SignalRecord {
        SignalRecord {
            timestamp: signal.evaluated_at,
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe,
            direction: signal.direction,
            score: signal.strength,
            entry: signal.entry,
            sl: signal.stop_loss,
            tp: signal.take_profit,
            rr_ratio: signal.risk_reward,
            status,
            trend: signal.trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub notes: String,
}

impl HealthRecord {
    pub fn new(status: &str, notes: impl Into<String>) -> HealthRecord {
        HealthRecord {
            timestamp: Utc::now(),
            status: status.to_string(),
            notes: notes.into(),
        }
    }
}

pub struct CsvLogStore {
    dir: PathBuf,
}

impl CsvLogStore {
    /// Creates the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> SignalResult<CsvLogStore> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(CsvLogStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn append_signal(&self, record: &SignalRecord) -> SignalResult<()> {
        append_row(&self.dir.join(SIGNALS_FILE), record)
    }

    pub fn append_trade(&self, record: &TradeOutcome) -> SignalResult<()> {
        append_row(&self.dir.join(TRADES_FILE), record)
    }

    pub fn append_health(&self, record: &HealthRecord) -> SignalResult<()> {
        append_row(&self.dir.join(HEALTH_FILE), record)
    }

    pub fn read_signals(&self) -> SignalResult<Vec<SignalRecord>> {
        read_rows(&self.dir.join(SIGNALS_FILE))
    }

    pub fn read_trades(&self) -> SignalResult<Vec<TradeOutcome>> {
        read_rows(&self.dir.join(TRADES_FILE))
    }

    pub fn latest_health(&self) -> SignalResult<Option<HealthRecord>> {
        let rows: Vec<HealthRecord> = read_rows(&self.dir.join(HEALTH_FILE))?;
        Ok(rows.into_iter().last())
    }

    pub fn signals_since(&self, cutoff: DateTime<Utc>) -> SignalResult<Vec<SignalRecord>> {
        Ok(self
            .read_signals()?
            .into_iter()
            .filter(|r| r.timestamp >= cutoff)
            .collect())
    }

    /// Writes the signals at or after `cutoff` to a fresh CSV at `path`.
    /// Returns the number of rows exported; with none, `path` is untouched.
    pub fn export_signals_since(
        &self,
        cutoff: DateTime<Utc>,
        path: &Path,
    ) -> SignalResult<usize> {
        let rows = self.signals_since(cutoff)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(rows.len())
    }
}

fn append_row<T: Serialize>(path: &Path, record: &T) -> SignalResult<()> {
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = WriterBuilder::new().has_headers(is_new).from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

/// A missing file reads as empty.
fn read_rows<T: DeserializeOwned>(path: &Path) -> SignalResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        out.push(row?);
    }
    Ok(out)
}

/// Number of logged signals pointing in `direction`.
pub fn count_direction(rows: &[SignalRecord], direction: Direction) -> usize {
    rows.iter().filter(|r| r.direction == direction).count()
}
