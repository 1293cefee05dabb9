//! CSV file data adapter.
//!
//! Bars are read from `<base>/<TICKER>.csv` with the header
//! `date,open,high,low,close,volume`. The signal table is written back with
//! the bar columns followed by `buy,sell,buy_signals,sell_signals,long,short`.

use crate::domain::bar_table::BarTable;
use crate::domain::error::StratsafeError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::reconcile::TradeLabel;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SIGNAL_HEADER: [&str; 12] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "buy",
    "sell",
    "buy_signals",
    "sell_signals",
    "long",
    "short",
];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    pub fn write_signals(path: &Path, table: &BarTable) -> Result<(), StratsafeError> {
        let data_err = |e: csv::Error| StratsafeError::Data {
            reason: format!("failed to write {}: {}", path.display(), e),
        };
        let mut wtr = csv::Writer::from_path(path).map_err(data_err)?;
        wtr.write_record(SIGNAL_HEADER).map_err(data_err)?;

        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let label = |v: Option<&Option<TradeLabel>>| {
            v.copied().flatten().map(|l| l.to_string()).unwrap_or_default()
        };
        for (i, bar) in table.bars.iter().enumerate() {
            wtr.write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                table.buy.get(i).copied().unwrap_or(false).to_string(),
                table.sell.get(i).copied().unwrap_or(false).to_string(),
                table.buy_signals.get(i).map(text).unwrap_or_default(),
                table.sell_signals.get(i).map(text).unwrap_or_default(),
                label(table.long.get(i)),
                label(table.short.get(i)),
            ])
            .map_err(data_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn field<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, StratsafeError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| StratsafeError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| StratsafeError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StratsafeError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| StratsafeError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| StratsafeError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| StratsafeError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                StratsafeError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                date,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        log::debug!("loaded {} bars for {} from {}", bars.len(), ticker, path.display());
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsafeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratsafeError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
