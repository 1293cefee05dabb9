//! Data access port trait.

use crate::domain::error::StratsafeError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `ticker` with `start_date <= date <= end_date`, in date order.
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StratsafeError>;

    fn list_tickers(&self) -> Result<Vec<String>, StratsafeError>;
}
