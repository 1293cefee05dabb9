//! Series resolution port trait.

use crate::domain::bar_table::BarTable;
use crate::domain::series::TradingSeries;

/// Resolves a trading series to numeric values aligned to `table`.
///
/// The result must hold exactly one value per bar of `table`; bars with no
/// data are `NaN`.
pub trait SeriesProvider {
    fn resolve(&self, series: &TradingSeries, table: &BarTable) -> Vec<f64>;
}
