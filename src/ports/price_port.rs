//! Price history access port trait.

use crate::domain::candle::{Candle, Granularity};
use crate::domain::error::FxSignalError;

/// Candle history provider. Implementations return candles sorted ascending
/// by timestamp with no duplicates; gaps are tolerated, not filled.
pub trait PricePort {
    /// The most recent `count` candles for a pair at a granularity.
    fn get_history(
        &self,
        pair: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>, FxSignalError>;

    fn list_pairs(&self) -> Result<Vec<String>, FxSignalError>;
}
