// =============================================================================
// Position Tracker — unrealized PnL for a manually entered long position
// =============================================================================
//
//   unrealized_pnl = (current_price - entry_price) * quantity
//   roi_percent    = unrealized_pnl / (entry_price * quantity) * 100
//
// The tracker is independent of the signal engine: it only needs the latest
// close from the price series.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Sign of the unrealized result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PnlOutcome {
    Profit,
    Loss,
    BreakEven,
}

impl std::fmt::Display for PnlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profit => write!(f, "Profit"),
            Self::Loss => write!(f, "Loss"),
            Self::BreakEven => write!(f, "Break-even"),
        }
    }
}

/// Performance of a position marked to the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlReport {
    pub entry_price: f64,
    pub current_price: f64,
    pub quantity: u32,
    pub unrealized_pnl: f64,
    pub roi_percent: f64,
    /// Price at which the position neither gains nor loses (no fees modelled).
    pub break_even_price: f64,
    pub outcome: PnlOutcome,
}

/// Check the user-entered half of a position before any price is known.
pub fn validate_position(entry_price: f64, quantity: u32) -> Result<(), ValidationError> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(ValidationError::NonPositiveEntryPrice(entry_price));
    }
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    Ok(())
}

/// Compute unrealized PnL and ROI.
///
/// # Errors
/// - `entry_price` not finite or `<= 0`
/// - `quantity == 0`
/// - `current_price` not finite
pub fn compute_pnl(
    entry_price: f64,
    quantity: u32,
    current_price: f64,
) -> Result<PnlReport, ValidationError> {
    validate_position(entry_price, quantity)?;
    if !current_price.is_finite() {
        return Err(ValidationError::InvalidPrice(current_price));
    }

    let qty = f64::from(quantity);
    let unrealized_pnl = (current_price - entry_price) * qty;
    let roi_percent = unrealized_pnl / (entry_price * qty) * 100.0;

    let outcome = if unrealized_pnl > 0.0 {
        PnlOutcome::Profit
    } else if unrealized_pnl < 0.0 {
        PnlOutcome::Loss
    } else {
        PnlOutcome::BreakEven
    };

    Ok(PnlReport {
        entry_price,
        current_price,
        quantity,
        unrealized_pnl,
        roi_percent,
        break_even_price: entry_price,
        outcome,
    })
}
