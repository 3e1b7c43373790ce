//! Profit model.
//!
//! Pure integer arithmetic over smallest-unit amounts. The slippage buffer
//! deliberately overstates the required repayment, a single-sided safety
//! margin absorbing price movement between quote time and execution time.
//!
//!   requiredRepay    = A + floor(A * premium / 10000)
//!   bufferedRequired = floor(requiredRepay * (10000 + buffer) / 10000)
//!   netProfit        = max(0, O - bufferedRequired)

use crate::types::Token;
use ethers::types::U256;

const BPS_DENOMINATOR: u64 = 10_000;

/// Loan principal plus the flash-loan premium.
pub fn required_repay(amount_in: U256, premium_bps: u32) -> U256 {
    amount_in + amount_in * U256::from(premium_bps) / U256::from(BPS_DENOMINATOR)
}

/// Required repayment inflated by the slippage buffer.
pub fn buffered_required(required_repay: U256, slippage_buffer_bps: u32) -> U256 {
    required_repay * U256::from(BPS_DENOMINATOR + slippage_buffer_bps as u64)
        / U256::from(BPS_DENOMINATOR)
}

/// Net profit in output-token units; zero when the trade does not cover
/// the buffered repayment.
pub fn net_profit(amount_out: U256, buffered_required: U256) -> U256 {
    amount_out.saturating_sub(buffered_required)
}

/// Net profit in the reference currency. `None` when the output token has
/// no configured reference price.
pub fn profit_usd(net_profit: U256, output_token: &Token) -> Option<f64> {
    output_token.amount_to_usd(net_profit)
}
