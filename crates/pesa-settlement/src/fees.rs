use pesa_core::{Amount, EngineConfig};

/// Default exemption threshold: amounts at or below this pay no fee.
pub const DEFAULT_FEE_EXEMPT_BELOW: u64 = 100;

/// Default platform fee: 50 basis points (0.5%).
pub const DEFAULT_FEE_BPS: u32 = 50;

/// Platform fee policy. Pure and deterministic.
///
/// Integer math truncating toward zero; the one computed value feeds both
/// the fee leg and the settlement record, so the two can never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    exempt_below: u64,
    bps: u32,
}

impl FeePolicy {
    pub fn new(exempt_below: u64, bps: u32) -> Self {
        Self { exempt_below, bps }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.fee_exempt_below, config.fee_bps)
    }

    /// Fee for `amount`, in the same minor units.
    pub fn fee(&self, amount: Amount) -> Amount {
        if amount.value() <= self.exempt_below {
            return Amount::ZERO;
        }
        let fee = amount.value() as u128 * self.bps as u128 / 10_000;
        Amount::new(fee as u64)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_EXEMPT_BELOW, DEFAULT_FEE_BPS)
    }
}
