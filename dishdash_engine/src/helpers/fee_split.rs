use dd_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::FeeSplit;

/// The flat platform fee, in minor units (3.00).
pub const DEFAULT_ADMIN_FEE: i64 = 300;
/// The gateway's cut, in basis points (2%).
pub const DEFAULT_GATEWAY_FEE_BPS: u32 = 200;

/// Parameters for dividing a captured payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub admin_fee: Money,
    pub gateway_fee_bps: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self { admin_fee: Money::from(DEFAULT_ADMIN_FEE), gateway_fee_bps: DEFAULT_GATEWAY_FEE_BPS }
    }
}

impl FeeSchedule {
    pub fn new(admin_fee: Money, gateway_fee_bps: u32) -> Self {
        Self { admin_fee, gateway_fee_bps }
    }

    /// `gateway_fee` is `total × bps`, rounded half-up to the minor unit. The vendor receives the total less the admin
    /// fee; the gateway fee is reported but is not deducted from the vendor share. Totals below the admin fee give a
    /// negative vendor share, so payment intents are never created for them.
    pub fn split(&self, total: Money) -> FeeSplit {
        let gateway_fee = total.basis_points(self.gateway_fee_bps);
        FeeSplit { total, vendor_amount: total - self.admin_fee, admin_fee: self.admin_fee, gateway_fee }
    }
}
