pub mod dcf;
pub mod growth;
pub mod outliers;
pub mod projection;
pub mod terminal;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// |z| at or above which a historical value is treated as an outlier.
pub const DEFAULT_OUTLIER_Z_THRESHOLD: Decimal = dec!(2.0);

/// Terminal growth assumed by the sensitivity grid when the base case
/// values the tail with an exit multiple.
pub const DEFAULT_SENSITIVITY_TERMINAL_GROWTH: Decimal = dec!(0.03);
