use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Historical values split by z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSplit {
    /// Values within the threshold, input order preserved
    pub kept: Vec<Money>,
    /// Values with |z| >= threshold, input order preserved
    pub outliers: Vec<Money>,
}

/// Partition `values` using the population mean and standard deviation of
/// the whole input. A value is an outlier iff `|(v - mean) / sd| >= threshold`.
///
/// With fewer than two values, or a zero standard deviation, every value is
/// kept and no outliers are reported.
pub fn filter_outliers(values: &[Money], threshold: Decimal) -> OutlierSplit {
    let unchanged = || OutlierSplit {
        kept: values.to_vec(),
        outliers: Vec::new(),
    };

    if values.len() < 2 {
        return unchanged();
    }

    let n = Decimal::from(values.len() as u64);
    let mean = values.iter().sum::<Decimal>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let d = *v - mean;
            d * d
        })
        .sum::<Decimal>()
        / n;

    let std_dev = match variance.sqrt() {
        Some(sd) if !sd.is_zero() => sd,
        _ => return unchanged(),
    };

    let (kept, outliers): (Vec<Money>, Vec<Money>) = values
        .iter()
        .copied()
        .partition(|v| ((*v - mean) / std_dev).abs() < threshold);

    OutlierSplit { kept, outliers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::DEFAULT_OUTLIER_Z_THRESHOLD;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identical_values_kept() {
        let values = vec![dec!(50); 5];
        let split = filter_outliers(&values, DEFAULT_OUTLIER_Z_THRESHOLD);
        assert_eq!(split.kept, values);
        assert!(split.outliers.is_empty());
    }

    #[test]
    fn test_single_value_kept() {
        let split = filter_outliers(&[dec!(7)], DEFAULT_OUTLIER_Z_THRESHOLD);
        assert_eq!(split.kept, vec![dec!(7)]);
        assert!(split.outliers.is_empty());
    }

    #[test]
    fn test_spike_removed() {
        // mean = 190, population sd = 270; z(1000) = 3
        let mut values = vec![dec!(100); 9];
        values.push(dec!(1000));
        let split = filter_outliers(&values, DEFAULT_OUTLIER_Z_THRESHOLD);
        assert_eq!(split.outliers, vec![dec!(1000)]);
        assert_eq!(split.kept.len(), 9);
    }

    #[test]
    fn test_order_preserved_and_losses_allowed() {
        let values = vec![dec!(-10), dec!(5), dec!(20), dec!(-3)];
        let split = filter_outliers(&values, DEFAULT_OUTLIER_Z_THRESHOLD);
        assert_eq!(split.kept, values);
    }

    #[test]
    fn test_tight_threshold_flags_both_ends() {
        // Two points always sit one sd either side of the mean
        let split = filter_outliers(&[dec!(0), dec!(10)], dec!(0.5));
        assert_eq!(split.outliers, vec![dec!(0), dec!(10)]);
        assert!(split.kept.is_empty());
    }

    #[test]
    fn test_z_equal_to_threshold_is_outlier() {
        // mean 5, sd 5: both values sit exactly at |z| = 1
        let split = filter_outliers(&[dec!(0), dec!(10)], dec!(1.0));
        assert!(split.kept.is_empty());
        assert_eq!(split.outliers, vec![dec!(0), dec!(10)]);
    }
}
