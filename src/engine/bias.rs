//! # engine::bias
//!
//! PCR → direction, then two indices → one market bias.

use crate::config::{PCR_LOWER, PCR_UPPER};
use crate::engine::processor::ProcessedResult;
use crate::models::Bias;

pub const REASON_NEUTRAL: &str = "Neutral PCR";
pub const REASON_DIVERGENCE: &str = "Index divergence";
pub const REASON_ALIGNED: &str = "Market aligned";

/// Bullish above [`PCR_UPPER`], bearish below [`PCR_LOWER`], neutral
/// (`None`) in between, boundaries included.
pub fn pcr_bias(ratio: f64) -> Option<Bias> {
    if ratio > PCR_UPPER {
        Some(Bias::Bullish)
    } else if ratio < PCR_LOWER {
        Some(Bias::Bearish)
    } else {
        None
    }
}

/// Combine the per-index biases.  Priority: any neutral side, then
/// disagreement, then agreement.
///
/// A missing result (NO_DATA) has no bias.
pub fn combined_bias(
    a: Option<&ProcessedResult>,
    b: Option<&ProcessedResult>,
) -> (Option<Bias>, &'static str) {
    combine(a.and_then(ProcessedResult::bias), b.and_then(ProcessedResult::bias))
}

/// [`combined_bias`] on already-classified sides.
pub fn combine(a: Option<Bias>, b: Option<Bias>) -> (Option<Bias>, &'static str) {
    match (a, b) {
        (Some(a), Some(b)) if a == b => (Some(a), REASON_ALIGNED),
        (Some(_), Some(_)) => (None, REASON_DIVERGENCE),
        _ => (None, REASON_NEUTRAL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::AcquisitionMode;

    fn result(pcr: f64) -> ProcessedResult {
        ProcessedResult {
            instrument: "TEST".into(),
            spot:       48205.0,
            atm:        48200,
            rows:       Vec::new(),
            pcr,
            call_delta: 0,
            put_delta:  0,
            mode:       AcquisitionMode::Live,
        }
    }

    #[test]
    fn test_pcr_thresholds() {
        assert_eq!(pcr_bias(1.25), Some(Bias::Bullish));
        assert_eq!(pcr_bias(1.11), Some(Bias::Bullish));
        assert_eq!(pcr_bias(0.89), Some(Bias::Bearish));
        assert_eq!(pcr_bias(0.0), Some(Bias::Bearish));
        assert_eq!(pcr_bias(1.0), None);
    }

    #[test]
    fn test_pcr_boundaries_are_neutral() {
        assert_eq!(pcr_bias(1.10), None);
        assert_eq!(pcr_bias(0.90), None);
    }

    #[test]
    fn test_aligned() {
        assert_eq!(combine(Some(Bias::Bullish), Some(Bias::Bullish)), (Some(Bias::Bullish), REASON_ALIGNED));
        assert_eq!(combine(Some(Bias::Bearish), Some(Bias::Bearish)), (Some(Bias::Bearish), REASON_ALIGNED));
    }

    #[test]
    fn test_divergence_both_orders() {
        assert_eq!(combine(Some(Bias::Bullish), Some(Bias::Bearish)), (None, REASON_DIVERGENCE));
        assert_eq!(combine(Some(Bias::Bearish), Some(Bias::Bullish)), (None, REASON_DIVERGENCE));
    }

    #[test]
    fn test_neutral_beats_divergence_both_orders() {
        assert_eq!(combine(None, Some(Bias::Bearish)), (None, REASON_NEUTRAL));
        assert_eq!(combine(Some(Bias::Bullish), None), (None, REASON_NEUTRAL));
        assert_eq!(combine(None, None), (None, REASON_NEUTRAL));
    }

    #[test]
    fn test_combined_from_results() {
        let (bull, bear, flat) = (result(1.25), result(0.75), result(1.0));

        assert_eq!(combined_bias(Some(&bull), Some(&bull)), (Some(Bias::Bullish), REASON_ALIGNED));
        assert_eq!(combined_bias(Some(&bull), Some(&bear)), (None, REASON_DIVERGENCE));
        assert_eq!(combined_bias(Some(&flat), Some(&bear)), (None, REASON_NEUTRAL));
        assert_eq!(combined_bias(Some(&bear), Some(&flat)), (None, REASON_NEUTRAL));
    }

    #[test]
    fn test_missing_result_is_neutral() {
        let bear = result(0.75);
        assert_eq!(combined_bias(None, Some(&bear)), (None, REASON_NEUTRAL));
        assert_eq!(combined_bias(Some(&bear), None), (None, REASON_NEUTRAL));
    }
}
