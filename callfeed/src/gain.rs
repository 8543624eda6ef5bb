//! Gain and multiplier metrics over normalised market caps.
//!
//! Every function is total: absent, non-finite or non-positive inputs yield `None`, never a
//! panic, an infinity or `NaN`.

/// Multipliers below this are not surfaced.
pub const MIN_SURFACED_MULTIPLIER: f64 = 2.0;

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `(current - baseline) / baseline × 100`, defined only for `baseline > 0`.
pub fn percent_change(current: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    let baseline = positive(baseline)?;
    let current = current.filter(|current| current.is_finite())?;
    finite((current - baseline) / baseline * 100.0)
}

/// `ath / initial` when both are positive and the ratio is at least 2.
pub fn ath_multiplier(initial: Option<f64>, ath: Option<f64>) -> Option<f64> {
    let (initial, ath) = (positive(initial)?, positive(ath)?);
    finite(ath / initial).filter(|multiplier| *multiplier >= MIN_SURFACED_MULTIPLIER)
}

/// `(ath - initial) / initial × 100` when both are positive.
pub fn ath_gain_percent(initial: Option<f64>, ath: Option<f64>) -> Option<f64> {
    let (initial, ath) = (positive(initial)?, positive(ath)?);
    finite((ath - initial) / initial * 100.0)
}

/// Change of the current market cap relative to the initial call market cap.
pub fn current_gain_percent(initial: Option<f64>, market_cap: Option<f64>) -> Option<f64> {
    positive(market_cap)?;
    percent_change(market_cap, initial)
}

/// How far the all-time high sits above the current market cap, `(ath / current - 1) × 100`.
pub fn ath_distance_percent(current: Option<f64>, ath: Option<f64>) -> Option<f64> {
    let (current, ath) = (positive(current)?, positive(ath)?);
    finite((ath / current - 1.0) * 100.0)
}

/// Whole "x-multiple" badge for a gain of at least 100%: `floor(gain / 100) + 1`.
///
/// A +200% gain is a 3x.
pub fn x_multiple_badge(gain: Option<f64>) -> Option<u32> {
    let gain = gain.filter(|gain| gain.is_finite() && *gain >= 100.0)?;
    let multiple = (gain / 100.0).floor() + 1.0;
    (multiple <= f64::from(u32::MAX)).then_some(multiple as u32)
}
