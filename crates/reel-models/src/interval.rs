//! Engaging interval selection rules.
//!
//! The recommendation service answers with a bare `"start,end"` pair in
//! seconds. Anything else is a typed parse error that callers turn into
//! [`EngagingInterval::FALLBACK`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest span a highlight may cover (seconds).
pub const MIN_SPAN_SECS: f64 = 3.0;
/// Longest span a highlight may cover (seconds).
pub const MAX_SPAN_SECS: f64 = 15.0;

/// Tolerance for floating point comparisons on span bounds.
const SPAN_EPSILON: f64 = 1e-9;

/// Errors produced while turning a recommendation into an interval.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntervalParseError {
    #[error("expected exactly two comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("field is not a finite number: {0:?}")]
    NotANumber(String),

    #[error("start must be non-negative, got {0}")]
    NegativeStart(f64),

    #[error("end ({end}) must be after start ({start})")]
    EndBeforeStart { start: f64, end: f64 },

    #[error("start ({start}) is beyond the source duration ({source_duration})")]
    StartBeyondSource { start: f64, source_duration: f64 },

    #[error("span of {0:.3}s is outside the allowed 3-15s range")]
    SpanOutOfRange(f64),
}

/// A `[start, end)` span of a source clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngagingInterval {
    pub start: f64,
    pub end: f64,
}

impl EngagingInterval {
    /// Substituted whenever the recommendation is missing or invalid.
    pub const FALLBACK: Self = Self {
        start: 0.0,
        end: 10.0,
    };

    /// Used for the single transcode retry after a failed extraction.
    pub const RETRY: Self = Self {
        start: 0.0,
        end: 3.0,
    };

    /// Create an interval, checking ordering and sign but not span length.
    pub fn new(start: f64, end: f64) -> Result<Self, IntervalParseError> {
        if !start.is_finite() {
            return Err(IntervalParseError::NotANumber(start.to_string()));
        }
        if !end.is_finite() {
            return Err(IntervalParseError::NotANumber(end.to_string()));
        }
        if start < 0.0 {
            return Err(IntervalParseError::NegativeStart(start));
        }
        if end <= start {
            return Err(IntervalParseError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse the recommendation wire format `"start,end"`.
    ///
    /// Only surrounding whitespace is tolerated; prose, units, or extra
    /// fields are rejected.
    pub fn parse(text: &str) -> Result<Self, IntervalParseError> {
        let fields: Vec<&str> = text.trim().split(',').collect();
        if fields.len() != 2 {
            return Err(IntervalParseError::FieldCount(fields.len()));
        }

        let start = parse_seconds(fields[0])?;
        let end = parse_seconds(fields[1])?;
        Self::new(start, end)
    }

    /// Parse, clamp to the source length, and enforce the span bounds.
    pub fn from_recommendation(
        text: &str,
        source_duration: Option<f64>,
    ) -> Result<Self, IntervalParseError> {
        Self::parse(text)?
            .clamp_to_source(source_duration)?
            .ensure_span()
    }

    /// Span length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Pull `end` back to the source duration when it is known.
    pub fn clamp_to_source(self, source_duration: Option<f64>) -> Result<Self, IntervalParseError> {
        match source_duration {
            Some(total) if total.is_finite() && total > 0.0 => {
                if self.start >= total {
                    return Err(IntervalParseError::StartBeyondSource {
                        start: self.start,
                        source_duration: total,
                    });
                }
                Ok(Self {
                    start: self.start,
                    end: self.end.min(total),
                })
            }
            _ => Ok(self),
        }
    }

    /// Reject spans shorter than 3s or longer than 15s.
    pub fn ensure_span(self) -> Result<Self, IntervalParseError> {
        let span = self.duration();
        if span + SPAN_EPSILON < MIN_SPAN_SECS || span - SPAN_EPSILON > MAX_SPAN_SECS {
            return Err(IntervalParseError::SpanOutOfRange(span));
        }
        Ok(self)
    }

    /// Whether the span satisfies the 3-15s bound.
    pub fn is_within_bounds(&self) -> bool {
        self.ensure_span().is_ok()
    }
}

fn parse_seconds(field: &str) -> Result<f64, IntervalParseError> {
    let value: f64 = field
        .trim()
        .parse()
        .map_err(|_| IntervalParseError::NotANumber(field.to_string()))?;
    if !value.is_finite() {
        return Err(IntervalParseError::NotANumber(field.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_pair() {
        let interval = EngagingInterval::parse("12.5,20.0").unwrap();
        assert_eq!(interval.start, 12.5);
        assert_eq!(interval.end, 20.0);
        assert!((interval.duration() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let interval = EngagingInterval::parse("  4, 9.25\n").unwrap();
        assert_eq!(interval, EngagingInterval { start: 4.0, end: 9.25 });
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            EngagingInterval::parse("The best part is 3.0,9.0"),
            Err(IntervalParseError::NotANumber(_))
        ));
        assert_eq!(
            EngagingInterval::parse("1.3"),
            Err(IntervalParseError::FieldCount(1))
        );
        assert_eq!(
            EngagingInterval::parse("1,2,3"),
            Err(IntervalParseError::FieldCount(3))
        );
        assert!(EngagingInterval::parse("").is_err());
        assert!(EngagingInterval::parse("nan,5").is_err());
        assert!(EngagingInterval::parse("0,inf").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_ordering() {
        assert!(matches!(
            EngagingInterval::parse("9,4"),
            Err(IntervalParseError::EndBeforeStart { .. })
        ));
        assert!(matches!(
            EngagingInterval::parse("-1,4"),
            Err(IntervalParseError::NegativeStart(_))
        ));
    }

    #[test]
    fn test_span_bounds_inclusive() {
        assert!(EngagingInterval::new(0.0, 3.0).unwrap().is_within_bounds());
        assert!(EngagingInterval::new(5.0, 20.0).unwrap().is_within_bounds());
        assert!(!EngagingInterval::new(0.0, 2.9).unwrap().is_within_bounds());
        assert!(!EngagingInterval::new(0.0, 15.5).unwrap().is_within_bounds());
    }

    #[test]
    fn test_from_recommendation_clamps_to_source() {
        let interval = EngagingInterval::from_recommendation("10,22", Some(18.0)).unwrap();
        assert_eq!(interval.end, 18.0);

        // Clamping can push the span under the minimum.
        assert!(matches!(
            EngagingInterval::from_recommendation("16,22", Some(18.0)),
            Err(IntervalParseError::SpanOutOfRange(_))
        ));
        assert!(matches!(
            EngagingInterval::from_recommendation("30,35", Some(18.0)),
            Err(IntervalParseError::StartBeyondSource { .. })
        ));
    }

    #[test]
    fn test_from_recommendation_unknown_duration() {
        let interval = EngagingInterval::from_recommendation("40,52", None).unwrap();
        assert_eq!(interval, EngagingInterval { start: 40.0, end: 52.0 });
    }

    #[test]
    fn test_fixed_intervals_are_within_bounds() {
        assert!(EngagingInterval::FALLBACK.is_within_bounds());
        assert!(EngagingInterval::RETRY.is_within_bounds());
        assert_eq!(EngagingInterval::FALLBACK.duration(), 10.0);
        assert_eq!(EngagingInterval::RETRY.duration(), 3.0);
    }
}
