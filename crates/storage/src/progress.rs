//! Upload progress reporting.

/// Bytes written so far for a single object.
///
/// `total` is `None` when the backend cannot tell how large the body is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub transferred: u64,
    pub total: Option<u64>,
}

/// Callback invoked by [`StorageBackend::put`](crate::StorageBackend::put)
/// as bytes are written.
pub type ProgressFn<'a> = dyn Fn(Progress) + Send + Sync + 'a;

/// A [`ProgressFn`] that discards every report.
pub fn ignore_progress(_: Progress) {}

impl Progress {
    pub fn new(transferred: u64, total: impl Into<Option<u64>>) -> Self {
        Self { transferred, total: total.into() }
    }

    /// Fraction of the body written, in `0.0..=1.0`.
    ///
    /// Unknown or zero totals report nothing rather than dividing by zero.
    pub fn fraction(&self) -> Option<f64> {
        self.total.filter(|total| *total > 0).map(|total| (self.transferred as f64 / total as f64).clamp(0.0, 1.0))
    }

    /// Whole percentage written, rounded half up.
    pub fn percent(&self) -> Option<u8> {
        // Infallible cast: fraction is clamped to 0..=1.
        self.fraction().map(|f| (f * 100.0).round() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(200), Some(0))]
    #[case(1, Some(200), Some(1))]
    #[case(100, Some(200), Some(50))]
    #[case(200, Some(200), Some(100))]
    #[case(2, Some(3), Some(67))]
    #[case(10, Some(0), None)]
    #[case(10, None, None)]
    fn test_percent(#[case] transferred: u64, #[case] total: Option<u64>, #[case] expected: Option<u8>) {
        assert_eq!(Progress::new(transferred, total).percent(), expected);
    }

    #[test]
    fn test_fraction_is_clamped() {
        assert_eq!(Progress::new(500, 100).fraction(), Some(1.0));
    }
}
