//! Testing utilities for arbor.
//!
//! Assertion helpers shared by unit tests and integration tests.
//!
//! ```
//! use arbor::assert_approx_eq;
//! assert_approx_eq!(0.5, 0.50001, 1e-3);
//! ```

/// Default tolerance for floating point comparisons of impurities and gains.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Assert that two f64 values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance, or
/// [`DEFAULT_TOLERANCE`] when omitted.
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, $crate::testing::DEFAULT_TOLERANCE)
    };
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

/// Assert that two f64 slices are approximately equal element-wise.
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left: &[f64] = &$left;
        let right: &[f64] = &$right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (&l, &r)) in left.iter().zip(right.iter()).enumerate() {
            $crate::assert_approx_eq!(l, r, $tolerance, "at index {}", i);
        }
    }};
}
