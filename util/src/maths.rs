//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle in degrees into the canonical range `[-180, 180)`.
///
/// Non-finite inputs are returned unchanged, it is up to the caller to reject
/// them.
pub fn wrap_deg<T>(angle_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let full_turn = T::from(360.0).unwrap();

    if !angle_deg.is_finite() {
        return angle_deg;
    }

    let mut wrapped = rem_euclid(angle_deg + half_turn, full_turn) - half_turn;

    // rem_euclid can round up to exactly `rhs` for tiny negative inputs
    if wrapped >= half_turn {
        wrapped = wrapped - full_turn;
    }

    wrapped
}

/// Get the shortest signed angular error (in degrees) to turn from `current`
/// to `target`.
///
/// The result lies in `(-180, 180]`, positive meaning a counter-clockwise turn
/// is the shorter way round. An error of exactly half a turn is reported as
/// `+180`.
pub fn ang_err_deg<T>(target_deg: T, current_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();

    let err = wrap_deg(target_deg - current_deg);

    if err == -half_turn {
        half_turn
    }
    else {
        err
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
