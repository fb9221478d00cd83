//! Completion latching shared by all motion commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::MotionStatus;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Completion criteria for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerances {
    /// Number of consecutive in-tolerance cycles required to finish. Zero is treated as one.
    pub settle_cycles: u32,

    /// Number of cycles after which the command gives up, if any.
    pub timeout_cycles: Option<u32>,
}

/// Tracks how long a command has been within tolerance and latches its completion status.
#[derive(Debug, Clone)]
pub struct Settler {
    tol: Tolerances,
    num_cycles: u32,
    num_in_band: u32,
    status: MotionStatus,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Tolerances {
    pub fn new(settle_cycles: u32, timeout_cycles: Option<u32>) -> Self {
        Self {
            settle_cycles,
            timeout_cycles,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::new(1, None)
    }
}

impl Settler {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            num_cycles: 0,
            num_in_band: 0,
            status: MotionStatus::Running,
        }
    }

    /// Record one cycle, `in_band` being true if the error is within tolerance this cycle.
    ///
    /// Once a done status is returned it is latched and all further calls return it unchanged.
    /// Settling takes priority over timing out on the same cycle.
    pub fn check(&mut self, in_band: bool) -> MotionStatus {
        if self.status.is_done() {
            return self.status;
        }

        self.num_cycles += 1;

        if in_band {
            self.num_in_band += 1;
        }
        else {
            self.num_in_band = 0;
        }

        if self.num_in_band >= self.tol.settle_cycles.max(1) {
            self.status = MotionStatus::Finished;
        }
        else if let Some(t) = self.tol.timeout_cycles {
            if self.num_cycles >= t {
                self.status = MotionStatus::TimedOut;
            }
        }

        self.status
    }

    pub fn status(&self) -> MotionStatus {
        self.status
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_settle_requires_consecutive_cycles() {
        let mut s = Settler::new(Tolerances::new(3, None));

        assert_eq!(s.check(true), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Running);
        assert_eq!(s.check(false), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Finished);

        // Latched
        assert_eq!(s.check(false), MotionStatus::Finished);
        assert_eq!(s.num_cycles, 6);
    }

    #[test]
    fn test_zero_settle_cycles() {
        let mut s = Settler::new(Tolerances::new(0, None));
        assert_eq!(s.check(false), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Finished);
    }

    #[test]
    fn test_timeout() {
        let mut s = Settler::new(Tolerances::new(1, Some(3)));
        assert_eq!(s.check(false), MotionStatus::Running);
        assert_eq!(s.check(false), MotionStatus::Running);
        assert_eq!(s.check(false), MotionStatus::TimedOut);
        assert_eq!(s.check(true), MotionStatus::TimedOut);

        // Settling on the final cycle wins
        let mut s = Settler::new(Tolerances::new(1, Some(2)));
        assert_eq!(s.check(false), MotionStatus::Running);
        assert_eq!(s.check(true), MotionStatus::Finished);
    }
}
