//! Consecutive-tick debounce counter.
//!
//! Every fault and stage-advance condition in the process goes through one
//! of these.  The counter grows while the condition holds and drops to zero
//! on the first evaluation where it does not; the decision is "tripped"
//! once the condition has held for `threshold + 1` consecutive evaluations.
//!
//! ```text
//! threshold = 2
//! condition : T  T  T  T  F  T
//! count     : 1  2  3  4  0  1
//! tripped   : -  -  x  x  -  -
//! ```

/// Debounced boolean condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    count: u16,
    threshold: u16,
}

impl Debounce {
    pub const fn new(threshold: u16) -> Self {
        Self {
            count: 0,
            threshold,
        }
    }

    /// Feed one evaluation of the condition.  Returns `true` while tripped.
    pub fn update(&mut self, condition: bool) -> bool {
        if condition {
            self.count = self.count.saturating_add(1);
            self.count > self.threshold
        } else {
            self.count = 0;
            false
        }
    }

    /// Forget any partial run.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// `true` if the last evaluation tripped.
    pub fn is_tripped(&self) -> bool {
        self.count > self.threshold
    }
}
