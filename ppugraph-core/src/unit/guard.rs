//! Traversal Guard
//!
//! A unit can be reached through several parents, but an update-like pass
//! must run its subtree exactly once. The guard is a one-bit state machine
//! with an alternating target:
//!
//! - `enter` lets the caller through iff `flag == target`, then sets
//!   `flag = !target`. Any later entry in the same pass is refused.
//! - Between passes the owner calls `rearm` with the next pass target.
//!   Units visited last pass already hold `flag == !old_target`, which is
//!   the new target. Units that were not reached are realigned so they are
//!   not locked out.
//!
//! No pass counter is stored anywhere; the target itself alternates.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalGuard {
    flag: bool,
    target: bool,
}

impl TraversalGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to pass the guard. Returns false if already passed this pass.
    pub fn enter(&mut self) -> bool {
        if self.flag == self.target {
            self.flag = !self.target;
            true
        } else {
            false
        }
    }

    /// Prepare for a pass whose target is `target`.
    pub fn rearm(&mut self, target: bool) {
        if self.flag == self.target {
            // not reached during the previous pass
            self.flag = target;
        }
        self.target = target;
    }

    /// Whether the guard was passed since the last `rearm`.
    pub fn visited(&self) -> bool {
        self.flag != self.target
    }

    pub fn flag(&self) -> bool {
        self.flag
    }

    pub fn target(&self) -> bool {
        self.target
    }
}
