//! Progressive delay expansion.
//!
//! An expectation carrying a [`ProgressivePolicy`] is expanded into a chain
//! of clones with escalating response delays: the original answers first at
//! the base delay, then each clone takes over for one match with a delay one
//! step higher, until the cap. The final clone answers unlimited times at
//! the cap, so a service that keeps retrying eventually sees a stable
//! worst-case latency.
//!
//! Ordering is enforced through priorities. Higher numeric priority means
//! evaluated later, so each expectation and its clones are assigned strictly
//! increasing priorities in match order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::expectation::{Delay, Expectation, Times};

/// Delay escalation policy, all values in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressivePolicy {
    /// Delay of the first response.
    pub base: u64,
    /// Increment applied per clone.
    pub step: u64,
    /// Upper bound; the final clone answers at this delay forever.
    pub cap: u64,
}

impl ProgressivePolicy {
    pub fn new(base: u64, step: u64, cap: u64) -> Result<Self> {
        let policy = Self { base, step, cap };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(self.invalid("step must be positive"));
        }
        if self.cap < self.base {
            return Err(self.invalid("cap must not be below base"));
        }
        Ok(())
    }

    /// Number of clones the expansion will add for this policy.
    pub fn planned_clones(&self) -> u64 {
        (self.cap - self.base) / self.step
    }

    /// Delays of the clones, in match order (base excluded, strictly
    /// increasing up to the cap).
    fn clone_delays(&self) -> impl Iterator<Item = u64> + '_ {
        (1..=self.planned_clones()).map(|i| self.base + i * self.step)
    }

    fn invalid(&self, reason: &'static str) -> Error {
        Error::InvalidPolicy {
            base: self.base,
            step: self.step,
            cap: self.cap,
            reason,
        }
    }
}

fn annotate(description: &Option<String>, delay_ms: u64) -> String {
    let tag = format!("[progressive delay: {delay_ms} ms]");
    match description {
        Some(d) if !d.is_empty() => format!("{d} {tag}"),
        _ => tag,
    }
}

/// Expand every expectation carrying a valid [`ProgressivePolicy`] into its
/// delay-escalation chain.
///
/// Every input expectation is re-prioritized: walking the collection in
/// order, each expectation is raised above the running maximum, and each of
/// its clones takes the next priority after it. Priorities in the result
/// are pairwise distinct and follow match order within each chain.
///
/// Clones are appended after all originals, so positions of the input
/// expectations are stable. An expectation with an invalid policy keeps its
/// policy and gets no clones; the skip is logged. The consumed policy is
/// cleared from a successfully expanded original.
pub fn expand_progressive(expectations: Vec<Expectation>) -> Vec<Expectation> {
    let mut max_priority = expectations.iter().map(|e| e.priority).max().unwrap_or(0);

    let mut expanded = expectations;
    let mut clones = Vec::new();

    for original in &mut expanded {
        max_priority = max_priority.saturating_add(1);
        if original.priority < max_priority {
            original.priority = max_priority;
        }

        let Some(policy) = original.progressive.take() else {
            continue;
        };
        if let Err(e) = policy.validate() {
            warn!(expectation = %original.label(), error = %e, "skipping progressive expansion");
            original.progressive = Some(policy);
            continue;
        }

        let total = policy.planned_clones();
        for (index, delay_ms) in policy.clone_delays().enumerate() {
            let mut clone = original.deep_clone();
            clone.description = Some(annotate(&original.description, delay_ms));
            max_priority = max_priority.saturating_add(1);
            clone.priority = max_priority;
            clone.times = Some(if index as u64 + 1 == total {
                Times::Unlimited
            } else {
                Times::Exactly(1)
            });
            clone.http_response.delay = Some(Delay::milliseconds(delay_ms));
            clone.progressive = None;
            clones.push(clone);
        }

        debug!(
            expectation = %original.label(),
            base = policy.base,
            step = policy.step,
            cap = policy.cap,
            clones = total,
            "expanded progressive delay chain"
        );
    }

    expanded.extend(clones);
    expanded
}
