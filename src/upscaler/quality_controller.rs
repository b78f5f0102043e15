//! EWMA-driven quality tier stepping, shared by every upscaler implementation
//! that opts into adaptive quality.

use std::time::Duration;

use crate::config::Quality;

const EWMA_ALPHA: f32 = 0.2;
const STEP_DOWN_AFTER_CONSECUTIVE_OVER_BUDGET: u32 = 4;
const STEP_UP_AFTER_CONSECUTIVE_UNDER_BUDGET: u32 = 16;
const STEP_UP_BUDGET_FRACTION: f32 = 0.7;

pub(crate) struct AdaptiveQualityController {
    enabled: bool,
    tier: Quality,
    ewma_ms: Option<f32>,
    consecutive_over: u32,
    consecutive_under: u32,
}

impl AdaptiveQualityController {
    pub(crate) fn new(initial: Quality, enabled: bool) -> AdaptiveQualityController {
        AdaptiveQualityController {
            enabled,
            tier: initial,
            ewma_ms: None,
            consecutive_over: 0,
            consecutive_under: 0,
        }
    }

    pub(crate) fn current(&self) -> Quality {
        self.tier
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_tier(&mut self, tier: Quality) {
        self.tier = tier;
        self.consecutive_over = 0;
        self.consecutive_under = 0;
    }

    pub(crate) fn ewma_ms(&self) -> Option<f32> {
        self.ewma_ms
    }

    /// Feed one frame's end-to-end time. `budget` is the per-frame time
    /// implied by the pipeline's target FPS. Returns the new tier if this
    /// observation caused a step.
    pub(crate) fn observe(&mut self, elapsed: Duration, budget: Duration) -> Option<Quality> {
        let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
        let budget_ms = budget.as_secs_f32() * 1000.0;

        let ewma_ms = match self.ewma_ms {
            Some(prev) => prev * (1.0 - EWMA_ALPHA) + elapsed_ms * EWMA_ALPHA,
            None => elapsed_ms,
        };
        self.ewma_ms = Some(ewma_ms);

        if !self.enabled {
            return None;
        }

        if ewma_ms > budget_ms {
            self.consecutive_over += 1;
            self.consecutive_under = 0;
        } else if ewma_ms < budget_ms * STEP_UP_BUDGET_FRACTION {
            self.consecutive_under += 1;
            self.consecutive_over = 0;
        } else {
            self.consecutive_over = 0;
            self.consecutive_under = 0;
        }

        if self.consecutive_over >= STEP_DOWN_AFTER_CONSECUTIVE_OVER_BUDGET {
            let new_tier = self.tier.step_down();
            self.consecutive_over = 0;
            if new_tier != self.tier {
                self.tier = new_tier;
                tracing::debug!(?new_tier, "adaptive quality stepped down");
                return Some(new_tier);
            }
        } else if self.consecutive_under >= STEP_UP_AFTER_CONSECUTIVE_UNDER_BUDGET {
            let new_tier = self.tier.step_up();
            self.consecutive_under = 0;
            if new_tier != self.tier {
                self.tier = new_tier;
                tracing::debug!(?new_tier, "adaptive quality stepped up");
                return Some(new_tier);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_down_after_four_consecutive_over_budget_frames() {
        let mut ctl = AdaptiveQualityController::new(Quality::Ultra, true);
        let budget = Duration::from_millis(16);
        let over = Duration::from_millis(30);

        assert!(ctl.observe(over, budget).is_none());
        assert!(ctl.observe(over, budget).is_none());
        assert!(ctl.observe(over, budget).is_none());
        let stepped = ctl.observe(over, budget);
        assert_eq!(stepped, Some(Quality::Quality));
    }

    #[test]
    fn steps_up_after_sixteen_consecutive_comfortably_under_budget_frames() {
        let mut ctl = AdaptiveQualityController::new(Quality::Performance, true);
        let budget = Duration::from_millis(16);
        let fast = Duration::from_millis(5);

        let mut last_step = None;
        for _ in 0..16 {
            last_step = ctl.observe(fast, budget);
        }
        assert_eq!(last_step, Some(Quality::Balanced));
    }

    #[test]
    fn disabled_controller_never_steps() {
        let mut ctl = AdaptiveQualityController::new(Quality::Ultra, false);
        let budget = Duration::from_millis(16);
        let over = Duration::from_millis(100);
        for _ in 0..50 {
            assert!(ctl.observe(over, budget).is_none());
        }
        assert_eq!(ctl.current(), Quality::Ultra);
    }
}
