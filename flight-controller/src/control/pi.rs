use shared_definitions::tuning::PIGains;

use crate::util::math::bound;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PIState {
    pub integral: f32,
    pub last_output: f32,
}

/// Single axis PI controller with a bounded output. The integral freezes
/// only while integrating would push the output further into saturation.
#[derive(Debug, Default, Clone)]
pub struct PIController {
    gains: PIGains,
    state: PIState,
}

impl PIController {
    pub fn new(gains: PIGains) -> Self {
        PIController {
            gains,
            state: PIState::default(),
        }
    }

    pub fn gains(&self) -> &PIGains {
        &self.gains
    }

    pub fn state(&self) -> &PIState {
        &self.state
    }

    /// Overwrites the gains. Changed gains invalidate the accumulated state.
    pub fn set_gains(&mut self, gains: PIGains) {
        if self.gains != gains {
            self.gains = gains;
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.state = PIState::default();
    }

    pub fn update(&mut self, error: f32, dt: f32) -> f32 {
        // Holds the previous output on a non-positive (or NaN) step
        if !(dt > 0.0) || !error.is_finite() {
            return self.state.last_output;
        }

        let raw = self.gains.kp * error + self.gains.ki * self.state.integral;

        let winding_up = (raw > self.gains.output_max && error * self.gains.ki > 0.0)
            || (raw < self.gains.output_min && error * self.gains.ki < 0.0);
        if !winding_up {
            self.state.integral += error * dt;
        }

        let output = bound(raw, self.gains.output_min, self.gains.output_max);
        self.state.last_output = output;
        output
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn proportional_and_integral_terms() {
        let mut pi = PIController::new(PIGains::symmetric(2.0, 1.0, 10.0));

        assert_abs_diff_eq!(pi.update(1.0, 0.5), 2.0);
        assert_abs_diff_eq!(pi.state().integral, 0.5);
        assert_abs_diff_eq!(pi.update(1.0, 0.5), 2.5);
        assert_abs_diff_eq!(pi.state().integral, 1.0);
    }

    #[test]
    fn integral_freezes_while_saturated() {
        let mut pi = PIController::new(PIGains::symmetric(1.0, 1.0, 1.0));

        let mut frozen_integral = None;
        for _ in 0..200 {
            let output = pi.update(5.0, 0.01);
            assert!(output <= 1.0);
            if output == 1.0 {
                let integral = pi.state().integral;
                assert_eq!(*frozen_integral.get_or_insert(integral), integral);
            }
        }
        assert!(frozen_integral.is_some());

        // On reversal the output leaves saturation on the very first cycle
        let output = pi.update(-5.0, 0.01);
        assert!(output < 0.0);
    }

    #[test]
    fn integral_only_term_unwinds_on_reversal() {
        let mut pi = PIController::new(PIGains::symmetric(0.0, 10.0, 1.0));

        for _ in 0..10 {
            pi.update(5.0, 0.01);
        }
        let wound_up = pi.state().integral;
        assert_eq!(pi.state().last_output, 1.0);
        assert_abs_diff_eq!(wound_up, 0.15, epsilon = 1e-6);

        // Integrating towards the bounds again is allowed immediately
        pi.update(-5.0, 0.01);
        assert!(pi.state().integral < wound_up);

        let outputs: Vec<f32> = (0..3).map(|_| pi.update(-5.0, 0.01)).collect();
        assert!(outputs[2] < 1.0);

        for _ in 0..1000 {
            pi.update(-5.0, 0.01);
        }
        assert_eq!(pi.state().last_output, -1.0);
    }

    #[test]
    fn saturates_at_lower_bound() {
        let mut pi = PIController::new(PIGains::new(1.0, 10.0, -0.5, 2.0));

        for _ in 0..50 {
            assert!(pi.update(-3.0, 0.1) >= -0.5);
        }
        assert_eq!(pi.state().last_output, -0.5);
        assert_abs_diff_eq!(pi.state().integral, 0.0);
    }

    #[test]
    fn non_positive_dt_holds_previous_output() {
        let mut pi = PIController::new(PIGains::symmetric(1.0, 1.0, 5.0));
        let previous = pi.update(1.0, 0.1);
        let state = *pi.state();

        assert_eq!(pi.update(3.0, 0.0), previous);
        assert_eq!(pi.update(3.0, -0.1), previous);
        assert_eq!(*pi.state(), state);
    }

    #[test]
    fn changing_gains_resets_state() {
        let mut pi = PIController::new(PIGains::symmetric(1.0, 1.0, 5.0));
        pi.update(1.0, 0.1);

        pi.set_gains(PIGains::symmetric(1.0, 1.0, 5.0));
        assert_abs_diff_eq!(pi.state().integral, 0.1);

        pi.set_gains(PIGains::symmetric(2.0, 1.0, 5.0));
        assert_eq!(*pi.state(), PIState::default());
    }
}
