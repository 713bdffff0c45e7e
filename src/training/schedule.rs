// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Linear learning-rate schedule with warmup.
///
/// Ramps the learning rate linearly from 0 to `base_lr` over
/// `warmup_steps`, then decays it linearly to 0 at `total_steps`. With zero
/// warmup the first step uses `base_lr` directly.
#[derive(Debug)]
pub struct LinearScheduleWithWarmup {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
    current_step: usize,
}

impl LinearScheduleWithWarmup {
    /// # Arguments
    ///
    /// * `base_lr` - Peak learning rate reached at the end of warmup
    /// * `warmup_steps` - Number of ramp-up steps
    /// * `total_steps` - Total optimizer steps of the run (batches × epochs)
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> LinearScheduleWithWarmup {
        LinearScheduleWithWarmup {
            base_lr,
            warmup_steps,
            total_steps,
            current_step: 0,
        }
    }

    /// Learning rate to apply at the current step.
    pub fn learning_rate(&self) -> f64 {
        if self.warmup_steps > 0 && self.current_step < self.warmup_steps {
            return self.base_lr * self.current_step as f64 / self.warmup_steps as f64;
        }
        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1);
        let remaining = self.total_steps.saturating_sub(self.current_step);
        self.base_lr * remaining as f64 / decay_steps as f64
    }

    /// Advances the schedule by one optimizer step.
    pub fn step(&mut self) {
        self.current_step += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_warmup_starts_at_the_base_rate() {
        let mut schedule = LinearScheduleWithWarmup::new(5e-5, 0, 10);
        assert!((schedule.learning_rate() - 5e-5).abs() < 1e-12);
        for _ in 0..10 {
            schedule.step();
        }
        assert_eq!(schedule.learning_rate(), 0.0);
    }

    #[test]
    fn warmup_ramps_then_decays_linearly() {
        let mut schedule = LinearScheduleWithWarmup::new(1.0, 4, 10);
        assert_eq!(schedule.learning_rate(), 0.0);
        schedule.step();
        schedule.step();
        assert!((schedule.learning_rate() - 0.5).abs() < 1e-12);
        schedule.step();
        schedule.step();
        assert!((schedule.learning_rate() - 1.0).abs() < 1e-12);
        schedule.step();
        schedule.step();
        schedule.step();
        // step 7 of 10: 3 of 6 decay steps remain
        assert!((schedule.learning_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rate_stays_at_zero_past_the_final_step() {
        let mut schedule = LinearScheduleWithWarmup::new(1.0, 0, 3);
        for _ in 0..5 {
            schedule.step();
        }
        assert_eq!(schedule.learning_rate(), 0.0);
    }
}
