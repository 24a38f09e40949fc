use chrono::{NaiveDateTime, TimeDelta};

/// A simulation clock that advances a timestamp in fixed steps up to a horizon.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use microgrid_twin::sim::clock::SimulationClock;
///
/// let start = NaiveDate::from_ymd_opt(2024, 6, 1)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .unwrap();
/// let mut clock = SimulationClock::new(start, 60, 3);
/// let mut steps = Vec::new();
///
/// while let Some(step) = clock.tick() {
///     steps.push(step);
/// }
/// assert_eq!(steps, vec![0, 1, 2]);
/// assert_eq!(clock.now(), start + chrono::TimeDelta::hours(3));
/// ```
#[derive(Debug, Clone)]
pub struct SimulationClock {
    start: NaiveDateTime,
    current: NaiveDateTime,
    step: TimeDelta,
    /// Steps taken since the start
    index: usize,
    /// Total steps in the episode
    horizon: usize,
}

impl SimulationClock {
    /// Creates a clock starting at `start` with `step_minutes` per step.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of step 0
    /// * `step_minutes` - Step length in minutes
    /// * `horizon` - The total number of steps the clock will run
    pub fn new(start: NaiveDateTime, step_minutes: u32, horizon: usize) -> Self {
        Self {
            start,
            current: start,
            step: TimeDelta::minutes(i64::from(step_minutes)),
            index: 0,
            horizon,
        }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(step)` - The step number (starting from 0) before advancing
    /// * `None` - If the clock has reached its horizon
    pub fn tick(&mut self) -> Option<usize> {
        if self.index < self.horizon {
            let step = self.index;
            self.index += 1;
            // Validated scenarios never leave chrono's range; saturate otherwise.
            if let Some(next) = self.current.checked_add_signed(self.step) {
                self.current = next;
            }
            Some(step)
        } else {
            None
        }
    }

    /// Rewinds to the start timestamp.
    pub fn reset(&mut self) {
        self.current = self.start;
        self.index = 0;
    }

    /// Current timestamp.
    pub fn now(&self) -> NaiveDateTime {
        self.current
    }

    /// Number of completed steps.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Returns `true` once the horizon is reached.
    pub fn is_finished(&self) -> bool {
        self.index >= self.horizon
    }

    /// Step length in hours.
    pub fn dt_hours(&self) -> f64 {
        self.step.num_seconds() as f64 / 3600.0
    }
}
