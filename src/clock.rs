use std::time::{Duration, Instant};

/// Monotonic stopwatch charging elapsed time against a wait budget.
///
/// `poll(2)` may return early with `EINTR`; the remaining budget for the
/// retry is the previous budget minus the lap time recorded here.
#[derive(Debug)]
pub(crate) struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub(crate) fn start() -> Stopwatch {
        Stopwatch {
            started: Instant::now(),
        }
    }

    /// Time elapsed since the last (re)start; begins the next lap.
    pub(crate) fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started);
        self.started = now;
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn lap_measures_and_resets() {
        let mut clock = Stopwatch::start();
        thread::sleep(Duration::from_millis(20));
        let first = clock.lap();
        assert!(first >= Duration::from_millis(20), "lap too short: {:?}", first);

        let second = clock.lap();
        assert!(second < first, "lap did not reset: {:?}", second);
    }

    #[test]
    fn budget_deduction_saturates() {
        let mut clock = Stopwatch::start();
        thread::sleep(Duration::from_millis(5));
        let budget = Duration::from_millis(1).saturating_sub(clock.lap());
        assert_eq!(budget, Duration::ZERO);
    }
}
