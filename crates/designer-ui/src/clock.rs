//! Designer clock backed by `performance.now()`.

use std::time::Duration;

use flowdesign_designer::Clock;

/// Milliseconds since page load, as a [`Duration`]
#[derive(Debug, Clone, Default)]
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        self.performance
            .as_ref()
            .map(web_sys::Performance::now)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map_or(Duration::ZERO, |ms| Duration::from_secs_f64(ms / 1000.0))
    }
}
