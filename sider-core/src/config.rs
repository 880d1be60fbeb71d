use std::time::Duration;

/// Configuration for the background expiration sweeper
///
/// # Example
///
/// ```rust
/// use sider_core::SweeperConfig;
/// use std::time::Duration;
///
/// let config = SweeperConfig::default()
///     .with_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between sweeps (default: 60 seconds)
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval
    ///
    /// This determines how often the background task removes expired entries.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}
