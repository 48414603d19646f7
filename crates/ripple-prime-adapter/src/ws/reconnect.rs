/*
[INPUT]:  Reconnect attempt number
[OUTPUT]: Delay before the next connection attempt
[POS]:    WebSocket layer - pluggable reconnect scheduling
[UPDATE]: When adding reconnect strategies
*/

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay strategy between reconnect attempts
pub trait ReconnectPolicy: Debug + Send + Sync {
    /// Delay before attempt number `attempt` (1-based)
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay before every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval(pub Duration);

impl Default for FixedInterval {
    fn default() -> Self {
        Self(DEFAULT_RECONNECT_INTERVAL)
    }
}

impl ReconnectPolicy for FixedInterval {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Doubling delay, clamped to `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl ReconnectPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max)
    }
}

/// Reconnect settings for the event stream
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// 0 means unlimited
    pub max_attempts: u32,
    pub policy: Arc<dyn ReconnectPolicy>,
}

impl ReconnectConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            enabled: true,
            max_attempts,
            policy: Arc::new(FixedInterval(interval)),
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn allows(&self, attempts: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempts < self.max_attempts)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            policy: Arc::new(FixedInterval::default()),
        }
    }
}
