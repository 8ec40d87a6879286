use std::time::Duration;

/// How long a mutation waits after the metadata service confirmed it, so that the
/// other frontends have had a chance to pick the change up with their own heartbeat.
///
/// The metadata service doesn't broadcast catalog changes, so the only thing a caller
/// gets is the guarantee that this much time has passed, not that the change has
/// actually propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationDelay {
    delay: Duration,
}

impl PropagationDelay {
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A delay of `multiplier` heartbeat periods, or `None` if the multiplier is
    /// negative, NaN or the result doesn't fit a `Duration`.
    pub fn checked_from_heartbeat(interval: Duration, multiplier: f64) -> Option<Self> {
        Duration::try_from_secs_f64(interval.as_secs_f64() * multiplier)
            .ok()
            .map(Self::new)
    }

    /// Like [`PropagationDelay::checked_from_heartbeat`], saturating at zero and
    /// `Duration::MAX`.
    pub fn from_heartbeat(interval: Duration, multiplier: f64) -> Self {
        Self::checked_from_heartbeat(interval, multiplier).unwrap_or_else(|| {
            if multiplier > 0.0 {
                Self::new(Duration::MAX)
            } else {
                Self::none()
            }
        })
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
