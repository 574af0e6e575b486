use std::time::Duration;

/// Blocking delay used for device settle times.
///
/// Injected wherever the protocol has to wait on the hardware, so tests can
/// observe the waits without sleeping.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested delays instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    pub calls: Vec<Duration>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all recorded delays.
    pub fn total(&self) -> Duration {
        self.calls.iter().sum()
    }
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.calls.push(duration);
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration);
    }
}
