//! One-shot readiness with a timeout fallback
//!
//! Media that announces its properties asynchronously (a video reporting its
//! dimensions) races against a fixed-delay fallback. Both paths settle the
//! same signal, and the consumer observes the outcome exactly once.

/// How a [`ReadySignal`] was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySource {
    Resolved,
    TimedOut,
}

#[derive(Debug, Clone)]
enum ReadyState<T> {
    Pending { waited: f64 },
    Ready { value: T, source: ReadySource, observed: bool },
}

/// A value that becomes available once, either explicitly or after a timeout
#[derive(Debug, Clone)]
pub struct ReadySignal<T> {
    state: ReadyState<T>,
    timeout: f64,
    fallback: T,
}

impl<T: Clone> ReadySignal<T> {
    /// `timeout` seconds of polling without a `resolve` settles to `fallback`
    pub fn new(timeout: f64, fallback: T) -> Self {
        Self {
            state: ReadyState::Pending { waited: 0.0 },
            timeout,
            fallback,
        }
    }

    /// Settle with a real value. Returns false if the signal was already
    /// settled, in which case nothing changes.
    pub fn resolve(&mut self, value: T) -> bool {
        match self.state {
            ReadyState::Pending { .. } => {
                self.state = ReadyState::Ready {
                    value,
                    source: ReadySource::Resolved,
                    observed: false,
                };
                true
            }
            ReadyState::Ready { .. } => false,
        }
    }

    /// Advance the timeout by `dt` and return the value on the first poll
    /// after the signal settles. Every later poll returns `None`.
    pub fn poll(&mut self, dt: f64) -> Option<T> {
        if let ReadyState::Pending { waited } = &mut self.state {
            *waited += dt;
            if *waited < self.timeout {
                return None;
            }
            log::debug!("readiness timed out after {:.2}s, using fallback", *waited);
            self.state = ReadyState::Ready {
                value: self.fallback.clone(),
                source: ReadySource::TimedOut,
                observed: false,
            };
        }
        match &mut self.state {
            ReadyState::Ready {
                value, observed, ..
            } if !*observed => {
                *observed = true;
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ReadyState::Ready { .. })
    }

    /// The settled value, if any
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            ReadyState::Ready { value, .. } => Some(value),
            ReadyState::Pending { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ReadySource> {
        match &self.state {
            ReadyState::Ready { source, .. } => Some(*source),
            ReadyState::Pending { .. } => None,
        }
    }
}
