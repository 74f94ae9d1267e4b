//! Where a drain cycle stands between ticks

/// Drain cycle state derived from the persisted queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// No queue stored; the next tick rebuilds it
    Idle,
    /// A pop left work behind
    Draining { remaining: usize },
    /// The last pop emptied the queue; the run is ready to finalize
    Completing,
}

impl DrainState {
    /// State at the start of a tick, given whatever queue is stored
    ///
    /// An empty stored queue counts as idle: the previous cycle finished its
    /// last batch but never got to clear the entry.
    pub fn from_queue(queue: Option<&[String]>) -> Self {
        match queue {
            Some(urls) if !urls.is_empty() => DrainState::Draining {
                remaining: urls.len(),
            },
            _ => DrainState::Idle,
        }
    }

    /// State after a pop that left `remaining` URLs queued
    pub fn after_pop(remaining: usize) -> Self {
        if remaining == 0 {
            DrainState::Completing
        } else {
            DrainState::Draining { remaining }
        }
    }

    pub fn needs_rebuild(&self) -> bool {
        matches!(self, DrainState::Idle)
    }
}
