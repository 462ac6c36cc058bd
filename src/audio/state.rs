// Output device state and the change notification the playback driver waits on

use parking_lot::{Condvar, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Samples are being pulled from a stream
    Active,
    /// The stream ran out of data
    Idle,
    /// Initial state, and the state after stop/reset or a stream error
    Stopped,
}

/// Device state with a generation counter bumped on every transition.
/// Waiters compare generations so no transition is missed between checks.
pub struct StateSignal {
    inner: Mutex<(DeviceState, u64)>,
    changed: Condvar,
}

impl Default for StateSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSignal {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new((DeviceState::Stopped, 0)),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.inner.lock().0
    }

    /// Current state and generation
    pub fn snapshot(&self) -> (DeviceState, u64) {
        *self.inner.lock()
    }

    /// Move to `state`, waking every waiter if it differs from the current one
    pub fn set(&self, state: DeviceState) {
        let mut inner = self.inner.lock();
        if inner.0 != state {
            debug!("[Output] State {:?} -> {:?}", inner.0, state);
            inner.0 = state;
            inner.1 = inner.1.wrapping_add(1);
            self.changed.notify_all();
        }
    }

    /// Move to `to` only if the current state is `from`
    pub fn transition(&self, from: DeviceState, to: DeviceState) -> bool {
        let mut inner = self.inner.lock();
        if inner.0 != from || from == to {
            return false;
        }
        debug!("[Output] State {:?} -> {:?}", from, to);
        inner.0 = to;
        inner.1 = inner.1.wrapping_add(1);
        self.changed.notify_all();
        true
    }

    /// Block until the generation moves past `seen`
    pub fn wait_change(&self, seen: u64) -> (DeviceState, u64) {
        let mut inner = self.inner.lock();
        while inner.1 == seen {
            self.changed.wait(&mut inner);
        }
        *inner
    }
}
