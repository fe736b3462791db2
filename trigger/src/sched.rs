use std::cell::RefCell;
use std::rc::Rc;

/// Injected timer facility. `after` arms a timer; when it elapses the host
/// delivers it by calling `DelayedTrigger::fire` with the echoed
/// `deadline`. `cancel` disarms a previously returned handle.
pub trait Scheduler {
    type Handle;

    fn after(&mut self, delay_ms: u64, deadline: u64) -> Self::Handle;
    fn cancel(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: u64,
    deadline: u64,
}

#[derive(Debug, Default)]
struct QueueInner {
    armed: Vec<Armed>,
    next_handle: u64,
}

/// Single-threaded scheduler backed by a shared queue. Clones share the
/// queue: hand one clone to the trigger and keep another, then drain due
/// deadlines from the host loop with [`QueueScheduler::take_due`].
#[derive(Debug, Clone, Default)]
pub struct QueueScheduler {
    inner: Rc<RefCell<QueueInner>>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.inner.borrow().armed.len()
    }

    /// Removes and returns the deadlines due at `now`, in ascending order.
    pub fn take_due(&self, now: u64) -> Vec<u64> {
        let mut inner = self.inner.borrow_mut();
        let mut due = Vec::new();
        inner.armed.retain(|armed| {
            if armed.deadline <= now {
                due.push(armed.deadline);
                false
            } else {
                true
            }
        });
        due.sort_unstable();
        due
    }
}

impl Scheduler for QueueScheduler {
    type Handle = u64;

    fn after(&mut self, _delay_ms: u64, deadline: u64) -> Self::Handle {
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.armed.push(Armed { handle, deadline });
        handle
    }

    fn cancel(&mut self, handle: Self::Handle) {
        self.inner
            .borrow_mut()
            .armed
            .retain(|armed| armed.handle != handle);
    }
}
