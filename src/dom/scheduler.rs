use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce()>;

/// Runs work on a later macrotask.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// Runs every task as soon as it is deferred.
///
/// Deferred work happens inside the call that deferred it, not on a later
/// turn.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn defer(&self, task: Task) {
        task();
    }
}

/// Queues tasks until [`ManualScheduler::run_pending`] is called.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs queued tasks, including ones deferred while running. Returns how
    /// many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
