use std::collections::VecDeque;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A unit of work posted to a [`TaskRunner`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Where a task was posted from.
pub type PostedFrom = &'static Location<'static>;

/// Fire-and-forget task posting onto one owning execution context.
///
/// Tasks posted to the same runner run in FIFO order on the runner's context. A runner that is
/// shut down may drop tasks without running them; callers must treat that as a normal outcome.
pub trait TaskRunner: Send + Sync {
    fn post_task(&self, from: PostedFrom, task: Task);

    fn post_delayed_task(&self, from: PostedFrom, task: Task, delay: Duration);
}

struct PostedTask {
    from: PostedFrom,
    task: Task,
}

struct DelayedTask {
    run_at: Duration,
    sequence: u64,
    posted: PostedTask,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<PostedTask>,
    delayed: Vec<DelayedTask>,
    now: Duration,
    next_sequence: u64,
    shut_down: bool,
}

/// Deterministic, manually driven task runner with virtual time.
///
/// The owner drains it from its own loop with [`TaskQueue::run_pending`] or
/// [`TaskQueue::run_until_idle`]; other threads may post at any time. Tasks never run while the
/// queue's lock is held, so a task may post further tasks.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
}

impl TaskQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of tasks waiting, delayed ones included.
    pub fn pending_tasks(&self) -> usize {
        let st = self.state.lock();
        st.ready.len() + st.delayed.len()
    }

    /// Run the tasks that are ready right now, but not tasks they post. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let budget = self.state.lock().ready.len();
        let mut ran = 0;
        while ran < budget {
            let Some(next) = self.pop_ready() else {
                break;
            };
            Self::run(next);
            ran += 1;
        }
        ran
    }

    /// Run ready tasks, including ones posted while running, until none remain.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(next) = self.pop_ready() {
            Self::run(next);
            ran += 1;
        }
        ran
    }

    /// Move virtual time forward, promote due delayed tasks and run everything ready.
    pub fn advance_time(&self, by: Duration) -> usize {
        {
            let mut st = self.state.lock();
            st.now = st.now.saturating_add(by);
            Self::promote_due(&mut st);
        }
        self.run_until_idle()
    }

    /// Drop every queued task without running it. Later posts are dropped as well.
    pub fn shutdown(&self) {
        let (ready, delayed) = {
            let mut st = self.state.lock();
            st.shut_down = true;
            (
                std::mem::take(&mut st.ready),
                std::mem::take(&mut st.delayed),
            )
        };
        tracing::debug!(
            dropped = ready.len() + delayed.len(),
            "task queue shut down"
        );
        // Tasks drop outside the lock; their captures may own arbitrary state.
        drop(ready);
        drop(delayed);
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    fn pop_ready(&self) -> Option<PostedTask> {
        self.state.lock().ready.pop_front()
    }

    fn run(posted: PostedTask) {
        tracing::trace!(
            file = posted.from.file(),
            line = posted.from.line(),
            "running task"
        );
        (posted.task)();
    }

    fn promote_due(st: &mut QueueState) {
        let now = st.now;
        let mut due: Vec<DelayedTask> = Vec::new();
        let mut i = 0;
        while i < st.delayed.len() {
            if st.delayed[i].run_at <= now {
                due.push(st.delayed.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|t| (t.run_at, t.sequence));
        st.ready.extend(due.into_iter().map(|t| t.posted));
    }

    fn push(&self, posted: PostedTask, delay: Option<Duration>) {
        let mut st = self.state.lock();
        if st.shut_down {
            tracing::debug!(
                file = posted.from.file(),
                line = posted.from.line(),
                "dropping task posted after shutdown"
            );
            drop(st);
            drop(posted);
            return;
        }
        match delay {
            None => st.ready.push_back(posted),
            Some(delay) => {
                let run_at = st.now.saturating_add(delay);
                let sequence = st.next_sequence;
                st.next_sequence += 1;
                st.delayed.push(DelayedTask {
                    run_at,
                    sequence,
                    posted,
                });
            }
        }
    }
}

impl TaskRunner for TaskQueue {
    fn post_task(&self, from: PostedFrom, task: Task) {
        self.push(PostedTask { from, task }, None);
    }

    fn post_delayed_task(&self, from: PostedFrom, task: Task, delay: Duration) {
        if delay.is_zero() {
            return self.post_task(from, task);
        }
        self.push(PostedTask { from, task }, Some(delay));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/task.rs"]
mod tests;
