use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    id: TaskId,
    due: Duration,
    task: T,
}

/// Delayed continuations on a virtual clock. The owner advances the clock and
/// receives every task that fell due, earliest first.
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due: self.now + delay,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let index = self.pending.iter().position(|pending| pending.id == id)?;
        Some(self.pending.remove(index).task)
    }

    /// Drops every pending task and returns how many were discarded.
    pub fn cancel_all(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    pub fn advance(&mut self, elapsed: Duration) -> Vec<T> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.due <= now);
        self.pending = waiting;
        due.sort_by_key(|pending| (pending.due, pending.id));
        due.into_iter().map(|pending| pending.task).collect()
    }

    /// Virtual time left until the last pending task falls due.
    pub fn time_until_last(&self) -> Duration {
        self.pending
            .iter()
            .map(|pending| pending.due.saturating_sub(self.now))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Advances straight to the latest due time and returns everything.
    pub fn drain(&mut self) -> Vec<T> {
        self.advance(self.time_until_last())
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
