//! The ready queue.
//!
//! One FIFO per priority level plus a bitmap of the non-empty levels, so
//! that the highest ready thread is found with a single bit scan. Threads
//! of equal priority leave in the order they became ready.
use super::{Tid, PRI_MAX, PRI_MIN};
use alloc::collections::VecDeque;

const LEVELS: usize = (PRI_MAX - PRI_MIN + 1) as usize;

/// Ready threads ordered by descending priority, FIFO among equals.
pub struct ReadyQueue {
    levels: [VecDeque<Tid>; LEVELS],
    occupied: u64,
    len: usize,
}

fn level(priority: i32) -> usize {
    assert!(
        (PRI_MIN..=PRI_MAX).contains(&priority),
        "priority {} out of range",
        priority
    );
    (priority - PRI_MIN) as usize
}

impl ReadyQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| VecDeque::new()),
            occupied: 0,
            len: 0,
        }
    }

    /// Append `tid` behind every thread of the same priority.
    pub fn push(&mut self, tid: Tid, priority: i32) {
        let lv = level(priority);
        self.levels[lv].push_back(tid);
        self.occupied |= 1 << lv;
        self.len += 1;
    }

    fn highest_level(&self) -> Option<usize> {
        if self.occupied == 0 {
            None
        } else {
            Some(63 - self.occupied.leading_zeros() as usize)
        }
    }

    /// Remove and return the first thread of the highest priority.
    pub fn pop(&mut self) -> Option<Tid> {
        let lv = self.highest_level()?;
        let tid = self.levels[lv].pop_front();
        self.retire(lv);
        tid
    }

    /// Priority of the thread [`pop`] would return.
    ///
    /// [`pop`]: Self::pop
    pub fn peek_priority(&self) -> Option<i32> {
        self.highest_level().map(|lv| lv as i32 + PRI_MIN)
    }

    /// The thread [`pop`] would return.
    ///
    /// [`pop`]: Self::pop
    pub fn front(&self) -> Option<Tid> {
        self.levels[self.highest_level()?].front().copied()
    }

    /// Remove `tid`, queued at `priority`. Returns whether it was queued.
    pub fn remove(&mut self, tid: Tid, priority: i32) -> bool {
        let lv = level(priority);
        match self.levels[lv].iter().position(|t| *t == tid) {
            Some(pos) => {
                self.levels[lv].remove(pos);
                self.retire(lv);
                true
            }
            None => false,
        }
    }

    /// Move `tid` from level `old` to the back of level `new`.
    pub fn reposition(&mut self, tid: Tid, old: i32, new: i32) {
        if old != new && self.remove(tid, old) {
            self.push(tid, new);
        }
    }

    /// Rebuild the queue after priorities changed wholesale.
    ///
    /// Threads are re-inserted in their current dequeue order, so threads
    /// that end up at the same level keep their relative order.
    pub fn resort(&mut self, mut priority_of: impl FnMut(Tid) -> i32) {
        let mut old = core::mem::replace(self, Self::new());
        while let Some(tid) = old.pop() {
            self.push(tid, priority_of(tid));
        }
    }

    fn retire(&mut self, lv: usize) {
        self.len -= 1;
        if self.levels[lv].is_empty() {
            self.occupied &= !(1 << lv);
        }
    }

    /// Number of queued threads.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no thread is queued.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `tid` is queued at any level.
    pub fn contains(&self, tid: Tid) -> bool {
        self.iter().any(|t| t == tid)
    }

    /// Queued threads in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = Tid> + '_ {
        self.entries().map(|(tid, _)| tid)
    }

    /// Queued threads with the level they are queued at, in dequeue order.
    pub fn entries(&self) -> impl Iterator<Item = (Tid, i32)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .rev()
            .flat_map(|(lv, q)| q.iter().map(move |tid| (*tid, lv as i32 + PRI_MIN)))
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn t(n: u32) -> Tid {
        Tid::new(n)
    }

    #[test]
    fn highest_first_fifo_among_equals() {
        let mut q = ReadyQueue::new();
        q.push(t(1), 31);
        q.push(t(2), 40);
        q.push(t(3), 31);
        q.push(t(4), 0);
        q.push(t(5), 40);
        assert_eq!(q.len(), 5);
        assert_eq!(q.peek_priority(), Some(40));
        assert_eq!(q.front(), Some(t(2)));
        assert_eq!(q.iter().collect::<Vec<_>>(), [t(2), t(5), t(1), t(3), t(4)]);
        let order: Vec<_> = core::iter::from_fn(|| q.pop()).collect();
        assert_eq!(order, [t(2), t(5), t(1), t(3), t(4)]);
        assert!(q.is_empty());
        assert_eq!(q.peek_priority(), None);
    }

    #[test]
    fn reposition_moves_to_the_back_of_the_new_level() {
        let mut q = ReadyQueue::new();
        q.push(t(1), 50);
        q.push(t(2), 10);
        q.push(t(3), 10);
        q.reposition(t(3), 10, 50);
        q.reposition(t(2), 10, 10);
        assert_eq!(q.iter().collect::<Vec<_>>(), [t(1), t(3), t(2)]);
        assert!(!q.remove(t(3), 10));
        assert!(q.remove(t(3), 50));
        assert!(!q.contains(t(3)));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn resort_keeps_relative_order() {
        let mut q = ReadyQueue::new();
        q.push(t(1), 20);
        q.push(t(2), 30);
        q.push(t(3), 20);
        q.resort(|_| PRI_MAX);
        assert_eq!(
            q.entries().collect::<Vec<_>>(),
            [(t(2), 63), (t(1), 63), (t(3), 63)]
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn priority_out_of_range_is_fatal() {
        ReadyQueue::new().push(t(1), PRI_MAX + 1);
    }
}
