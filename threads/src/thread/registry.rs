//! Owner of every thread control block.
//!
//! Control blocks stay in the registry from creation until their successor
//! reclaims them. The live list, in creation order, drops a thread as soon
//! as it exits and drives broadcast recalculation.
use super::{Thread, Tid};
use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use core::ops::{Index, IndexMut};

/// All thread control blocks that have not been reclaimed.
pub struct Registry<C> {
    threads: BTreeMap<Tid, Box<Thread<C>>>,
    live: Vec<Tid>,
    next_tid: u32,
}

impl<C> Registry<C> {
    /// An empty registry. The first identifier handed out is 1.
    pub fn new() -> Self {
        Self {
            threads: BTreeMap::new(),
            live: Vec::new(),
            next_tid: 1,
        }
    }

    /// Reserve the next thread identifier.
    pub fn allocate_tid(&mut self) -> Tid {
        let tid = Tid::new(self.next_tid);
        self.next_tid += 1;
        tid
    }

    /// Take ownership of `thread` and add it to the live list.
    pub fn insert(&mut self, thread: Box<Thread<C>>) {
        let tid = thread.tid;
        self.live.push(tid);
        let prev = self.threads.insert(tid, thread);
        assert!(prev.is_none(), "thread {} registered twice", tid);
    }

    /// Look up a thread that has not been reclaimed.
    pub fn get(&self, tid: Tid) -> Option<&Thread<C>> {
        self.threads.get(&tid).map(Box::as_ref)
    }

    /// Mutable [`get`](Self::get).
    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Thread<C>> {
        self.threads.get_mut(&tid).map(Box::as_mut)
    }

    /// Drop `tid` from the live list. Its control block stays until
    /// [`reap`](Self::reap).
    pub fn unlink(&mut self, tid: Tid) {
        self.live.retain(|t| *t != tid);
    }

    /// Free the control block of `tid`, together with its context.
    pub fn reap(&mut self, tid: Tid) -> Option<Box<Thread<C>>> {
        self.unlink(tid);
        self.threads.remove(&tid)
    }

    /// Live threads in creation order.
    pub fn live(&self) -> &[Tid] {
        &self.live
    }

    /// Every control block, live or not yet reclaimed, in tid order.
    pub fn iter_all(&self) -> impl Iterator<Item = &Thread<C>> {
        self.threads.values().map(Box::as_ref)
    }

    /// Apply `f` to every live thread in creation order.
    pub fn for_each_live_mut(&mut self, mut f: impl FnMut(&mut Thread<C>)) {
        for tid in self.live.iter() {
            if let Some(th) = self.threads.get_mut(tid) {
                f(th);
            }
        }
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Index<Tid> for Registry<C> {
    type Output = Thread<C>;

    fn index(&self, tid: Tid) -> &Thread<C> {
        self.get(tid)
            .unwrap_or_else(|| panic!("unknown thread {}", tid))
    }
}

impl<C> IndexMut<Tid> for Registry<C> {
    fn index_mut(&mut self, tid: Tid) -> &mut Thread<C> {
        self.get_mut(tid)
            .unwrap_or_else(|| panic!("unknown thread {}", tid))
    }
}
