/// Garbage collection statistics.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct Stats {
    /// The number of field reads.
    pub(crate) reads: usize,

    /// The number of field writes.
    pub(crate) writes: usize,

    /// The number of field reads that triggered a read barrier.
    pub(crate) read_barriers: usize,

    /// The number of field writes that triggered a write barrier.
    ///
    /// The write barrier itself is a no-op (incremental copying needs no remembered set), but
    /// the hit count is still worth keeping for parity with the read-barrier counter.
    pub(crate) write_barriers: usize,

    /// The amount of memory allocated since the start of the program.
    pub(crate) all_time_allocated: usize,

    /// The number of allocated objects (i. e., calls to [`crate::gc::Gc::alloc`]) since the start
    /// of the program.
    pub(crate) all_time_allocated_objs: usize,

    /// The maximum amount of used memory managed by the GC.
    pub(crate) max_used: usize,

    /// The maximum number of live objects managed by the GC, sampled at the same points as
    /// `max_used`.
    pub(crate) max_used_objs: usize,

    /// The number of times garbage collection took place.
    ///
    /// Includes the partial GC cycle when garbage collection is in progress.
    pub(crate) gc_cycles: usize,
}
