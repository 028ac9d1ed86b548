use std::ptr;

use crate::error::GcError;
use crate::object::{ObjPtr, align_up};
use crate::roots::RootRegistry;
use crate::space::Space;
use crate::stats::Stats;
use crate::{FROM_SPACE_SIZE, TO_SPACE_SIZE};

/// A copying semi-space garbage collector, implemented as incremental Baker / Cheney-with-chase.
///
/// The FFI surface in the crate root drives one process-wide singleton instance of this type.
/// Code that wants isolated collector state (tests, embedders doing their own threading) can
/// instead construct and drive a `Gc` directly.
pub struct Gc {
    /// The from-space.
    ///
    /// `None` until the first `alloc` call.
    pub(crate) from_space: Option<Space>,

    /// The to-space.
    ///
    /// `None` until the first collection cycle begins.
    pub(crate) to_space: Option<Space>,

    /// The root registry.
    pub(crate) roots: RootRegistry,

    /// Whether a garbage collection cycle is currently underway.
    pub(crate) gc_in_progress: bool,

    /// The end of the scanned area in the to-space (only meaningful during a cycle).
    pub(crate) scan: *mut u8,

    /// If GC is underway, the end of the area evacuated so far in the to-space.
    /// Otherwise, the bump-allocation cursor in the from-space.
    pub(crate) next: *mut u8,

    /// If GC is underway, the place before which the next object is reserved (shrinks downward).
    /// Otherwise, the end of the free area in the from-space.
    pub(crate) limit: *mut u8,

    /// Garbage collection statistics.
    pub(crate) stats: Stats,
}

unsafe impl Send for Gc {}

fn from_space_size() -> Result<usize, GcError> {
    let (from, to) = unsafe { (FROM_SPACE_SIZE, TO_SPACE_SIZE) };

    if from != to {
        return Err(GcError::UnequalSemiSpaceSizes { from, to });
    }

    Ok(usize::try_from(from).expect("FROM_SPACE_SIZE must fit in usize"))
}

impl Gc {
    /// Creates a new garbage collector instance. Neither semi-space is allocated yet.
    pub fn new() -> Self {
        Self {
            from_space: None,
            to_space: None,

            roots: RootRegistry::new(),

            gc_in_progress: false,
            scan: ptr::null_mut(),
            next: ptr::null_mut(),
            limit: ptr::null_mut(),

            stats: Stats::default(),
        }
    }

    /// Allocates a new object of the given size.
    ///
    /// Lazily creates the from-space on first use. Starts a collection cycle if the bump
    /// allocator has run out of room, and interleaves scanning with allocation for the
    /// remainder of that cycle.
    ///
    /// # Safety
    /// The size must be non-zero.
    pub unsafe fn alloc(&mut self, size: usize) -> ObjPtr {
        let size = align_up(size, crate::object::ALIGNMENT);

        if self.from_space.is_none() {
            let space = Space::alloc(from_space_size().unwrap_or_else(|e| self.fatal(e)));
            self.next = space.start;
            self.limit = space.end();
            self.from_space = Some(space);
        }

        if !self.gc_in_progress {
            if let Some(result) = unsafe { self.alloc_at_next(size) } {
                self.register_alloc(size);
                return result;
            }

            self.begin_gc();
        }

        unsafe { self.scan_and_alloc(size) }
    }

    /// Allocation fast path: bumps `next` by `size` if it fits strictly before `limit`.
    ///
    /// # Safety
    /// Must only be called when `self.gc_in_progress` is `false`.
    unsafe fn alloc_at_next(&mut self, size: usize) -> Option<ObjPtr> {
        if self.next.wrapping_byte_add(size) < self.limit {
            let result = ObjPtr(self.next.cast());
            self.next = unsafe { self.next.byte_add(size) };

            return Some(result);
        }

        None
    }

    /// Returns the number of currently registered root slots.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Registers `outer` as a root slot. A null `outer` is a no-op.
    pub fn push_root(&mut self, outer: *mut ObjPtr) {
        self.roots.push(outer);
    }

    /// Unregisters the most-recently pushed root slot matching `outer`. A no-op if `outer` was
    /// never pushed (or has already been popped).
    pub fn pop_root(&mut self, outer: *mut ObjPtr) {
        self.roots.pop(outer);
    }

    fn register_alloc(&mut self, size: usize) {
        self.stats.all_time_allocated += size;
        self.stats.all_time_allocated_objs += 1;
        self.stats.max_used = self.stats.max_used.max(self.used_memory());
        self.stats.max_used_objs = self.stats.max_used_objs.max(self.used_objs());
    }

    /// Initiates a new collection cycle: lazily allocates the to-space, resets the scan/next/
    /// limit cursors to span it, then forwards every registered root.
    ///
    /// Scanning the rest of the live graph is left to subsequent `scan_and_alloc` calls, driven
    /// by the mutator's own allocation requests.
    fn begin_gc(&mut self) {
        self.gc_in_progress = true;
        self.stats.gc_cycles += 1;

        if self.to_space.is_none() {
            let space = Space::alloc(from_space_size().unwrap_or_else(|e| self.fatal(e)));
            self.to_space = Some(space);
        }

        let to_space = self.to_space.as_ref().unwrap();
        self.next = to_space.start;
        self.scan = to_space.start;
        self.limit = to_space.end();

        tracing::debug!(cycle = self.stats.gc_cycles, "gc cycle started");

        let mut roots = std::mem::replace(&mut self.roots, RootRegistry::new());
        roots.forward_all(|root| unsafe { self.forward(root) });
        self.roots = roots;
    }

    /// Continues the current cycle: scans `n` bytes worth of to-space, then reserves `n` bytes
    /// at the top of to-space for the new object.
    ///
    /// # Safety
    /// Must only be called while `self.gc_in_progress` is `true` (or about to become true via
    /// the `begin_gc` call already made by the caller).
    unsafe fn scan_and_alloc(&mut self, n: usize) -> ObjPtr {
        // Step 1: scan n bytes worth of to-space.
        let mut scanned = 0usize;

        while scanned < n && self.scan < self.next {
            let obj = ObjPtr(self.scan.cast());
            let field_count = unsafe { obj.field_count() };

            for idx in 0..field_count {
                let field_ptr = unsafe { obj.field(idx) };
                let field = unsafe { *field_ptr };

                if self.is_in_from_space(field) {
                    let forwarded = unsafe { self.forward(field) };
                    unsafe { ptr::write(field_ptr, forwarded) };
                }
            }

            let obj_size = unsafe { obj.size() };
            self.scan = unsafe { self.scan.byte_add(obj_size) };
            scanned += obj_size;
        }

        // Step 2: out-of-memory check, performed before `limit` is decreased. Checking after
        // would let `limit` run past `next` once it has already shrunk from earlier calls this
        // cycle, masking a real out-of-memory condition.
        if self.next.wrapping_byte_add(n) > self.limit || self.scan > self.next {
            self.fatal(GcError::OutOfMemory);
        }

        // Step 3: reserve the new object at the top of to-space.
        self.limit = unsafe { self.limit.byte_sub(n) };
        let result = ObjPtr(self.limit.cast());

        // Step 4: cycle completion.
        if self.scan >= self.next {
            self.gc_in_progress = false;
            std::mem::swap(&mut self.from_space, &mut self.to_space);
            tracing::debug!(cycle = self.stats.gc_cycles, "gc cycle completed, spaces swapped");
        }

        self.register_alloc(n);
        result
    }

    /// Forwards a pointer from the from-space to the to-space if necessary.
    ///
    /// Returns a pointer to the forwarded object, or `ptr` unchanged if forwarding does not
    /// apply: not in from-space, not record-like, or an object whose first field is null
    /// (reproduced as-is from the original collector's behavior).
    ///
    /// # Safety
    /// If `ptr` points into the from-space and is record-like, it must point to the start of a
    /// valid stella object with at least one field. The same requirement applies transitively to
    /// the contents of its fields.
    unsafe fn forward(&mut self, p: ObjPtr) -> ObjPtr {
        if !self.is_in_from_space(p) || !unsafe { p.tag() }.is_record_like() {
            return p;
        }

        let f1 = unsafe { *p.field(0) };

        if f1.is_null() {
            return p;
        }

        if self.is_in_to_space(f1) {
            return f1;
        }

        unsafe { self.chase(p) };
        unsafe { *p.field(0) }
    }

    /// Performs the iterative Cheney-with-chase walk, copying `p` and following one un-evacuated
    /// child per step to bound stack use on long pointer chains.
    ///
    /// # Safety
    /// `p` must point to the start of a valid, record-like stella object in the from-space with
    /// at least one field. The same requirement applies transitively to the contents of its
    /// fields.
    unsafe fn chase(&mut self, mut p: ObjPtr) {
        loop {
            let size = unsafe { p.size() };
            let dest = ObjPtr(self.next.cast());
            let next_after = self.next.wrapping_byte_add(size);

            if next_after > self.limit {
                self.fatal(GcError::OutOfMemory);
            }

            self.next = next_after;
            unsafe { ptr::copy_nonoverlapping(p.0.cast::<u8>(), dest.0.cast::<u8>(), size) };

            let mut successor = ObjPtr::NULL;
            let field_count = unsafe { p.field_count() };

            for idx in 0..field_count {
                let child = unsafe { *p.field(idx) };

                if self.is_in_from_space(child) && unsafe { child.tag() }.is_record_like() {
                    let child_first_field = unsafe { *child.field(0) };

                    if !self.is_in_to_space(child_first_field) {
                        // Only the last un-forwarded child found is pursued; the others are
                        // picked up later when the scan phase reaches the freshly copied `dest`,
                        // since `dest`'s fields still hold the pre-forwarding originals.
                        successor = child;
                    }
                }
            }

            // Field 0 of the copy still holds the original pre-forwarding value (the memcpy
            // above ran before this write), so a later scan of `dest` will forward it normally.
            unsafe { ptr::write(p.field(0), dest) };

            if successor.is_null() {
                break;
            }

            p = successor;
        }
    }

    /// Reads the value of a field of a stella object, forwarding it if necessary.
    ///
    /// # Safety
    /// `ptr` must point to a valid stella object. `field_idx` must be less than the field count.
    pub unsafe fn read_barrier(&mut self, ptr: ObjPtr, field_idx: usize) -> ObjPtr {
        self.stats.reads += 1;

        let mut result = unsafe { *ptr.field(field_idx) };

        if self.gc_in_progress && self.is_in_from_space(result) {
            result = unsafe { self.forward(result) };
            unsafe { ptr::write(ptr.field(field_idx), result) };
            self.stats.read_barriers += 1;
        }

        result
    }

    /// The write barrier is a no-op: incremental copying needs no generational or remembered-set
    /// write barrier. Retained as a call site for future extension and stats.
    pub fn write_barrier(&mut self, _ptr: ObjPtr, _field_idx: usize, _value: ObjPtr) {
        self.stats.writes += 1;
        self.stats.write_barriers += 1;
    }

    /// Returns `true` while a collection cycle is underway.
    pub fn gc_in_progress(&self) -> bool {
        self.gc_in_progress
    }

    /// Returns the number of completed (and, if one is underway, in-progress) collection cycles.
    pub fn gc_cycles(&self) -> usize {
        self.stats.gc_cycles
    }

    pub fn is_in_from_space(&self, p: ObjPtr) -> bool {
        self.from_space
            .as_ref()
            .is_some_and(|space| space.contains(p.0.cast()))
    }

    pub fn is_in_to_space(&self, p: ObjPtr) -> bool {
        self.to_space
            .as_ref()
            .is_some_and(|space| space.contains(p.0.cast()))
    }

    /// Returns `true` if `ptr` has been forwarded to the to-space.
    ///
    /// # Safety
    /// `ptr` must point to a valid stella object.
    pub unsafe fn is_forwarded(&self, ptr: ObjPtr) -> bool {
        unsafe { ptr.field_count() > 0 }
            && self.is_in_from_space(ptr)
            && self.is_in_to_space(unsafe { *ptr.field(0) })
    }

    /// Returns how much memory (in bytes) is used in the to-space.
    pub fn to_space_used_memory(&self) -> usize {
        let Some(to_space) = self.to_space.as_ref() else {
            return 0;
        };

        unsafe {
            to_space.end().byte_offset_from_unsigned(self.limit)
                + self.next.byte_offset_from_unsigned(to_space.start)
        }
    }

    /// Returns how much free memory remains before the next GC cycle begins.
    pub fn free_memory(&self) -> usize {
        if self.next.is_null() || self.limit.is_null() {
            return 0;
        }

        unsafe { self.limit.byte_offset_from_unsigned(self.next) }
    }

    /// Returns how much memory is used across both semi-spaces.
    pub fn used_memory(&self) -> usize {
        if self.gc_in_progress {
            let from_used = self.from_space.as_ref().map_or(0, |s| s.size);
            return from_used + self.to_space_used_memory();
        }

        let Some(from_space) = self.from_space.as_ref() else {
            return 0;
        };

        unsafe { self.next.byte_offset_from_unsigned(from_space.start) }
    }

    /// Counts whole stella objects laid out contiguously in `[start, end)`.
    fn count_objs(start: *mut u8, end: *mut u8) -> usize {
        let mut addr = start;
        let mut count = 0;

        while addr < end {
            let ptr = ObjPtr(addr.cast());
            count += 1;
            addr = unsafe { addr.byte_add(ptr.size()) };
        }

        count
    }

    /// Returns how many live objects are held in the to-space, mirroring
    /// [`Gc::to_space_used_memory`]'s byte accounting.
    pub fn to_space_used_objs(&self) -> usize {
        let Some(to_space) = self.to_space.as_ref() else {
            return 0;
        };

        Self::count_objs(to_space.start, self.next) + Self::count_objs(self.limit, to_space.end())
    }

    /// Returns how many live objects are held across both semi-spaces, mirroring
    /// [`Gc::used_memory`]'s byte accounting.
    pub fn used_objs(&self) -> usize {
        if self.gc_in_progress {
            let from_objs = self
                .from_space
                .as_ref()
                .map_or(0, |s| Self::count_objs(s.start, s.end()));
            return from_objs + self.to_space_used_objs();
        }

        let Some(from_space) = self.from_space.as_ref() else {
            return 0;
        };

        Self::count_objs(from_space.start, self.next)
    }

    /// Prints diagnostics (matching the order `original_source/gc.c`'s out-of-memory path uses)
    /// then aborts the process — out-of-memory and misconfiguration are both unrecoverable.
    fn fatal(&self, err: GcError) -> ! {
        tracing::error!(%err, "gc: fatal error");
        eprintln!("{err}");
        crate::diagnostics::print_alloc_stats(self);
        crate::diagnostics::print_roots(self);
        crate::diagnostics::print_state(self);
        panic!("{err}");
    }
}
