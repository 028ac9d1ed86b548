//! Definitions for the `extern "C"` symbols `stella_gc` expects its embedder to provide.
//!
//! Mirrors the layout `src/object.rs` assumes: the low 4 bits of an object header hold the tag,
//! the remaining bits (shifted right by 4) hold the field count.

use std::ffi::c_int;

#[unsafe(no_mangle)]
pub static TAG_MASK: c_int = 0xF;

#[unsafe(no_mangle)]
pub static FIELD_COUNT_MASK: c_int = !0xF;

/// Small enough that a few hundred allocations trigger a collection cycle, so tests can exercise
/// multiple cycles without allocating huge amounts of scratch memory, but with enough headroom
/// that the handful of live objects these tests root never come close to filling a semi-space on
/// their own.
#[unsafe(no_mangle)]
pub static FROM_SPACE_SIZE: u64 = 8192;

#[unsafe(no_mangle)]
pub static TO_SPACE_SIZE: u64 = 8192;

use stella_gc::{Gc, ObjPtr, StellaTag};

/// The byte size of the header word plus `field_count` fields, matching `ObjPtr::size`'s layout
/// assumption (`size_of::<*const c_void>()`-sized fields immediately after a 4-byte header,
/// rounded up by the allocator's own alignment).
pub fn obj_size(field_count: usize) -> usize {
    std::mem::size_of::<usize>() + field_count * std::mem::size_of::<*const ()>()
}

/// Allocates and initializes an object of the given tag and field count, with every field set to
/// `ObjPtr::NULL`. Returns the pointer backing the allocation; fields are filled in by the caller.
///
/// # Safety
/// Same as [`Gc::alloc`]: `gc` must not have another allocation or barrier call in progress.
pub unsafe fn alloc_obj(gc: &mut Gc, tag: StellaTag, field_count: usize) -> ObjPtr {
    let ptr = unsafe { gc.alloc(obj_size(field_count)) };
    unsafe { ptr.write_header(tag, field_count) };

    for idx in 0..field_count {
        unsafe { ptr.write_field(idx, ObjPtr::NULL) };
    }

    ptr
}

/// Allocates a `Cons` cell `(head, tail)`.
///
/// # Safety
/// Same as [`alloc_obj`].
pub unsafe fn cons(gc: &mut Gc, head: ObjPtr, tail: ObjPtr) -> ObjPtr {
    let ptr = unsafe { alloc_obj(gc, StellaTag::Cons, 2) };
    unsafe {
        ptr.write_field(0, head);
        ptr.write_field(1, tail);
    }
    ptr
}

/// Allocates an `Empty` (nil) list cell.
///
/// Record-like objects must carry at least one field for the forwarding trick (field 0 doubles
/// as the forwarding pointer once copied), so `Empty` gets a single unused field rather than zero.
///
/// # Safety
/// Same as [`alloc_obj`].
pub unsafe fn nil(gc: &mut Gc) -> ObjPtr {
    unsafe { alloc_obj(gc, StellaTag::Empty, 1) }
}

/// Allocates a throwaway `Unit` value, used as garbage padding to force a collection cycle.
///
/// `Unit` is record-like, so (like `Empty`) it needs at least one field even though nothing ever
/// reads it.
///
/// # Safety
/// Same as [`alloc_obj`].
pub unsafe fn unit(gc: &mut Gc) -> ObjPtr {
    unsafe { alloc_obj(gc, StellaTag::Unit, 1) }
}

/// Allocates garbage until a collection cycle has started, without necessarily finishing it.
///
/// Drives the fast bump allocator to exhaustion rather than relying on a precomputed byte count,
/// so it stays correct regardless of how large the caller's own live data is.
///
/// # Safety
/// Same as [`alloc_obj`].
pub unsafe fn force_cycle_start(gc: &mut Gc) {
    while !gc.gc_in_progress() {
        unsafe { unit(gc) };
    }
}

/// Allocates garbage until a collection cycle has started and then completed.
///
/// # Safety
/// Same as [`alloc_obj`].
pub unsafe fn force_cycle_completion(gc: &mut Gc) {
    unsafe { force_cycle_start(gc) };

    while gc.gc_in_progress() {
        unsafe { unit(gc) };
    }
}
