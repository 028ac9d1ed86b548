//! GC core for a small functional language runtime ("Stella"): a semi-space copying collector in
//! the incremental Baker / Cheney-with-chase style. Each allocation performed during a collection
//! cycle does a bounded amount of scan work, and the mutator only ever observes forwarded
//! (to-space) pointers through the read barrier.
//!
//! The mutator — interpreter or compiled code — only talks to this crate through the
//! `extern "C"` entry points below (allocation, the two barriers, root push/pop) and the three
//! diagnostic dumps.

mod diagnostics;
mod error;
mod gc;
mod object;
mod roots;
mod space;
mod stats;

use std::ffi::{c_int, c_void};
use std::sync::{LazyLock, Mutex};

use nounwind::nounwind;

pub use error::GcError;
pub use gc::Gc;
pub use object::{ObjPtr, StellaTag};

unsafe extern "C" {
    static FIELD_COUNT_MASK: c_int;
    static TAG_MASK: c_int;

    /// Size, in bytes, of the from-space. Must equal `TO_SPACE_SIZE`.
    static FROM_SPACE_SIZE: u64;

    /// Size, in bytes, of the to-space. Must equal `FROM_SPACE_SIZE`.
    static TO_SPACE_SIZE: u64;
}

/// A global instance of the garbage collector.
static GC: LazyLock<Mutex<gc::Gc>> = LazyLock::new(|| Mutex::new(gc::Gc::new()));

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn gc_alloc(size_in_bytes: usize) -> *mut c_void {
    unsafe { GC.lock().unwrap().alloc(size_in_bytes) }.0.cast()
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn gc_read_barrier(obj: ObjPtr, field_idx: c_int) -> *mut c_void {
    let result = unsafe {
        GC.lock()
            .unwrap()
            .read_barrier(obj, field_idx.try_into().unwrap())
    };

    result.0.cast()
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn gc_write_barrier(obj: ObjPtr, field_idx: c_int, value: ObjPtr) {
    GC.lock()
        .unwrap()
        .write_barrier(obj, field_idx.try_into().unwrap(), value);
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn gc_push_root(root: *mut ObjPtr) {
    GC.lock().unwrap().push_root(root);
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn gc_pop_root(root: *mut ObjPtr) {
    GC.lock().unwrap().pop_root(root);
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn print_gc_alloc_stats() {
    diagnostics::print_alloc_stats(&GC.lock().unwrap());
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn print_gc_state() {
    diagnostics::print_state(&GC.lock().unwrap());
}

#[unsafe(no_mangle)]
#[nounwind]
pub unsafe extern "C" fn print_gc_roots() {
    diagnostics::print_roots(&GC.lock().unwrap());
}
