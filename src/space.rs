use std::alloc::{Layout, alloc, dealloc};
use std::ptr;

use crate::object::ALIGNMENT;
use crate::object::align_down;

/// A contiguous bounded chunk of memory; one of the two semi-spaces managed by the GC.
///
/// The memory is automatically deallocated once it's dropped.
#[derive(Default, Debug)]
pub(crate) struct Space {
    pub(crate) start: *mut u8,
    pub(crate) size: usize,
}

impl Space {
    /// Allocates a new semi-space no larger than `size`.
    pub(crate) fn alloc(size: usize) -> Self {
        let size = align_down(size.max(1), ALIGNMENT);

        if size == 0 {
            Self {
                start: ptr::null_mut(),
                size: 0,
            }
        } else {
            let layout = unsafe { Layout::from_size_align_unchecked(size, ALIGNMENT) };
            let start = unsafe { alloc(layout) };

            Self { start, size }
        }
    }

    /// Returns the pointer one past the last byte belonging to this semi-space.
    pub(crate) fn end(&self) -> *mut u8 {
        unsafe { self.start.byte_add(self.size) }
    }

    /// Checks if a pointer points to this semi-space.
    ///
    /// Note that `contains(end())` returns `false`.
    pub(crate) fn contains(&self, ptr: *mut u8) -> bool {
        !ptr.is_null() && (self.start..self.end()).contains(&ptr)
    }
}

impl Drop for Space {
    fn drop(&mut self) {
        if !self.start.is_null() {
            let layout = unsafe { Layout::from_size_align_unchecked(self.size, ALIGNMENT) };
            unsafe { dealloc(self.start, layout) };
            self.start = ptr::null_mut();
        }
    }
}

/// An enumeration of memory regions addresses may belong to.
#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpaceClass {
    /// A from-space.
    #[strum(to_string = "from{offset:+}")]
    From {
        /// An offset from the start of the from-space.
        offset: usize,
    },

    /// A to-space.
    #[strum(to_string = "to{offset:+}")]
    To {
        /// An offset from the start of the to-space.
        offset: usize,
    },

    /// Memory not managed by the GC.
    #[strum(to_string = "unmanaged")]
    Unmanaged,
}
