use std::ffi::c_int;
use std::mem::{self, offset_of};
use std::ptr;

use crate::FIELD_COUNT_MASK;
use crate::TAG_MASK;

pub(crate) const FIELD_SIZE: usize = mem::size_of::<*const std::ffi::c_void>();

/// The alignment of allocated objects.
pub(crate) const ALIGNMENT: usize = const {
    // why Ord::max no const T_T (rhetorical question)
    let obj_align = mem::align_of::<StellaObj>();

    if obj_align > 8 { obj_align } else { 8 }
};

/// A FFI-compatible definition of `stella_object`.
#[repr(C)]
pub(crate) struct StellaObj {
    header: c_int,
    fields: [ObjPtr; 0],
}

/// A FFI-compatible definition of `enum TAG`.
#[repr(C)]
#[derive(strum::FromRepr, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum StellaTag {
    Zero,
    Succ,
    False,
    True,
    Fn,
    Ref,
    Unit,
    Tuple,
    Inl,
    Inr,
    Empty,
    Cons,
}

impl StellaTag {
    /// Whether objects of this tag may hold managed pointers in their fields.
    ///
    /// Per the data model, zero/successor/false/true are scalar-like and are never traced —
    /// in particular, chains of successors are deliberately not traced through even though a
    /// `Succ` cell carries one field.
    pub fn is_record_like(self) -> bool {
        matches!(
            self,
            StellaTag::Fn
                | StellaTag::Ref
                | StellaTag::Unit
                | StellaTag::Tuple
                | StellaTag::Inl
                | StellaTag::Inr
                | StellaTag::Empty
                | StellaTag::Cons
        )
    }
}

/// An enumeration of possible kinds of stella object fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StellaFieldKind {
    /// The field holds a pointer to another stella object.
    Obj,

    /// The field holds an arbitrary pointer.
    Raw,

    /// The field is not supposed to be there at all.
    Invalid,
}

impl StellaTag {
    /// Classifies a field (with the given 0-based `idx`) of a stella object with this tag, for
    /// diagnostic display only.
    pub(crate) fn field_kind(self, idx: usize) -> StellaFieldKind {
        match self {
            StellaTag::Zero => StellaFieldKind::Invalid,

            StellaTag::Succ if idx == 0 => StellaFieldKind::Obj,
            StellaTag::Succ => StellaFieldKind::Invalid,

            StellaTag::False => StellaFieldKind::Invalid,
            StellaTag::True => StellaFieldKind::Invalid,

            StellaTag::Fn if idx == 0 => StellaFieldKind::Raw,
            StellaTag::Fn => StellaFieldKind::Obj,

            StellaTag::Ref if idx == 0 => StellaFieldKind::Obj,
            StellaTag::Ref => StellaFieldKind::Invalid,

            StellaTag::Unit => StellaFieldKind::Invalid,

            StellaTag::Tuple => StellaFieldKind::Obj,

            StellaTag::Inl if idx == 0 => StellaFieldKind::Obj,
            StellaTag::Inl => StellaFieldKind::Invalid,

            StellaTag::Inr if idx == 0 => StellaFieldKind::Obj,
            StellaTag::Inr => StellaFieldKind::Invalid,

            StellaTag::Empty => StellaFieldKind::Invalid,

            StellaTag::Cons if idx < 2 => StellaFieldKind::Obj,
            StellaTag::Cons => StellaFieldKind::Invalid,
        }
    }
}

/// A wrapper around a pointer to a stella object.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjPtr(pub(crate) *mut StellaObj);

impl ObjPtr {
    /// A null object pointer.
    pub const NULL: ObjPtr = ObjPtr(std::ptr::null_mut());

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Returns the number of fields in the object.
    ///
    /// # Safety
    /// The underlying pointer must point to a valid object.
    pub unsafe fn field_count(self) -> usize {
        let header = unsafe { (*self.0).header } as usize;

        (header & unsafe { FIELD_COUNT_MASK as usize }) >> 4
    }

    /// Returns the tag of the object.
    ///
    /// # Safety
    /// The underlying pointer must point to a valid object.
    pub unsafe fn tag(self) -> StellaTag {
        let header = unsafe { (*self.0).header } as usize;
        let tag = header & unsafe { TAG_MASK as usize };

        StellaTag::from_repr(tag).unwrap()
    }

    /// Returns the size of the object (counting both the header and the fields).
    ///
    /// # Safety
    /// The underlying pointer must point to a valid object.
    pub unsafe fn size(self) -> usize {
        let field_count = unsafe { self.field_count() };

        offset_of!(StellaObj, fields) + field_count * FIELD_SIZE
    }

    /// Computes a pointer to a field with the given index.
    ///
    /// # Safety
    /// The underlying pointer must point to a valid object, and the `idx` must not exceed the
    /// field count.
    pub unsafe fn field(self, idx: usize) -> *mut ObjPtr {
        unsafe {
            self.0
                .byte_add(offset_of!(StellaObj, fields) + idx * FIELD_SIZE)
                .cast()
        }
    }

    /// Writes this object's header, encoding `tag` and `field_count` using the same bit layout
    /// `field_count`/`tag` read back (field count in the high bits, shifted by 4; tag in the low
    /// bits). Used by mutator-side code (and tests standing in for one) to initialize a freshly
    /// allocated object before the next allocation or barrier call, per the `alloc` contract.
    ///
    /// # Safety
    /// The underlying pointer must be backed by at least `header_size + field_count * slot_size`
    /// writable bytes.
    pub unsafe fn write_header(self, tag: StellaTag, field_count: usize) {
        let header = (tag as usize) | (field_count << 4);
        unsafe { (*self.0).header = header as c_int };
    }

    /// Writes the value of a field, without going through the write barrier.
    ///
    /// # Safety
    /// The underlying pointer must point to a valid object and `idx` must not exceed the field
    /// count.
    pub unsafe fn write_field(self, idx: usize, value: ObjPtr) {
        unsafe { ptr::write(self.field(idx), value) };
    }
}

/// Rounds `size` up so it has the given alignment.
pub(crate) fn align_up(size: usize, align: usize) -> usize {
    let misalignment = size % align;

    size + if misalignment > 0 {
        align - misalignment
    } else {
        0
    }
}

/// Rounds `size` down so it has the given alignment.
pub(crate) fn align_down(size: usize, align: usize) -> usize {
    size - size % align
}
