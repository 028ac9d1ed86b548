use std::fmt::{self, Display};

use crate::gc::Gc;
use crate::object::{ObjPtr, StellaFieldKind};
use crate::space::SpaceClass;

impl Gc {
    /// Determines the space class of the pointer.
    pub(crate) fn classify_space(&self, ptr: ObjPtr) -> SpaceClass {
        if let Some(from_space) = &self.from_space
            && from_space.contains(ptr.0.cast())
        {
            return SpaceClass::From {
                offset: unsafe { ptr.0.cast::<u8>().byte_offset_from_unsigned(from_space.start) },
            };
        }

        if let Some(to_space) = &self.to_space
            && to_space.contains(ptr.0.cast())
        {
            return SpaceClass::To {
                offset: unsafe { ptr.0.cast::<u8>().byte_offset_from_unsigned(to_space.start) },
            };
        }

        SpaceClass::Unmanaged
    }

    /// Formats a stella object.
    ///
    /// If `display_fields` is `false`, the object's fields are elided from the output.
    ///
    /// # Safety
    /// `ptr` must point to a valid stella object when [`Display::fmt`] is called.
    pub(crate) unsafe fn display_obj(&self, ptr: ObjPtr, display_fields: bool) -> impl Display {
        struct Fmt<'a> {
            gc: &'a Gc,
            ptr: ObjPtr,
            display_fields: bool,
        }

        impl Display for Fmt<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let tag = unsafe { self.ptr.tag() };
                let addr = self.ptr.0;

                let space = self.gc.classify_space(self.ptr);
                let name = tag.to_string();
                let size = unsafe { self.ptr.size() };
                write!(f, "<{name} @ {addr:?} ({space}, {size} B)> {{")?;

                match unsafe { self.ptr.field_count() } {
                    0 => write!(f, "}}"),
                    _ if !self.display_fields => write!(f, "...}}"),

                    field_count => {
                        for idx in 0..field_count {
                            if idx > 0 {
                                write!(f, ", ")?;
                            } else {
                                write!(f, " ")?;
                            }

                            let field = unsafe { *self.ptr.field(idx) };
                            let field_addr = field.0;
                            let field_space = self.gc.classify_space(field);

                            match tag.field_kind(idx) {
                                _ if idx == 0 && unsafe { self.gc.is_forwarded(self.ptr) } => {
                                    write!(f, "#{field_addr:?} ({field_space}, fwd)")?
                                }

                                StellaFieldKind::Raw => {
                                    write!(f, "#{field_addr:?} ({field_space})")?
                                }

                                StellaFieldKind::Invalid => write!(
                                    f,
                                    "#{field_addr:?} ({field_space}, **UNEXPECTED FIELD**)",
                                )?,

                                StellaFieldKind::Obj => {
                                    write!(f, "{}", unsafe { self.gc.display_obj(field, false) })?
                                }
                            }
                        }

                        write!(f, " }}")
                    }
                }
            }
        }

        Fmt {
            gc: self,
            ptr,
            display_fields,
        }
    }
}

/// Prints allocation statistics.
pub(crate) fn print_alloc_stats(gc: &Gc) {
    eprintln!(
        "  - All-time allocated: {} B ({} objects)",
        gc.stats.all_time_allocated, gc.stats.all_time_allocated_objs,
    );
    eprintln!("  - Used:");
    eprintln!(
        "    - Currently {} B ({} objects)",
        gc.used_memory(),
        gc.used_objs(),
    );
    eprintln!(
        "    - Max: {} B ({} objects)",
        gc.stats.max_used, gc.stats.max_used_objs,
    );
    eprintln!(
        "  - GC cycles: {}{}",
        gc.stats.gc_cycles,
        if gc.gc_in_progress {
            " (currently in progress)"
        } else {
            ""
        },
    );
    eprintln!(
        "  - Reads: {} ({} barriers)",
        gc.stats.reads, gc.stats.read_barriers
    );
    eprintln!(
        "  - Writes: {} ({} barriers)",
        gc.stats.writes, gc.stats.write_barriers
    );
}

/// Prints the full GC state: both semi-spaces' contents, cursor positions, and root list.
pub(crate) fn print_state(gc: &Gc) {
    eprintln!("GC state:");

    if let Some(from_space) = &gc.from_space {
        let start = from_space.start;
        let end = from_space.end();

        eprintln!("  - From-space ({start:?}..{end:?}):");

        let mut addr = start;
        let scan_limit = if gc.gc_in_progress { end } else { gc.next };

        while addr < scan_limit {
            let ptr = ObjPtr(addr.cast());
            let offset = unsafe { addr.byte_offset_from_unsigned(start) };
            eprintln!("    - {addr:?} (from-space{offset:+}): {}", unsafe {
                gc.display_obj(ptr, true)
            });
            addr = unsafe { addr.byte_add(ptr.size()) };
        }

        eprintln!();
    }

    if let Some(to_space) = &gc.to_space {
        let start = to_space.start;
        let end = to_space.end();
        eprintln!("  - To-space ({start:?}..{end:?}):");

        let mut addr = start;

        while addr < gc.next {
            let ptr = ObjPtr(addr.cast());
            let offset = unsafe { addr.byte_offset_from_unsigned(start) };
            eprintln!("    - {addr:?} (to-space{offset:+}): {}", unsafe {
                gc.display_obj(ptr, true)
            });
            addr = unsafe { addr.byte_add(ptr.size()) };
        }

        let free_start = gc.next;
        let free_end = gc.limit;

        if gc.gc_in_progress && free_start < free_end {
            eprintln!("    - {free_start:?}..{free_end:?} free");
        }

        if gc.gc_in_progress {
            addr = gc.limit;

            while addr < end {
                let ptr = ObjPtr(addr.cast());
                let offset = unsafe { addr.byte_offset_from_unsigned(start) };
                eprintln!("    - {addr:?} (to-space{offset:+}): {}", unsafe {
                    gc.display_obj(ptr, true)
                });
                addr = unsafe { addr.byte_add(ptr.size()) };
            }
        }
    }

    eprintln!();

    if gc.gc_in_progress {
        eprintln!("  - Garbage collection currently in progress:");
        eprintln!("    - Scan pointer: {:?}", gc.scan);
        eprintln!("    - Next pointer: {:?}", gc.next);
        eprintln!("    - Limit pointer: {:?}", gc.limit);
    } else {
        eprintln!("  - Garbage collection currently not running");
    }

    eprintln!();
    print_roots(gc);

    eprintln!();
    eprintln!("  - Currently used: {} B", gc.used_memory());

    if let Some(from_space) = &gc.from_space {
        eprintln!(
            "    - From-space: {} B / {} B used, {} B free",
            gc.used_memory().min(from_space.size),
            from_space.size,
            gc.free_memory(),
        );
    }

    if let Some(to_space) = &gc.to_space {
        eprintln!(
            "    - To-space: {} B / {} B used, {} B free",
            gc.to_space_used_memory(),
            to_space.size,
            to_space.size.saturating_sub(gc.to_space_used_memory()),
        );
    }

    eprintln!();
}

/// Prints the root list as an ASCII table of `(index, node-addr, prev, next, slot-addr, *slot)`.
pub(crate) fn print_roots(gc: &Gc) {
    if gc.roots.len() == 0 {
        eprintln!("  - Roots: (none)");
        return;
    }

    eprintln!("  - Roots:");
    eprintln!(
        "    {:>5} | {:>14} | {:>14} | {:>14} | {:>14} | value",
        "index", "node", "prev", "next", "slot"
    );

    for entry in gc.roots.diagnostic_entries() {
        let addr = entry.value.0;

        if gc.classify_space(entry.value) == SpaceClass::Unmanaged && !addr.is_null() {
            eprintln!(
                "    {:>5} | {:>14?} | {:>14?} | {:>14?} | {:>14?} | **ILLEGAL** {addr:?} (unmanaged)",
                entry.index, entry.node, entry.prev, entry.next, entry.slot,
            );
        } else {
            eprintln!(
                "    {:>5} | {:>14?} | {:>14?} | {:>14?} | {:>14?} | {}",
                entry.index,
                entry.node,
                entry.prev,
                entry.next,
                entry.slot,
                unsafe { gc.display_obj(entry.value, true) },
            );
        }
    }
}
