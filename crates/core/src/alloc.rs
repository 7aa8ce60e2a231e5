//! tree-sitter allocator hook.
//!
//! On `wasm32-unknown-unknown`, tree-sitter is compiled against small libc shims whose
//! `malloc`/`free` have been seen to corrupt memory when a `Tree` is dropped from a JS host. On
//! that target we route tree-sitter's allocations through Rust's global allocator instead. Every
//! other target keeps tree-sitter's defaults and [`ensure_tree_sitter_allocator`] is a no-op.

#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_tree_sitter_allocator() {}

#[cfg(target_arch = "wasm32")]
pub fn ensure_tree_sitter_allocator() {
    static INSTALL: std::sync::Once = std::sync::Once::new();

    INSTALL.call_once(|| {
        // SAFETY: installed exactly once, before any parser is created on this thread.
        unsafe {
            tree_sitter::set_allocator(
                Some(rust_heap::malloc),
                Some(rust_heap::calloc),
                Some(rust_heap::realloc),
                Some(rust_heap::free),
            );
        }
    });
}

/// C allocator entry points backed by `std::alloc`.
///
/// Each block is prefixed with a `usize` header holding the caller-visible size, so `free` and
/// `realloc` can rebuild the original `Layout`.
#[cfg(target_arch = "wasm32")]
mod rust_heap {
    use core::ffi::c_void;
    use core::ptr;
    use std::alloc::{Layout, alloc, dealloc};

    const ALIGN: usize = 16;
    const HEADER: usize = core::mem::size_of::<usize>();

    fn layout_for(size: usize) -> Option<Layout> {
        let total = size.checked_add(HEADER)?;
        Layout::from_size_align(total, ALIGN).ok()
    }

    /// Recover the block base and stored size from a pointer handed out by [`malloc`].
    unsafe fn block_of(user: *mut c_void) -> (*mut u8, usize) {
        // SAFETY: `user` came from `malloc`, which reserves `HEADER` bytes before it.
        unsafe {
            let base = (user as *mut u8).sub(HEADER);
            (base, (base as *const usize).read())
        }
    }

    pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
        if size == 0 {
            return ptr::null_mut();
        }
        let Some(layout) = layout_for(size) else {
            return ptr::null_mut();
        };
        // SAFETY: layout has non-zero size.
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            return ptr::null_mut();
        }
        // SAFETY: the block is at least `HEADER` bytes and aligned for `usize`.
        unsafe {
            (base as *mut usize).write(size);
            base.add(HEADER) as *mut c_void
        }
    }

    pub unsafe extern "C" fn calloc(count: usize, size: usize) -> *mut c_void {
        let Some(total) = count.checked_mul(size) else {
            return ptr::null_mut();
        };
        let user = unsafe { malloc(total) };
        if !user.is_null() {
            unsafe { ptr::write_bytes(user as *mut u8, 0, total) };
        }
        user
    }

    pub unsafe extern "C" fn free(user: *mut c_void) {
        if user.is_null() {
            return;
        }
        let (base, size) = unsafe { block_of(user) };
        if let Some(layout) = layout_for(size) {
            unsafe { dealloc(base, layout) };
        }
    }

    pub unsafe extern "C" fn realloc(user: *mut c_void, new_size: usize) -> *mut c_void {
        if user.is_null() {
            return unsafe { malloc(new_size) };
        }
        if new_size == 0 {
            unsafe { free(user) };
            return ptr::null_mut();
        }

        let (_, old_size) = unsafe { block_of(user) };
        let moved = unsafe { malloc(new_size) };
        if !moved.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(
                    user as *const u8,
                    moved as *mut u8,
                    old_size.min(new_size),
                );
                free(user);
            }
        }
        moved
    }
}
