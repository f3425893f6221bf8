//! First-fit free-list heap allocator backed by `sys::sbrk`.
//!
//! A direct translation of `original_source/bin/malloc.h`'s block-header
//! scheme (size/free/next, forward-coalesce on free, split-on-alloc when
//! the remainder is big enough for another header) into a `GlobalAlloc`
//! impl, so ordinary programs can use `alloc::{String, Vec, format!}`
//! instead of hand-rolling the header walk the reference programs did.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use spin::Mutex;

use crate::sys;

struct Block {
    size: usize,
    free: bool,
    next: *mut Block,
}

const BLOCK_HDR: usize = core::mem::size_of::<Block>();

struct FreeList {
    head: *mut Block,
}

// SAFETY: user-space programs on this OS are single-threaded; the `Mutex`
// below exists only to give `FreeList` a `'static` home `GlobalAlloc` can
// share, not to coordinate real concurrent access.
unsafe impl Send for FreeList {}

impl FreeList {
    const fn new() -> Self {
        FreeList { head: ptr::null_mut() }
    }

    unsafe fn alloc(&mut self, size: usize) -> *mut u8 {
        let size = (size + 3) & !3;

        let mut prev: *mut Block = ptr::null_mut();
        let mut cur = self.head;
        while !cur.is_null() {
            // SAFETY: every pointer in the list was either set up by this
            // function or inherited from `sbrk`-backed memory it owns.
            let block = unsafe { &mut *cur };
            if block.free && block.size >= size {
                if block.size >= size + BLOCK_HDR + 4 {
                    // SAFETY: `cur` points at a live block with at least
                    // `size` bytes of payload plus room for a split tail.
                    let tail = unsafe { (cur as *mut u8).add(BLOCK_HDR + size) } as *mut Block;
                    // SAFETY: `tail` lies entirely within the block being
                    // split and is not yet aliased by any other pointer.
                    unsafe {
                        (*tail).size = block.size - size - BLOCK_HDR;
                        (*tail).free = true;
                        (*tail).next = block.next;
                    }
                    block.next = tail;
                    block.size = size;
                }
                block.free = false;
                // SAFETY: payload immediately follows the header.
                return unsafe { (cur as *mut u8).add(BLOCK_HDR) };
            }
            prev = cur;
            cur = block.next;
        }

        let needed = (BLOCK_HDR + size) as i32;
        let old_break = sys::sbrk(needed);
        if old_break < 0 {
            return ptr::null_mut();
        }
        let new_block = old_break as *mut Block;
        // SAFETY: `sbrk` just mapped this region exclusively for this call.
        unsafe {
            (*new_block).size = size;
            (*new_block).free = false;
            (*new_block).next = ptr::null_mut();
        }

        if self.head.is_null() {
            self.head = new_block;
        } else if !prev.is_null() {
            // SAFETY: `prev` is the last block visited in the walk above.
            unsafe { (*prev).next = new_block };
        }

        // SAFETY: payload immediately follows the header.
        unsafe { (new_block as *mut u8).add(BLOCK_HDR) }
    }

    unsafe fn dealloc(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: `ptr` was handed out by `alloc` above, so the header
        // immediately precedes it.
        let block = unsafe { ptr.sub(BLOCK_HDR) } as *mut Block;
        // SAFETY: see above.
        unsafe {
            (*block).free = true;
            while !(*block).next.is_null() && (*(*block).next).free {
                let next = (*block).next;
                (*block).size += BLOCK_HDR + (*next).size;
                (*block).next = (*next).next;
            }
        }
    }
}

static HEAP: Mutex<FreeList> = Mutex::new(FreeList::new());

pub struct SbrkAllocator;

unsafe impl GlobalAlloc for SbrkAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size().max(layout.align());
        // SAFETY: delegated to `FreeList::alloc`, which upholds the same
        // contract `GlobalAlloc::alloc` requires of its caller.
        unsafe { HEAP.lock().alloc(size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        // SAFETY: delegated to `FreeList::dealloc`.
        unsafe { HEAP.lock().dealloc(ptr) };
    }
}

#[global_allocator]
static ALLOCATOR: SbrkAllocator = SbrkAllocator;

#[alloc_error_handler]
fn alloc_error(layout: Layout) -> ! {
    crate::println!("PANIC: out of memory allocating {layout:?}");
    crate::sys::exit(255);
}
