//! Two-level x86 paging: one shared kernel page directory plus a private
//! page directory per process.
//!
//! There is no original C implementation to ground this file on — the
//! reference kernel ran without paging at all. The layout below comes
//! straight from the memory-management design: PDE[0] is a 4KB-page kernel
//! page table identity-mapping the first 4MB (VGA's `0xA0000..0xC0000`
//! marked user-accessible for graphics programs), PDE[1..511] are 4MB PSE
//! supervisor identity mappings giving the kernel a flat view of all managed
//! physical memory, and every process page directory additionally carries
//! a private PDE[1] user page table covering `[0x400000, 0x800000)`.

use bitflags::bitflags;
use x86::controlregs::{self, Cr0, Cr4};

use crate::config::{VGA_GFX_BASE, VGA_GFX_END};
use crate::mm::frame_allocator::{FrameAllocator, FrameAllocatorError};

const ENTRIES: usize = 1024;
const PAGE_SIZE: u32 = 4096;
const LARGE_PAGE_SIZE: u32 = 4 * 1024 * 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PtFlags: u32 {
        const PRESENT  = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER     = 1 << 2;
        const ACCESSED = 1 << 5;
        const DIRTY    = 1 << 6;
        const HUGE     = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    OutOfMemory,
    NotPresent,
}

pub type Result<T> = core::result::Result<T, PagingError>;

impl From<FrameAllocatorError> for PagingError {
    fn from(_: FrameAllocatorError) -> Self {
        PagingError::OutOfMemory
    }
}

#[derive(Clone, Copy)]
#[repr(transparent)]
struct Entry(u32);

impl Entry {
    const fn empty() -> Self {
        Self(0)
    }

    fn set(&mut self, frame_addr: u32, flags: PtFlags) {
        self.0 = (frame_addr & !0xFFF) | flags.bits();
    }

    fn is_present(&self) -> bool {
        self.0 & PtFlags::PRESENT.bits() != 0
    }
}

#[repr(C, align(4096))]
struct Table {
    entries: [Entry; ENTRIES],
}

impl Table {
    const fn empty() -> Self {
        Self { entries: [Entry::empty(); ENTRIES] }
    }
}

/// A 4KB-aligned page table used for the identity-mapped first 4MB, shared
/// by the kernel directory and by every process directory's PDE[0].
#[repr(C, align(4096))]
struct KernelPt(Table);

/// The kernel's own page directory, installed once at boot and never
/// swapped out (user processes get their own directory; the kernel PT is
/// shared into every one of them via PDE[0]).
#[repr(C, align(4096))]
struct KernelPd(Table);

static mut KERNEL_PT: KernelPt = KernelPt(Table::empty());
static mut KERNEL_PD: KernelPd = KernelPd(Table::empty());

fn kernel_pt_page_flags(vaddr: u32) -> PtFlags {
    let mut flags = PtFlags::PRESENT | PtFlags::WRITABLE;
    if vaddr >= VGA_GFX_BASE && vaddr < VGA_GFX_END {
        flags |= PtFlags::USER;
    }
    flags
}

fn pse_identity_entry(pde_index: usize) -> Entry {
    let mut entry = Entry::empty();
    let frame_addr = (pde_index as u32) * LARGE_PAGE_SIZE;
    entry.set(frame_addr, PtFlags::PRESENT | PtFlags::WRITABLE | PtFlags::HUGE);
    entry
}

/// Builds the kernel page table (0-4MB identity) and the kernel page
/// directory (PDE[0] -> that table, PDE[1..511] -> 4MB PSE identity
/// mappings), but does not enable paging yet.
///
/// # Safety
/// Must run exactly once, before `enable`, with interrupts disabled.
pub unsafe fn build_kernel_directory() {
    // SAFETY: caller guarantees single-threaded, pre-paging context; these
    // statics are 4KB-aligned and not yet referenced by any live CR3.
    unsafe {
        for i in 0..ENTRIES {
            let vaddr = (i as u32) * PAGE_SIZE;
            KERNEL_PT.0.entries[i].set(vaddr, kernel_pt_page_flags(vaddr));
        }

        let kernel_pt_addr = core::ptr::addr_of!(KERNEL_PT) as u32;
        KERNEL_PD.0.entries[0].set(kernel_pt_addr, PtFlags::PRESENT | PtFlags::WRITABLE);
        for i in 1..ENTRIES {
            KERNEL_PD.0.entries[i] = pse_identity_entry(i);
        }
    }
}

/// Physical address of the kernel page directory (identity-equal to its
/// virtual address, since it lives in the always-identity-mapped low 4MB).
pub fn kernel_directory_addr() -> u32 {
    // SAFETY: reading the address of a static is always sound.
    unsafe { core::ptr::addr_of!(KERNEL_PD) as u32 }
}

fn kernel_pt_addr() -> u32 {
    // SAFETY: reading the address of a static is always sound.
    unsafe { core::ptr::addr_of!(KERNEL_PT) as u32 }
}

/// Enables protected-mode paging: loads CR3 with the kernel directory, sets
/// CR4.PSE so the `HUGE` bit in PDE[1..511] is honored, then sets CR0.PG.
///
/// # Safety
/// `build_kernel_directory` must already have run. Must be called once,
/// very early in boot, with no other memory-management invariant yet relied
/// upon by running code.
pub unsafe fn enable() {
    // SAFETY: writes the standard x86 control registers in the documented
    // order (CR3 before CR0.PG), per the caller's stated preconditions.
    unsafe {
        controlregs::cr3_write(kernel_directory_addr() as u64);
        let mut cr4 = controlregs::cr4();
        cr4.insert(Cr4::CR4_ENABLE_PSE);
        controlregs::cr4_write(cr4);
        let mut cr0 = controlregs::cr0();
        cr0.insert(Cr0::CR0_ENABLE_PAGING);
        controlregs::cr0_write(cr0);
    }
}

/// A process's private address space: its own page directory plus its own
/// user page table for `[0x400000, 0x800000)`. PDE[0] and PDE[2..511] are
/// copies of the kernel directory's shared/identity entries.
pub struct ProcessDirectory {
    pd_phys: u32,
    user_pt_phys: u32,
}

impl ProcessDirectory {
    pub fn pd_phys(&self) -> u32 {
        self.pd_phys
    }

    pub fn user_pt_phys(&self) -> u32 {
        self.user_pt_phys
    }

    /// Maps virtual page `vpn` (index into the `[0x400000, 0x800000)`
    /// region) to physical frame `frame_addr` in this process's user PT.
    pub fn map_user_page(&self, vpn: usize, frame_addr: u32, writable: bool) -> Result<()> {
        if vpn >= ENTRIES {
            return Err(PagingError::NotPresent);
        }
        let mut flags = PtFlags::PRESENT | PtFlags::USER;
        if writable {
            flags |= PtFlags::WRITABLE;
        }
        // SAFETY: `user_pt_phys` was allocated as a private, uniquely-owned
        // frame and is identity-mapped in the kernel's always-resident PSE
        // range, so writing through it as a `*mut Table` is sound.
        unsafe {
            let table = self.user_pt_phys as *mut Table;
            (*table).entries[vpn].set(frame_addr, flags);
        }
        Ok(())
    }

    pub fn unmap_user_page(&self, vpn: usize) -> Result<()> {
        if vpn >= ENTRIES {
            return Err(PagingError::NotPresent);
        }
        // SAFETY: see `map_user_page`.
        unsafe {
            let table = self.user_pt_phys as *mut Table;
            (*table).entries[vpn] = Entry::empty();
        }
        Ok(())
    }

    pub fn user_page_frame(&self, vpn: usize) -> Option<u32> {
        if vpn >= ENTRIES {
            return None;
        }
        // SAFETY: see `map_user_page`; read-only access.
        let entry = unsafe { (*(self.user_pt_phys as *const Table)).entries[vpn] };
        entry.is_present().then_some(entry.0 & !0xFFF)
    }
}

/// Allocates and initializes a fresh process page directory: PDE[0] shares
/// the kernel PT, PDE[1] is a new (initially empty) user PT, and
/// PDE[2..511] replicate the kernel's PSE identity mappings.
pub fn build_process_directory(frames: &FrameAllocator) -> Result<ProcessDirectory> {
    let pd_phys = frames.alloc()?;
    let user_pt_phys = frames.alloc()?;

    // SAFETY: both frames were just allocated, are uniquely owned by this
    // call, and lie in the kernel's identity-mapped region, so raw pointer
    // access through their physical addresses is sound.
    unsafe {
        let pd = pd_phys as *mut Table;
        let user_pt = user_pt_phys as *mut Table;
        (*user_pt) = Table::empty();

        (*pd).entries[0].set(kernel_pt_addr(), PtFlags::PRESENT | PtFlags::WRITABLE);
        (*pd).entries[1].set(user_pt_phys, PtFlags::PRESENT | PtFlags::WRITABLE | PtFlags::USER);
        for i in 2..ENTRIES {
            (*pd).entries[i] = pse_identity_entry(i);
        }
    }

    Ok(ProcessDirectory { pd_phys, user_pt_phys })
}

/// Tears down a process's private frames (page directory and user PT
/// themselves; the frames the user PT *maps* are freed separately by the
/// caller, since only the process record knows which ones are live).
pub fn destroy_process_directory(frames: &FrameAllocator, dir: &ProcessDirectory) -> Result<()> {
    frames.free(dir.pd_phys)?;
    frames.free(dir.user_pt_phys)?;
    Ok(())
}

/// Switches CR3 to `dir`'s page directory, flushing the TLB.
///
/// # Safety
/// `dir` must be fully built (`build_process_directory`) and must outlive
/// the time it is active as CR3.
pub unsafe fn switch_to(dir: &ProcessDirectory) {
    // SAFETY: writing CR3 with a valid page directory's physical address,
    // per the caller's stated precondition.
    unsafe { controlregs::cr3_write(dir.pd_phys as u64) };
}

/// Maps one page in a user PT identified only by its physical address, for
/// callers (`sbrk`) that hold a PCB's raw `user_pt_phys` rather than the
/// owning `ProcessDirectory`.
pub fn map_raw_user_page(user_pt_phys: u32, vpn: usize, frame_addr: u32, writable: bool) -> Result<()> {
    if vpn >= ENTRIES {
        return Err(PagingError::NotPresent);
    }
    let mut flags = PtFlags::PRESENT | PtFlags::USER;
    if writable {
        flags |= PtFlags::WRITABLE;
    }
    // SAFETY: `user_pt_phys` belongs to a live process and is identity
    // mapped in the kernel's always-resident PSE range.
    unsafe {
        let table = user_pt_phys as *mut Table;
        (*table).entries[vpn].set(frame_addr, flags);
    }
    Ok(())
}

/// Counts present entries across a raw user PT, for `meminfo`'s
/// `virt_used_kb`.
pub fn count_present_user_pages(user_pt_phys: u32) -> usize {
    if user_pt_phys == 0 {
        return 0;
    }
    // SAFETY: see `map_raw_user_page`.
    let table = unsafe { &*(user_pt_phys as *const Table) };
    table.entries.iter().filter(|e| e.is_present()).count()
}

/// Translates a virtual address in `[USER_REGION_BASE, USER_REGION_END)`
/// through a raw user PT physical address (as stored in a PCB) to its
/// backing physical address. Every managed physical frame is also
/// accessible at that same address under the always-active PSE identity
/// mapping, so the kernel can dereference the result directly without
/// switching CR3 or creating a temporary mapping.
pub fn translate_user_vaddr(user_pt_phys: u32, vaddr: u32) -> Option<u32> {
    use crate::config::USER_REGION_BASE;
    if vaddr < USER_REGION_BASE {
        return None;
    }
    let offset_into_region = vaddr - USER_REGION_BASE;
    let vpn = (offset_into_region / PAGE_SIZE) as usize;
    let page_offset = offset_into_region % PAGE_SIZE;
    if vpn >= ENTRIES {
        return None;
    }
    // SAFETY: `user_pt_phys` is a live process's user PT, identity-mapped
    // in the kernel's always-resident PSE range.
    let entry = unsafe { (*(user_pt_phys as *const Table)).entries[vpn] };
    if !entry.is_present() {
        return None;
    }
    Some((entry.0 & !0xFFF) + page_offset)
}

/// Switches CR3 directly to a physical page directory address, for callers
/// (the scheduler, `exec`) that only have a PCB's stored `pd_phys` rather
/// than the owning `ProcessDirectory` value.
///
/// # Safety
/// `pd_phys` must be the address of a directory built by
/// `build_process_directory` (or the kernel directory) that is still alive.
pub unsafe fn switch_to_phys(pd_phys: u32) {
    // SAFETY: per caller's precondition.
    unsafe { controlregs::cr3_write(pd_phys as u64) };
}

/// Switches back to the kernel's own directory (no user mappings active).
///
/// # Safety
/// Must only be called once `build_kernel_directory`/`enable` have run.
pub unsafe fn switch_to_kernel() {
    // SAFETY: see `switch_to`; the kernel directory is always valid once
    // built.
    unsafe { controlregs::cr3_write(kernel_directory_addr() as u64) };
}
