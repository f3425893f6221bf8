//! `meminfo` and `sbrk`. No original C source covers either — the
//! reference kernel had a single static program with no heap growth and no
//! introspection syscall; both are grounded directly in the process-model
//! design (§4.10) on top of `mm::frame_allocator`/`mm::paging`.

use crate::config::{FRAME_SIZE, HEAP_LAST_VPN};
use crate::mm::frame_allocator::FRAME_ALLOCATOR;
use crate::mm::paging;
use crate::process::scheduler;
use crate::syscall::{user_bytes_mut, with_current_pcb};

pub fn sys_meminfo(out_vaddr: u32) -> i32 {
    let Some(out) = user_bytes_mut(out_vaddr, 7 * 4) else {
        return -1;
    };

    let procs = scheduler::PROCS.lock();
    let n_procs = procs.slots.iter().filter(|p| p.state != crate::process::pcb::ProcessState::Unused).count();
    let virt_used_pages: usize =
        procs.slots.iter().map(|p| paging::count_present_user_pages(p.user_pt_phys)).sum();
    drop(procs);

    let total_frames = crate::config::TOTAL_FRAMES as u32;
    let used_frames = FRAME_ALLOCATOR.used_frames() as u32;
    let free_frames = total_frames - used_frames;
    let frame_kb = FRAME_SIZE / 1024;

    // One process's virtual region is 4MB == 4096KB; per-process virtual
    // accounting is independent of physical frame size.
    let virt_total_kb = (n_procs as u32) * 4096;
    let virt_used_kb = (virt_used_pages as u32) * frame_kb;
    let virt_free_kb = virt_total_kb.saturating_sub(virt_used_kb);

    let fields: [u32; 7] = [
        total_frames * frame_kb,
        used_frames * frame_kb,
        free_frames * frame_kb,
        virt_total_kb,
        virt_used_kb,
        virt_free_kb,
        n_procs as u32,
    ];

    for (i, field) in fields.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
    }
    0
}

pub fn sys_sbrk(n: i32) -> i32 {
    if n < 0 {
        return -1;
    }
    let n = n as u32;
    let pages_needed = n.div_ceil(FRAME_SIZE) as usize;

    let Some(slot) = scheduler::current_slot() else {
        return -1;
    };
    let (old_break, user_pt_phys) = {
        let procs = scheduler::PROCS.lock();
        (procs.slots[slot].heap_break, procs.slots[slot].user_pt_phys)
    };

    let first_vpn = ((old_break - crate::config::PROG_BASE) / FRAME_SIZE) as usize;
    if first_vpn + pages_needed > HEAP_LAST_VPN {
        return -1;
    }

    let mut allocated = alloc::vec::Vec::new();
    for i in 0..pages_needed {
        match FRAME_ALLOCATOR.alloc() {
            Ok(frame) => allocated.push((first_vpn + i, frame)),
            Err(_) => {
                for (_, frame) in &allocated {
                    let _ = FRAME_ALLOCATOR.free(*frame);
                }
                return -1;
            }
        }
    }

    for (vpn, frame) in &allocated {
        let _ = paging::map_raw_user_page(user_pt_phys, *vpn, *frame, true);
    }

    let new_break = old_break + pages_needed as u32 * FRAME_SIZE;
    with_current_pcb(|pcb| pcb.heap_break = new_break);

    old_break as i32
}
