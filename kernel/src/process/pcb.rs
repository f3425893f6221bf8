//! Process control block table: fixed-size array of slots, reaped lazily.
//! Field layout and the creation/destruction sequence are taken directly
//! from the process-model design (no original C source exists — the
//! reference kernel never grew a scheduler). The teacher's own PCB-less
//! round-robin loop in its scheduler module supplied the iteration idiom.

use crate::config::{ARGS_BASE, HEAP_BASE, PROC_MAX_PROCS, USER_STACK_TOP};
use crate::fs::fd::FdTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Ready,
    Running,
    Sleeping,
    Waiting,
    Zombie,
}

pub struct Pcb {
    pub state: ProcessState,
    pub pid: u32,
    pub name: [u8; 32],
    pub name_len: u8,

    pub pd_phys: u32,
    pub user_pt_phys: u32,
    pub kernel_stack_base: u32,
    pub kernel_stack_top: u32,
    pub saved_esp: u32,

    pub is_background: bool,
    pub parent_pid: Option<u32>,
    pub parent_cr3: u32,
    pub saved_exec_ret_esp: u32,

    pub saved_cwd_cluster: u16,
    pub heap_break: u32,
    pub exit_code: i32,
    pub wakeup_tick: u64,

    pub fds: FdTable,
}

impl Pcb {
    pub const fn unused() -> Self {
        Self {
            state: ProcessState::Unused,
            pid: 0,
            name: [0; 32],
            name_len: 0,
            pd_phys: 0,
            user_pt_phys: 0,
            kernel_stack_base: 0,
            kernel_stack_top: 0,
            saved_esp: 0,
            is_background: false,
            parent_pid: None,
            parent_cr3: 0,
            saved_exec_ret_esp: 0,
            saved_cwd_cluster: 0,
            heap_break: HEAP_BASE,
            exit_code: 0,
            wakeup_tick: 0,
            fds: FdTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len as usize]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let n = bytes.len().min(self.name.len());
        self.name[..n].copy_from_slice(&bytes[..n]);
        self.name_len = n as u8;
    }

    pub fn user_stack_top() -> u32 {
        USER_STACK_TOP
    }

    pub fn args_base() -> u32 {
        ARGS_BASE
    }
}

pub struct ProcessTable {
    pub slots: [Pcb; PROC_MAX_PROCS],
    next_pid: u32,
}

impl ProcessTable {
    pub const fn new() -> Self {
        const UNUSED: Pcb = Pcb::unused();
        Self { slots: [UNUSED; PROC_MAX_PROCS], next_pid: 1 }
    }

    /// Finds a slot to reuse: first pass reaps a ZOMBIE, second pass takes
    /// an UNUSED one. Returns the slot index and a freshly assigned PID.
    pub fn find_free_slot(&mut self) -> Option<usize> {
        if let Some(idx) = self.slots.iter().position(|p| p.state == ProcessState::Zombie) {
            return Some(idx);
        }
        self.slots.iter().position(|p| p.state == ProcessState::Unused)
    }

    pub fn alloc_pid(&mut self) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    pub fn find_by_pid(&mut self, pid: u32) -> Option<&mut Pcb> {
        self.slots.iter_mut().find(|p| p.pid == pid && p.state != ProcessState::Unused)
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_the_fixed_buffer() {
        let mut pcb = Pcb::unused();
        pcb.set_name("sh");
        assert_eq!(pcb.name(), "sh");
    }

    #[test]
    fn set_name_truncates_to_the_buffer_length() {
        let mut pcb = Pcb::unused();
        pcb.set_name(&"x".repeat(64));
        assert_eq!(pcb.name().len(), 32);
    }

    #[test]
    fn find_free_slot_prefers_zombies_over_unused() {
        let mut table = ProcessTable::new();
        table.slots[3].state = ProcessState::Zombie;
        table.slots[3].pid = 7;
        table.slots[1].state = ProcessState::Unused;
        assert_eq!(table.find_free_slot(), Some(3));
    }

    #[test]
    fn find_free_slot_falls_back_to_unused_when_no_zombie() {
        let mut table = ProcessTable::new();
        for slot in table.slots.iter_mut() {
            slot.state = ProcessState::Running;
        }
        table.slots[5].state = ProcessState::Unused;
        assert_eq!(table.find_free_slot(), Some(5));
    }

    #[test]
    fn alloc_pid_increments_monotonically() {
        let mut table = ProcessTable::new();
        let a = table.alloc_pid();
        let b = table.alloc_pid();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn find_by_pid_ignores_unused_slots() {
        let mut table = ProcessTable::new();
        table.slots[2].pid = 42;
        table.slots[2].state = ProcessState::Unused;
        assert!(table.find_by_pid(42).is_none());
        table.slots[2].state = ProcessState::Ready;
        assert!(table.find_by_pid(42).is_some());
    }
}
