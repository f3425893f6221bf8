//! Filesystem-facing syscalls: `open`/`close`, `readdir`, `unlink`,
//! `mkdir`, `rename`, `chdir`. Thin translation layer over `fs::fat16` and
//! the per-process `fs::fd` table, grounded in `original_source/kernel/fat16.c`.

use alloc::string::ToString;

use crate::fs::fd::OpenMode;
use crate::fs::FS;
use crate::syscall::io::FD_BASE;
use crate::syscall::{user_bytes_mut, user_cstr, with_current_pcb};

const MAX_PATH: usize = 64;
const DIRENT_SIZE: usize = 13 + 4 + 1; // name[13] + size:u32 + is_dir:u8

pub fn sys_open(path_vaddr: u32, flags: u32) -> i32 {
    let Some(name) = user_cstr(path_vaddr, MAX_PATH) else {
        return -1;
    };

    if flags == 0 {
        let mut buf = [0u8; crate::config::FILE_BUF_SIZE];
        let n = match FS.lock().read(&name, &mut buf) {
            Ok(n) => n,
            Err(_) => return -1,
        };
        let result = with_current_pcb(|pcb| -> Option<i32> {
            let fd = pcb.fds.open(&name, OpenMode::Read, n).ok()?;
            pcb.fds.buf_mut(fd).ok()?[..n].copy_from_slice(&buf[..n]);
            Some(fd)
        });
        return match result {
            Some(Some(fd)) => fd + FD_BASE,
            _ => -1,
        };
    }

    let result = with_current_pcb(|pcb| pcb.fds.open(&name, OpenMode::Write, 0));
    match result {
        Some(Ok(fd)) => fd + FD_BASE,
        _ => -1,
    }
}

pub fn sys_close(fd: i32) -> i32 {
    let slot = fd - FD_BASE;

    let flush = with_current_pcb(|pcb| -> Option<(alloc::string::String, alloc::vec::Vec<u8>)> {
        if pcb.fds.mode(slot).ok()? != OpenMode::Write {
            return None;
        }
        let name = pcb.fds.name(slot).ok()?.to_string();
        let data = pcb.fds.buf_mut(slot).ok()?.to_vec();
        let len = pcb.fds.len(slot).ok()?;
        Some((name, data[..len].to_vec()))
    });

    if let Some(Some((name, data))) = flush {
        let _ = FS.lock().write(&name, &data);
    }

    match with_current_pcb(|pcb| pcb.fds.close(slot)) {
        Some(Ok(())) => 0,
        _ => -1,
    }
}

pub fn sys_readdir(buf_vaddr: u32, max: u32) -> i32 {
    let max = max as usize;
    let Some(out) = user_bytes_mut(buf_vaddr, max * DIRENT_SIZE) else {
        return -1;
    };

    let mut count = 0usize;
    let result = FS.lock().listdir(|entry| {
        if count >= max {
            return;
        }
        let base = count * DIRENT_SIZE;
        let name_bytes = entry.name().as_bytes();
        let n = name_bytes.len().min(13);
        out[base..base + n].copy_from_slice(&name_bytes[..n]);
        for b in &mut out[base + n..base + 13] {
            *b = 0;
        }
        out[base + 13..base + 17].copy_from_slice(&entry.size.to_le_bytes());
        out[base + 17] = entry.is_dir as u8;
        count += 1;
    });

    match result {
        Ok(()) => count as i32,
        Err(_) => -1,
    }
}

pub fn sys_unlink(name_vaddr: u32) -> i32 {
    let Some(name) = user_cstr(name_vaddr, MAX_PATH) else {
        return -1;
    };
    match FS.lock().unlink(&name) {
        Ok(()) => 0,
        Err(crate::fs::fat16::Fat16Error::DirectoryNotEmpty) => -2,
        Err(_) => -1,
    }
}

pub fn sys_mkdir(name_vaddr: u32) -> i32 {
    let Some(name) = user_cstr(name_vaddr, MAX_PATH) else {
        return -1;
    };
    match FS.lock().mkdir(&name) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn sys_rename(src_vaddr: u32, dst_vaddr: u32) -> i32 {
    let (Some(src), Some(dst)) = (user_cstr(src_vaddr, MAX_PATH), user_cstr(dst_vaddr, MAX_PATH))
    else {
        return -1;
    };
    match FS.lock().rename(&src, &dst) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn sys_chdir(name_vaddr: u32) -> i32 {
    let Some(name) = user_cstr(name_vaddr, MAX_PATH) else {
        return -1;
    };
    match FS.lock().chdir(&name) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}
