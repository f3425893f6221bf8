//! Per-process file descriptor table. The reference kernel had no notion
//! of descriptors at all (`fat16_read`/`fat16_write` took a filename every
//! call); `open`/`close`/positioned `read`/`write` are this kernel's own
//! addition, needed once syscalls expose POSIX-shaped `open`/`read`/`write`.

use crate::config::{FILE_BUF_SIZE, MAX_FILE_FDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    TableFull,
    BadDescriptor,
    NotOpen,
}

pub type Result<T> = core::result::Result<T, FdError>;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

struct OpenFile {
    in_use: bool,
    name_len: u8,
    name: [u8; 64],
    mode: OpenMode,
    pos: usize,
    len: usize,
    buf: [u8; FILE_BUF_SIZE],
}

impl OpenFile {
    const fn closed() -> Self {
        Self {
            in_use: false,
            name_len: 0,
            name: [0; 64],
            mode: OpenMode::Read,
            pos: 0,
            len: 0,
            buf: [0; FILE_BUF_SIZE],
        }
    }
}

pub struct FdTable {
    files: [OpenFile; MAX_FILE_FDS],
}

impl FdTable {
    pub const fn new() -> Self {
        const CLOSED: OpenFile = OpenFile::closed();
        Self { files: [CLOSED; MAX_FILE_FDS] }
    }

    fn alloc_slot(&mut self) -> Result<usize> {
        self.files
            .iter()
            .position(|f| !f.in_use)
            .ok_or(FdError::TableFull)
    }

    /// Reserves a descriptor and preloads the whole file into its buffer
    /// (read mode) or starts an empty one (write mode); the fixed-size
    /// in-memory buffer bounds both by `FILE_BUF_SIZE`.
    pub fn open(&mut self, name: &str, mode: OpenMode, initial_len: usize) -> Result<i32> {
        let slot = self.alloc_slot()?;
        let file = &mut self.files[slot];
        file.in_use = true;
        let name_bytes = name.as_bytes();
        let n = name_bytes.len().min(file.name.len());
        file.name[..n].copy_from_slice(&name_bytes[..n]);
        file.name_len = n as u8;
        file.mode = mode;
        file.pos = 0;
        file.len = initial_len.min(FILE_BUF_SIZE);
        Ok(slot as i32)
    }

    pub fn name(&self, fd: i32) -> Result<&str> {
        let file = self.get(fd)?;
        core::str::from_utf8(&file.name[..file.name_len as usize]).map_err(|_| FdError::NotOpen)
    }

    pub fn buf_mut(&mut self, fd: i32) -> Result<&mut [u8]> {
        let file = self.get_mut(fd)?;
        Ok(&mut file.buf[..])
    }

    pub fn set_len(&mut self, fd: i32, len: usize) -> Result<()> {
        let file = self.get_mut(fd)?;
        file.len = len.min(FILE_BUF_SIZE);
        Ok(())
    }

    pub fn mode(&self, fd: i32) -> Result<OpenMode> {
        Ok(self.get(fd)?.mode)
    }

    pub fn len(&self, fd: i32) -> Result<usize> {
        Ok(self.get(fd)?.len)
    }

    pub fn read(&mut self, fd: i32, out: &mut [u8]) -> Result<usize> {
        let file = self.get_mut(fd)?;
        let remaining = file.len.saturating_sub(file.pos);
        let n = remaining.min(out.len());
        out[..n].copy_from_slice(&file.buf[file.pos..file.pos + n]);
        file.pos += n;
        Ok(n)
    }

    pub fn write(&mut self, fd: i32, data: &[u8]) -> Result<usize> {
        let file = self.get_mut(fd)?;
        let space = FILE_BUF_SIZE.saturating_sub(file.pos);
        let n = space.min(data.len());
        file.buf[file.pos..file.pos + n].copy_from_slice(&data[..n]);
        file.pos += n;
        file.len = file.len.max(file.pos);
        Ok(n)
    }

    pub fn seek(&mut self, fd: i32, pos: usize) -> Result<()> {
        let file = self.get_mut(fd)?;
        file.pos = pos.min(file.len);
        Ok(())
    }

    pub fn close(&mut self, fd: i32) -> Result<()> {
        let file = self.get_mut(fd)?;
        *file = OpenFile::closed();
        Ok(())
    }

    pub fn close_all(&mut self) {
        for file in &mut self.files {
            *file = OpenFile::closed();
        }
    }

    fn get(&self, fd: i32) -> Result<&OpenFile> {
        let idx = usize::try_from(fd).map_err(|_| FdError::BadDescriptor)?;
        let file = self.files.get(idx).ok_or(FdError::BadDescriptor)?;
        if file.in_use {
            Ok(file)
        } else {
            Err(FdError::NotOpen)
        }
    }

    fn get_mut(&mut self, fd: i32) -> Result<&mut OpenFile> {
        let idx = usize::try_from(fd).map_err(|_| FdError::BadDescriptor)?;
        let file = self.files.get_mut(idx).ok_or(FdError::BadDescriptor)?;
        if file.in_use {
            Ok(file)
        } else {
            Err(FdError::NotOpen)
        }
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut table = FdTable::new();
        let fd = table.open("a.txt", OpenMode::Write, 0).expect("open must succeed");
        table.write(fd, b"hello").expect("write must succeed");
        table.seek(fd, 0).expect("seek must succeed");
        let mut out = [0u8; 5];
        let n = table.read(fd, &mut out).expect("read must succeed");
        assert_eq!(&out[..n], b"hello");
    }

    #[test]
    fn closing_frees_the_slot() {
        let mut table = FdTable::new();
        let fd = table.open("a.txt", OpenMode::Read, 0).expect("open must succeed");
        table.close(fd).expect("close must succeed");
        assert_eq!(table.read(fd, &mut [0u8; 1]), Err(FdError::NotOpen));
    }
}
