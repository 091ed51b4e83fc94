// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backing store access
//!
//! Positioned reads and writes against the journal file or block device.
//! Writes go through a bounded [`Retry`]; durability is `fdatasync` on
//! block devices and `fsync` on regular files, see [`SyncMethod`].

use super::header::BLOCK_SIZE;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::os::unix::fs::{FileExt as _, FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Zeroed byte buffer whose start is aligned to `BLOCK_SIZE`
///
/// Built by over-allocating and slicing at the first aligned offset, so it
/// can be handed to an `O_DIRECT` file descriptor.
pub struct AlignedBuf {
    raw: Vec<u8>,
    start: usize,
    len: usize,
}

impl AlignedBuf {
    pub fn new(len: usize) -> Self {
        let raw = vec![0u8; len + BLOCK_SIZE];
        let start = (BLOCK_SIZE - raw.as_ptr() as usize % BLOCK_SIZE) % BLOCK_SIZE;
        Self { raw, start, len }
    }

    /// Zero-length placeholder left behind when a buffer is moved out.
    pub fn empty() -> Self {
        Self {
            raw: Vec::new(),
            start: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.raw[self.start..self.start + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.raw[self.start..self.start + self.len]
    }

    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }

    pub fn is_aligned(&self) -> bool {
        self.as_slice().as_ptr() as usize % BLOCK_SIZE == 0
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf").field("len", &self.len).finish()
    }
}

/// Bounded retry of transient I/O failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    /// Extra attempts after the first
    pub attempts: u32,
    pub backoff: Duration,
}

impl Retry {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Run `op`, retrying only `WouldBlock` and `Interrupted`.
    pub fn run<T>(&self, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.attempts => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %e, "transient I/O error, retrying");
                    std::thread::sleep(self.backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// How written slots are made durable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMethod {
    /// Flush file data only; a raw device has no metadata worth syncing
    Data,
    /// Flush data and metadata
    Full,
}

impl SyncMethod {
    pub fn for_store(block_device: bool) -> Self {
        if block_device {
            SyncMethod::Data
        } else {
            SyncMethod::Full
        }
    }

    pub(crate) fn apply(self, file: &File) -> io::Result<()> {
        match self {
            SyncMethod::Data => data_sync(file),
            SyncMethod::Full => file.sync_all(),
        }
    }
}

/// Open journal backing store
#[derive(Debug)]
pub struct BackingStore {
    file: File,
    path: PathBuf,
    block_device: bool,
    direct: bool,
}

impl BackingStore {
    /// Open an existing store read/write.
    ///
    /// With `direct_io`, the file is opened `O_DIRECT`; a filesystem that
    /// refuses it (tmpfs answers `EINVAL`) gets a buffered descriptor instead.
    pub fn open(path: &Path, direct_io: bool) -> io::Result<Self> {
        let (file, direct) = if direct_io {
            match open_direct(path) {
                Ok(file) => (file, true),
                Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EINVAL as i32) => {
                    tracing::info!(
                        path = %path.display(),
                        "O_DIRECT refused by filesystem, using buffered I/O"
                    );
                    (open_buffered(path)?, false)
                }
                Err(e) => return Err(e),
            }
        } else {
            (open_buffered(path)?, false)
        };

        let block_device = file.metadata()?.file_type().is_block_device();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_device,
            direct,
        })
    }

    /// Open `path` for formatting, creating it if it does not exist.
    ///
    /// Contents are left alone until [`prepare`](Self::prepare), so a
    /// journal that is open elsewhere can be refused via the lock first.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let block_device = file.metadata()?.file_type().is_block_device();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_device,
            direct: false,
        })
    }

    /// Size the store for a fresh journal of `len` bytes.
    ///
    /// Regular files are emptied and resized; block devices must already
    /// hold `len` bytes.
    pub fn prepare(&self, len: u64) -> io::Result<()> {
        if self.block_device {
            let have = self.len()?;
            if have < len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("device holds {} bytes, journal needs {}", have, len),
                ));
            }
            return Ok(());
        }
        self.file.set_len(0)?;
        self.file.set_len(len)
    }

    /// Take the advisory single-instance lock. Returns false if another
    /// process or handle already holds it.
    pub fn try_lock(&self) -> io::Result<bool> {
        match self.file.try_lock_exclusive() {
            Ok(()) => Ok(true),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_block_device(&self) -> bool {
        self.block_device
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Size in bytes; works for block devices, where metadata reports 0.
    pub fn len(&self) -> io::Result<u64> {
        (&self.file).seek(SeekFrom::End(0))
    }

    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.file.read_exact_at(buf, offset)
    }

    pub fn write_at(&self, buf: &[u8], offset: u64, retry: &Retry) -> io::Result<()> {
        retry.run(|| self.file.write_all_at(buf, offset))
    }

    pub fn sync_method(&self) -> SyncMethod {
        SyncMethod::for_store(self.block_device)
    }

    /// Make `len` bytes at `offset` durable.
    pub fn sync(&self, offset: u64, len: u64) -> io::Result<()> {
        tracing::trace!(offset, len, method = ?self.sync_method(), "sync");
        self.sync_method().apply(&self.file)
    }
}

fn open_buffered(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

#[cfg(target_os = "linux")]
fn open_direct(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(nix::fcntl::OFlag::O_DIRECT.bits())
        .open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_direct(path: &Path) -> io::Result<File> {
    open_buffered(path)
}

#[cfg(target_os = "linux")]
fn data_sync(file: &File) -> io::Result<()> {
    nix::unistd::fdatasync(file).map_err(io::Error::from)
}

#[cfg(not(target_os = "linux"))]
fn data_sync(file: &File) -> io::Result<()> {
    file.sync_data()
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
