// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::vfs::FileHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use ternix_uapi::errors::Errno;
use ternix_uapi::{errno, error};

const MAX_FDS: i32 = 1024;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FdNumber(i32);

impl FdNumber {
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for FdNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd({})", self.0)
    }
}

/// The open files of one task.
#[derive(Default)]
pub struct FdTable {
    entries: Mutex<HashMap<i32, FileHandle>>,
}

impl FdTable {
    /// Installs `file` at the lowest available descriptor.
    pub fn add(&self, file: FileHandle) -> Result<FdNumber, Errno> {
        let mut entries = self.entries.lock();
        let fd = (0..MAX_FDS)
            .find(|fd| !entries.contains_key(fd))
            .ok_or_else(|| errno!(EMFILE))?;
        entries.insert(fd, file);
        Ok(FdNumber::from_raw(fd))
    }

    pub fn get(&self, fd: FdNumber) -> Result<FileHandle, Errno> {
        self.entries.lock().get(&fd.raw()).cloned().ok_or_else(|| errno!(EBADF))
    }

    pub fn close(&self, fd: FdNumber) -> Result<(), Errno> {
        match self.entries.lock().remove(&fd.raw()) {
            Some(_) => Ok(()),
            None => error!(EBADF),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use ternix_uapi::errors::EBADF;
    use ternix_uapi::open_flags::OpenFlags;

    #[test]
    fn add_get_close() {
        let (_kernel, current_task) = create_kernel_and_task();
        let file = anon_test_file(&current_task, OpenFlags::RDWR);
        let fd = current_task.files.add(file.clone()).unwrap();
        assert_eq!(fd.raw(), 0);
        assert!(std::sync::Arc::ptr_eq(&current_task.files.get(fd).unwrap(), &file));
        current_task.files.close(fd).unwrap();
        assert_eq!(current_task.files.get(fd).unwrap_err(), EBADF);
        assert_eq!(current_task.files.close(fd).unwrap_err(), EBADF);
    }

    #[test]
    fn add_reuses_lowest_fd() {
        let (_kernel, current_task) = create_kernel_and_task();
        let fd0 = current_task.files.add(anon_test_file(&current_task, OpenFlags::RDWR)).unwrap();
        let fd1 = current_task.files.add(anon_test_file(&current_task, OpenFlags::RDWR)).unwrap();
        assert_eq!((fd0.raw(), fd1.raw()), (0, 1));
        current_task.files.close(fd0).unwrap();
        let fd2 = current_task.files.add(anon_test_file(&current_task, OpenFlags::RDWR)).unwrap();
        assert_eq!(fd2.raw(), 0);
    }
}
