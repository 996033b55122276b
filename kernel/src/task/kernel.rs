// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::memory_file::MemoryFile;
use crate::task::{CurrentTask, Task};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use ternix_uapi::pid_t;

/// Tunables applied when a kernel is created.
#[derive(Debug, Default)]
pub struct KernelOptions {
    /// Upper bound on the backing memory file, in bytes. `None` means
    /// unbounded.
    pub memory_file_size: Option<u64>,
}

/// The shared state of one emulated kernel instance.
///
/// All state is reachable from here; there are no global variables.
pub struct Kernel {
    pub memory_file: Arc<MemoryFile>,
    next_pid: AtomicI32,
}

impl Kernel {
    pub fn new(options: KernelOptions) -> Arc<Self> {
        Arc::new(Self {
            memory_file: MemoryFile::new(options.memory_file_size),
            next_pid: AtomicI32::new(1),
        })
    }

    /// Creates a new task with its own address space and file table.
    pub fn new_task(self: &Arc<Self>, command: &str) -> CurrentTask {
        CurrentTask::new(Task::new(self, self.allocate_pid(), command))
    }

    fn allocate_pid(&self) -> pid_t {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }
}
