// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::MemoryManager;
use crate::task::Kernel;
use crate::vfs::FdTable;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::user_address::UserAddress;
use ternix_uapi::user_buffer::{UserBuffer, UserBuffers};
use ternix_uapi::{errno, error, iovec, pid_t, UIO_MAXIOV};
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// One emulated guest thread.
pub struct Task {
    pub id: pid_t,
    pub command: String,
    kernel: Arc<Kernel>,
    /// The file descriptors visible to this task.
    pub files: FdTable,
    mm: Arc<MemoryManager>,
    mem_cgroup_id: u32,

    /// Set by `interrupt` and observed by long-running kernel work. Sticky
    /// until `clear_interrupt`, matching signal delivery: the interrupted
    /// syscall returns EINTR before the task re-enters the kernel.
    interrupt_flag: AtomicBool,
    interrupt_tx: Sender<()>,
    interrupt_rx: Receiver<()>,
}

impl Task {
    pub(crate) fn new(kernel: &Arc<Kernel>, id: pid_t, command: &str) -> Arc<Self> {
        let (interrupt_tx, interrupt_rx) = bounded(1);
        Arc::new(Self {
            id,
            command: command.to_string(),
            kernel: kernel.clone(),
            files: FdTable::default(),
            mm: MemoryManager::new(kernel.memory_file.clone()),
            mem_cgroup_id: 0,
            interrupt_flag: AtomicBool::new(false),
            interrupt_tx,
            interrupt_rx,
        })
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn mm(&self) -> &Arc<MemoryManager> {
        &self.mm
    }

    pub fn mem_cgroup_id(&self) -> u32 {
        self.mem_cgroup_id
    }

    /// Interrupts the task: wakes it if it is blocked and leaves the sticky
    /// flag set for `interrupted` observers.
    pub fn interrupt(&self) {
        self.interrupt_flag.store(true, Ordering::Release);
        let _ = self.interrupt_tx.try_send(());
    }

    pub fn interrupted(&self) -> bool {
        self.interrupt_flag.load(Ordering::Acquire)
    }

    pub fn clear_interrupt(&self) {
        self.interrupt_flag.store(false, Ordering::Release);
        let _ = self.interrupt_rx.try_recv();
    }

    /// Blocks until `chan` delivers a message or the task is interrupted.
    pub fn block(&self, chan: &Receiver<()>) -> Result<(), Errno> {
        select! {
            recv(chan) -> _ => Ok(()),
            recv(self.interrupt_rx) -> _ => error!(EINTR),
        }
    }
}

/// The task servicing the current syscall, on the current thread.
pub struct CurrentTask {
    pub task: Arc<Task>,
}

impl CurrentTask {
    pub(crate) fn new(task: Arc<Task>) -> Self {
        Self { task }
    }

    pub fn read_memory(&self, addr: UserAddress, bytes: &mut [u8]) -> Result<(), Errno> {
        self.mm().read_memory(addr, bytes)
    }

    pub fn write_memory(&self, addr: UserAddress, bytes: &[u8]) -> Result<usize, Errno> {
        self.mm().write_memory(addr, bytes)
    }

    pub fn read_object<T: FromBytes>(&self, addr: UserAddress) -> Result<T, Errno> {
        self.mm().read_object(addr)
    }

    pub fn write_object<T: IntoBytes + Immutable>(
        &self,
        addr: UserAddress,
        object: &T,
    ) -> Result<usize, Errno> {
        self.mm().write_object(addr, object)
    }

    /// Reads `count` iovec records from guest memory at `addr`.
    pub fn read_iovec(&self, addr: UserAddress, count: i32) -> Result<UserBuffers, Errno> {
        if count < 0 || count as u32 > UIO_MAXIOV {
            return error!(EINVAL);
        }
        let mut buffers = UserBuffers::with_capacity(count as usize);
        for index in 0..count as usize {
            let entry_addr = addr
                .checked_add(index * std::mem::size_of::<iovec>())
                .ok_or_else(|| errno!(EFAULT))?;
            let entry: iovec = self.read_object(entry_addr)?;
            buffers.push(UserBuffer {
                address: UserAddress::from_raw(entry.iov_base),
                length: entry.iov_len as usize,
            });
        }
        Ok(buffers)
    }
}

impl std::ops::Deref for CurrentTask {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use crossbeam_channel::bounded;
    use ternix_uapi::errors::EINTR;

    #[test]
    fn block_wakes_on_channel_message() {
        let (_kernel, current_task) = create_kernel_and_task();
        let (tx, rx) = bounded(1);
        tx.send(()).unwrap();
        current_task.block(&rx).unwrap();
    }

    #[test]
    fn block_returns_eintr_on_interrupt() {
        let (_kernel, current_task) = create_kernel_and_task();
        let (_tx, rx) = bounded::<()>(1);
        current_task.interrupt();
        assert_eq!(current_task.block(&rx).unwrap_err(), EINTR);
        assert!(current_task.interrupted());
        current_task.clear_interrupt();
        assert!(!current_task.interrupted());
    }

    #[test]
    fn interrupt_wakes_blocked_thread() {
        let (kernel, _main_task) = create_kernel_and_task();
        let blocked = create_task(&kernel, "blocked").task;
        let thread = {
            let blocked = blocked.clone();
            std::thread::spawn(move || {
                let (_tx, rx) = bounded::<()>(1);
                blocked.block(&rx)
            })
        };
        // Give the thread a chance to park before interrupting it.
        std::thread::sleep(std::time::Duration::from_millis(10));
        blocked.interrupt();
        assert_eq!(thread.join().unwrap().unwrap_err(), EINTR);
    }
}
