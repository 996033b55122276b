// Copyright 2025 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Emulation of the io_uring facility.
//!
//! Only setup-then-enter operation is supported: the guest creates the ring
//! with `io_uring_setup(2)` and drives it with `io_uring_enter(2)`; neither
//! IOPOLL nor SQPOLL mode exists here. There is also no deferred completion
//! backlog: when the completion ring is full, further completions are
//! counted in `cq_overflow` and dropped.

use crate::mm::memory::{copy_from_shared, copy_to_shared};
use crate::mm::memory_file::{AllocOpts, AllocationKind, FileRange, InternalMapping, MemoryFile};
use crate::mm::{Access, Mappable, MappableRange, MmapOpts, Translation};
use crate::task::CurrentTask;
use crate::vfs::{
    fileops_impl_dataless, generic_configure_mmap, Anon, FdNumber, FileHandle, FileObject, FileOps,
    UserBuffersOutputBuffer,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use ternix_logging::track_stub;
use ternix_uapi::errors::Errno;
use ternix_uapi::open_flags::OpenFlags;
use ternix_uapi::user_address::UserAddress;
use ternix_uapi::{
    errno, error, io_cqring_offsets, io_sqring_offsets, io_uring_cqe, io_uring_params,
    io_uring_sqe, IORING_FEAT_SINGLE_MMAP, IORING_OFF_CQ_RING, IORING_OFF_SQES,
    IORING_OFF_SQ_RING, IORING_OP_NOP, IORING_OP_READV, IORING_OP_WRITEV, IORING_SETUP_CQSIZE,
    IORING_SETUP_IOPOLL, IORING_SETUP_SQPOLL,
};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

mod shared_buffer;
use shared_buffer::atomic_u32_at_offset;
pub use shared_buffer::SharedBuffer;

pub const IORING_MAX_ENTRIES: u32 = 1 << 15; // 32768
const IORING_MAX_CQ_ENTRIES: u32 = 2 * IORING_MAX_ENTRIES;

/// Ring fields the guest polls are padded out to cache lines.
const RING_ALIGNMENT: usize = 64;

/// The control header at the start of the rings buffer.
///
/// This structure is not declared in the Linux UAPI. Userspace learns where
/// each field lives from the SQ and CQ offsets returned by
/// `io_uring_setup()`, so the layout here only has to be internally
/// consistent with those offsets; it matches the placement a real kernel
/// reports.
///
/// The kernel side of the protocol uses `sq_head` as its consumption cursor
/// and writes `cq_tail` and `cq_overflow`; userspace uses `cq_head` as its
/// cursor and writes `sq_tail`. Neither side ever stores to the other's
/// fields. All four cursors use the full u32 range and wrap; masking with
/// `*_ring_mask` yields the array index.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, IntoBytes, FromBytes, KnownLayout, Immutable)]
struct IoRings {
    sq_head: u32,
    sq_tail: u32,
    cq_head: u32,
    cq_tail: u32,
    sq_ring_mask: u32,
    cq_ring_mask: u32,
    sq_ring_entries: u32,
    cq_ring_entries: u32,
    sq_dropped: u32,
    sq_flags: u32,
    cq_flags: u32,
    cq_overflow: u32,
    _padding: [u8; 16],
}

static_assertions::const_assert_eq!(std::mem::size_of::<IoRings>(), RING_ALIGNMENT);

const SQ_HEAD_OFFSET: usize = std::mem::offset_of!(IoRings, sq_head);
const SQ_TAIL_OFFSET: usize = std::mem::offset_of!(IoRings, sq_tail);
const CQ_HEAD_OFFSET: usize = std::mem::offset_of!(IoRings, cq_head);
const CQ_TAIL_OFFSET: usize = std::mem::offset_of!(IoRings, cq_tail);
const SQ_RING_MASK_OFFSET: usize = std::mem::offset_of!(IoRings, sq_ring_mask);
const CQ_RING_MASK_OFFSET: usize = std::mem::offset_of!(IoRings, cq_ring_mask);
const SQ_RING_ENTRIES_OFFSET: usize = std::mem::offset_of!(IoRings, sq_ring_entries);
const CQ_RING_ENTRIES_OFFSET: usize = std::mem::offset_of!(IoRings, cq_ring_entries);
const SQ_DROPPED_OFFSET: usize = std::mem::offset_of!(IoRings, sq_dropped);
const SQ_FLAGS_OFFSET: usize = std::mem::offset_of!(IoRings, sq_flags);
const CQ_FLAGS_OFFSET: usize = std::mem::offset_of!(IoRings, cq_flags);
const CQ_OVERFLOW_OFFSET: usize = std::mem::offset_of!(IoRings, cq_overflow);

/// The completion queue entries are contiguous to the header.
const CQES_OFFSET: usize = std::mem::size_of::<IoRings>();

const SQE_SIZE: usize = std::mem::size_of::<io_uring_sqe>();
const CQE_SIZE: usize = std::mem::size_of::<io_uring_cqe>();

// The header layout the offsets are computed from matches the one the
// reference kernel reports.
static_assertions::const_assert_eq!(SQ_HEAD_OFFSET, 0);
static_assertions::const_assert_eq!(SQ_TAIL_OFFSET, 4);
static_assertions::const_assert_eq!(CQ_HEAD_OFFSET, 8);
static_assertions::const_assert_eq!(CQ_TAIL_OFFSET, 12);
static_assertions::const_assert_eq!(CQ_OVERFLOW_OFFSET, 44);

fn precomputed_sq_ring_offsets() -> io_sqring_offsets {
    io_sqring_offsets {
        head: SQ_HEAD_OFFSET as u32,
        tail: SQ_TAIL_OFFSET as u32,
        ring_mask: SQ_RING_MASK_OFFSET as u32,
        ring_entries: SQ_RING_ENTRIES_OFFSET as u32,
        flags: SQ_FLAGS_OFFSET as u32,
        dropped: SQ_DROPPED_OFFSET as u32,
        // The array offset depends on the completion queue size; new_file
        // fills it in.
        ..Default::default()
    }
}

fn precomputed_cq_ring_offsets() -> io_cqring_offsets {
    io_cqring_offsets {
        head: CQ_HEAD_OFFSET as u32,
        tail: CQ_TAIL_OFFSET as u32,
        ring_mask: CQ_RING_MASK_OFFSET as u32,
        ring_entries: CQ_RING_ENTRIES_OFFSET as u32,
        overflow: CQ_OVERFLOW_OFFSET as u32,
        cqes: CQES_OFFSET as u32,
        flags: CQ_FLAGS_OFFSET as u32,
        ..Default::default()
    }
}

/// The entry counts of one ring pair and the sizes derived from them.
#[derive(Debug, Clone, Copy)]
struct RingsLayout {
    sq_entries: u32,
    cq_entries: u32,
}

impl RingsLayout {
    fn sq_mask(&self) -> u32 {
        self.sq_entries - 1
    }

    fn cq_mask(&self) -> u32 {
        self.cq_entries - 1
    }

    /// Offset of the SQ index array within the rings buffer: the first
    /// cache line boundary after the CQE array.
    fn array_offset(&self) -> Result<u64, Errno> {
        let cqes = (self.cq_entries as u64)
            .checked_mul(CQE_SIZE as u64)
            .ok_or_else(|| errno!(EOVERFLOW))?;
        (CQES_OFFSET as u64)
            .checked_add(cqes)
            .and_then(|end| end.checked_next_multiple_of(RING_ALIGNMENT as u64))
            .ok_or_else(|| errno!(EOVERFLOW))
    }

    fn rings_buffer_size(&self) -> Result<u64, Errno> {
        let cqes = (self.cq_entries as u64)
            .checked_mul(CQE_SIZE as u64)
            .ok_or_else(|| errno!(EOVERFLOW))?;
        let array = (self.sq_entries as u64)
            .checked_mul(std::mem::size_of::<u32>() as u64)
            .ok_or_else(|| errno!(EOVERFLOW))?;
        (CQES_OFFSET as u64)
            .checked_add(cqes)
            .and_then(|size| size.checked_add(array))
            .ok_or_else(|| errno!(EOVERFLOW))
    }

    fn sq_entries_size(&self) -> Result<u64, Errno> {
        (self.sq_entries as u64).checked_mul(SQE_SIZE as u64).ok_or_else(|| errno!(EOVERFLOW))
    }
}

/// Mappable adapter exposing one ring region to guest address spaces.
///
/// The region is pinned for the whole life of the ring file, which makes the
/// mapping bookkeeping trivial: only `translate` carries any logic.
struct RingRegionFile {
    mf: Arc<MemoryFile>,
    fr: FileRange,
}

impl Mappable for RingRegionFile {
    fn add_mapping(&self, _range: MappableRange, _offset: u64, _writable: bool) -> Result<(), Errno> {
        Ok(())
    }

    fn remove_mapping(&self, _range: MappableRange, _offset: u64, _writable: bool) {}

    fn copy_mapping(
        &self,
        _source: MappableRange,
        _target: MappableRange,
        _offset: u64,
        _writable: bool,
    ) -> Result<(), Errno> {
        Ok(())
    }

    fn translate(
        &self,
        required: MappableRange,
        optional: MappableRange,
        _access: Access,
    ) -> Result<Vec<Translation>, Errno> {
        if required.end > self.fr.length() {
            return error!(EFAULT);
        }
        let source = optional.intersect(&MappableRange { start: 0, end: self.fr.length() });
        if source.length() == 0 {
            return error!(EFAULT);
        }
        // Protection is enforced by the page tables built from the mmap
        // call, not here.
        Ok(vec![Translation {
            source,
            file: self.mf.clone(),
            offset: self.fr.start + source.start,
            perms: Access::rwx(),
        }])
    }

    fn invalidate_unsavable(&self) -> Result<(), Errno> {
        Ok(())
    }
}

/// The io_uring file object: the ring pair shared with the guest and the
/// engine that consumes it.
pub struct IoUringFileObject {
    mf: Arc<MemoryFile>,
    /// Region holding the header, the CQE array and the SQ index array.
    rbmf: Arc<RingRegionFile>,
    /// Region holding the SQE array.
    sqemf: Arc<RingRegionFile>,
    layout: RingsLayout,

    /// Whether a task is inside the submission engine. 0 means idle, 1 means
    /// active; every other value is a protocol violation.
    running: AtomicU32,
    /// Wakeup channel for tasks waiting to enter the engine. See
    /// `process_submissions` for why the capacity must be exactly one.
    run_tx: Sender<()>,
    run_rx: Receiver<()>,

    /// The engine's own count of dropped completions. The copy in the shared
    /// header is derived from this value, never read back, so a guest
    /// scribbling on its mapping cannot corrupt the count.
    cq_overflow: AtomicU32,

    rings_buf: SharedBuffer,
    sqes_buf: SharedBuffer,
    cqes_buf: SharedBuffer,

    /// Set when cached internal mappings must be re-established before the
    /// engine touches the rings again, i.e. after a snapshot restore.
    remap: AtomicBool,
}

impl IoUringFileObject {
    /// Creates the ring pair and the file object exposing it.
    ///
    /// On success `params` carries the chosen entry counts, field offsets
    /// and feature bits back to the guest.
    pub fn new_file(
        current_task: &CurrentTask,
        entries: u32,
        params: &mut io_uring_params,
    ) -> Result<FileHandle, Errno> {
        if entries == 0 || entries > IORING_MAX_ENTRIES {
            return error!(EINVAL);
        }
        let sq_entries = entries.next_power_of_two();
        let cq_entries = if params.flags & IORING_SETUP_CQSIZE != 0 {
            let requested =
                params.cq_entries.checked_next_power_of_two().ok_or_else(|| errno!(EINVAL))?;
            if requested < sq_entries || requested > IORING_MAX_CQ_ENTRIES {
                return error!(EINVAL);
            }
            requested
        } else {
            // Cannot overflow: sq_entries is capped at IORING_MAX_ENTRIES.
            2 * sq_entries
        };

        let layout = RingsLayout { sq_entries, cq_entries };
        let array_offset = layout.array_offset()?;
        let rings_buffer_size = layout.rings_buffer_size()?;
        let sq_entries_size = layout.sq_entries_size()?;

        let mf = current_task.kernel().memory_file.clone();
        let alloc_opts = AllocOpts {
            kind: AllocationKind::Anonymous,
            mem_cg_id: current_task.mem_cgroup_id(),
        };
        let rbfr = mf.allocate(rings_buffer_size, alloc_opts).map_err(|_| errno!(ENOMEM))?;
        let sqefr = match mf.allocate(sq_entries_size, alloc_opts) {
            Ok(range) => range,
            Err(_) => {
                mf.dec_ref(rbfr);
                return error!(ENOMEM);
            }
        };

        // See process_submissions for why the capacity is 1.
        let (run_tx, run_rx) = bounded(1);
        let object = IoUringFileObject {
            rbmf: Arc::new(RingRegionFile { mf: mf.clone(), fr: rbfr }),
            sqemf: Arc::new(RingRegionFile { mf: mf.clone(), fr: sqefr }),
            mf,
            layout,
            running: AtomicU32::new(0),
            run_tx,
            run_rx,
            cq_overflow: AtomicU32::new(0),
            rings_buf: SharedBuffer::default(),
            sqes_buf: SharedBuffer::default(),
            cqes_buf: SharedBuffer::default(),
            remap: AtomicBool::new(false),
        };

        object.map_shared_buffers()?;

        let header = IoRings {
            sq_ring_mask: layout.sq_mask(),
            cq_ring_mask: layout.cq_mask(),
            sq_ring_entries: sq_entries,
            cq_ring_entries: cq_entries,
            ..Default::default()
        };
        let view = object.rings_buf.view(std::mem::size_of::<IoRings>())?;
        copy_to_shared(view.bytes(), header.as_bytes());
        object.rings_buf.writeback(std::mem::size_of::<IoRings>())?;

        params.sq_entries = sq_entries;
        params.cq_entries = cq_entries;
        params.features = IORING_FEAT_SINGLE_MMAP;
        params.sq_off = precomputed_sq_ring_offsets();
        params.sq_off.array = array_offset as u32;
        params.cq_off = precomputed_cq_ring_offsets();

        Ok(Anon::new_file(current_task, Box::new(object), OpenFlags::RDWR, "[io_uring]"))
    }

    /// Caches internal mappings for the ring regions.
    ///
    /// Holds for the life of the file unless a snapshot restore invalidates
    /// them, in which case the first task back inside the engine calls this
    /// again under the critical section.
    fn map_shared_buffers(&self) -> Result<(), Errno> {
        let rb = self.mf.map_internal(self.rbmf.fr, Access::rw())?;
        // The CQE array is contiguous to the header.
        self.cqes_buf.init(rb.drop_first(CQES_OFFSET));
        self.rings_buf.init(rb);
        let sqes = self.mf.map_internal(self.sqemf.fr, Access::rw())?;
        self.sqes_buf.init(sqes);
        Ok(())
    }

    /// Flags the cached internal mappings as needing to be re-established.
    ///
    /// The restore orchestrator calls this while no task is running; the
    /// first task to enter the engine afterwards performs the remap.
    pub fn mark_remap_required(&self) {
        self.remap.store(true, Ordering::Relaxed);
    }

    /// Processes the submission queue. Concurrent calls serialize, blocking
    /// their task while another task runs the engine.
    pub fn process_submissions(
        &self,
        current_task: &CurrentTask,
        to_submit: u32,
        _min_complete: u32,
        flags: u32,
    ) -> Result<u32, Errno> {
        // `running` and the wakeup channel together serialize entrants:
        //
        // On entry, try to move running from 0 to 1. Losing the race means
        // another task is active; sleep on the channel and retry after every
        // wakeup, because a freshly arrived task may win the flag before a
        // woken sleeper does. On exit, the active task moves running back to
        // 0 and then performs a non-blocking send.
        //
        // The channel must be buffered with capacity one. The exiting task
        // cannot block sending (there may be no sleeper), and with a
        // rendezvous channel its signal would be lost whenever a newcomer
        // had observed running == 1 but not yet gone to sleep. A queued
        // message instead hands the wakeup to whichever task sleeps next; a
        // spurious queued wakeup only costs that task one failed retry.
        while self.running.compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed).is_err() {
            let _ = current_task.block(&self.run_rx);
        }
        // We won the flag, so we are the active task; everything below runs
        // in the critical section, released when the guard drops.
        let _active = ActiveGuard { uring: self };

        if self.remap.load(Ordering::Relaxed) {
            self.map_shared_buffers()?;
            self.remap.store(false, Ordering::Relaxed);
        }

        let header_size = std::mem::size_of::<IoRings>();
        let sq_array_size = SQE_SIZE * self.layout.sq_entries as usize;
        let cq_array_size = CQE_SIZE * self.layout.cq_entries as usize;

        let mut rb_view = self.rings_buf.view(header_size)?;
        let mut sqa_view = self.sqes_buf.view(sq_array_size)?;
        let mut cqa_view = self.cqes_buf.view(cq_array_size)?;
        let mut fetch_rb = false;
        let mut fetch_sqa = false;
        let mut fetch_cqa = false;

        let mut submitted: u32 = 0;
        while to_submit > submitted {
            // Processing a batch can take a long time; stay responsive to
            // interrupts.
            if current_task.interrupted() {
                return error!(EINTR);
            }

            if fetch_rb {
                rb_view = self.rings_buf.view(header_size)?;
            }
            let rb = rb_view.bytes();
            let sq_head_ptr = atomic_u32_at_offset(rb, SQ_HEAD_OFFSET);
            let sq_tail_ptr = atomic_u32_at_offset(rb, SQ_TAIL_OFFSET);
            let cq_head_ptr = atomic_u32_at_offset(rb, CQ_HEAD_OFFSET);
            let cq_tail_ptr = atomic_u32_at_offset(rb, CQ_TAIL_OFFSET);
            let overflow_ptr = atomic_u32_at_offset(rb, CQ_OVERFLOW_OFFSET);

            // Load the cursors once per iteration so the body works with
            // stable values; the guest can store a new SQ tail at any time.
            let sq_head = sq_head_ptr.load(Ordering::Relaxed);
            let sq_tail = sq_tail_ptr.load(Ordering::Acquire);
            if sq_head == sq_tail {
                // Submission queue is empty.
                return Ok(submitted);
            }

            // At least one entry is pending; read it out of the SQE array.
            // The acquire load of sq_tail above pairs with the guest's
            // release store, so the entry's bytes are visible.
            if fetch_sqa {
                sqa_view = self.sqes_buf.view(sq_array_size)?;
            }
            let sqa_off = (sq_head & self.layout.sq_mask()) as usize * SQE_SIZE;
            let mut sqe_bytes = [0u8; SQE_SIZE];
            copy_from_shared(&mut sqe_bytes, &sqa_view.bytes()[sqa_off..sqa_off + SQE_SIZE]);
            let sqe: io_uring_sqe = zerocopy::transmute!(sqe_bytes);
            fetch_sqa = self.sqes_buf.invalidate();

            let cqe = self.process_submission(current_task, &sqe, flags);

            // The entry is consumed: let the guest reuse the slot.
            sq_head_ptr.fetch_add(1, Ordering::Release);

            // Load once for stable values; the guest can store a new CQ head
            // at any time.
            let cq_head = cq_head_ptr.load(Ordering::Acquire);
            let cq_tail = cq_tail_ptr.load(Ordering::Relaxed);

            if cq_tail.wrapping_sub(cq_head) >= self.layout.cq_entries {
                // Completion ring is full: count the completion and drop it.
                let overflow = self.cq_overflow.load(Ordering::Relaxed).saturating_add(1);
                self.cq_overflow.store(overflow, Ordering::Relaxed);
                overflow_ptr.store(overflow, Ordering::Release);
            } else {
                if fetch_cqa {
                    cqa_view = self.cqes_buf.view(cq_array_size)?;
                }
                let cqa_off = (cq_tail & self.layout.cq_mask()) as usize * CQE_SIZE;
                copy_to_shared(&cqa_view.bytes()[cqa_off..cqa_off + CQE_SIZE], cqe.as_bytes());
                fetch_cqa = self.cqes_buf.writeback_window(cqa_off, CQE_SIZE)?;

                // The release store ordering the CQE bytes before the new
                // tail pairs with the guest's acquire load of cq_tail.
                cq_tail_ptr.fetch_add(1, Ordering::Release);
            }

            fetch_rb = self.rings_buf.writeback(header_size)?;
            submitted += 1;
        }

        Ok(submitted)
    }

    /// Dispatches a single submission and builds its completion entry.
    ///
    /// Per-entry failures are reported through the entry's `res`, never as
    /// the error of the enter call.
    fn process_submission(
        &self,
        current_task: &CurrentTask,
        sqe: &io_uring_sqe,
        flags: u32,
    ) -> io_uring_cqe {
        let result = match sqe.opcode {
            IORING_OP_NOP => Ok(0),
            IORING_OP_READV => self.handle_readv(current_task, sqe, flags),
            IORING_OP_WRITEV => {
                track_stub!("IORING_OP_WRITEV");
                error!(EINVAL)
            }
            opcode => {
                track_stub!("io_uring opcode", opcode);
                error!(EINVAL)
            }
        };
        let res = match result {
            Ok(bytes) => bytes,
            Err(errno) => errno.return_value() as i32,
        };
        io_uring_cqe { user_data: sqe.user_data, res, flags: 0 }
    }

    fn handle_readv(
        &self,
        current_task: &CurrentTask,
        sqe: &io_uring_sqe,
        _flags: u32,
    ) -> Result<i32, Errno> {
        if sqe.fd < 0 {
            return error!(EBADF);
        }
        // No SQE flags are supported.
        if sqe.flags != 0 {
            return error!(EINVAL);
        }
        // Seeking is not supported, so the offset must be zero.
        if sqe.off_or_addr_or_cmd != 0 {
            return error!(EINVAL);
        }
        if sqe.ioprio != 0 {
            return error!(EINVAL);
        }
        let iovecs =
            current_task.read_iovec(UserAddress::from(sqe.addr_or_splice_off), sqe.len as i32)?;
        let file = current_task.files.get(FdNumber::from_raw(sqe.fd))?;
        let mut dst = UserBuffersOutputBuffer::new(current_task.mm(), iovecs)?;
        // Reaching end of file is a zero-length read, not a failure.
        let read = file.read_at(current_task, 0, &mut dst)?;
        Ok(read as i32)
    }
}

impl Drop for IoUringFileObject {
    fn drop(&mut self) {
        self.mf.dec_ref(self.rbmf.fr);
        self.mf.dec_ref(self.sqemf.fr);
    }
}

impl FileOps for IoUringFileObject {
    fileops_impl_dataless!();

    fn configure_mmap(&self, file: &FileObject, opts: &mut MmapOpts) -> Result<(), Errno> {
        let mappable: Arc<dyn Mappable> = match opts.offset {
            IORING_OFF_SQ_RING | IORING_OFF_CQ_RING => self.rbmf.clone(),
            IORING_OFF_SQES => self.sqemf.clone(),
            _ => return error!(EINVAL),
        };
        opts.offset = 0;
        generic_configure_mmap(file, mappable, opts)
    }
}

/// Releases the submission engine's critical section when dropped.
struct ActiveGuard<'a> {
    uring: &'a IoUringFileObject,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if self
            .uring
            .running
            .compare_exchange(1, 0, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            panic!(
                "io_uring: engine released with invalid running state {}",
                self.uring.running.load(Ordering::Relaxed)
            );
        }
        // Non-blocking: there may be no sleeper. If the channel already
        // holds a wakeup, one queued message is enough.
        let _ = self.uring.run_tx.try_send(());
    }
}

/// Implements the io_uring_setup syscall.
pub fn sys_io_uring_setup(
    current_task: &CurrentTask,
    entries: u32,
    params_addr: UserAddress,
) -> Result<FdNumber, Errno> {
    if params_addr.is_null() {
        return error!(EFAULT);
    }
    let mut params: io_uring_params = current_task.read_object(params_addr)?;
    if params.flags & (IORING_SETUP_IOPOLL | IORING_SETUP_SQPOLL) != 0 {
        track_stub!("io_uring polled setup mode", params.flags);
        return error!(EINVAL);
    }
    if params.resv != [0; 3] {
        return error!(EINVAL);
    }
    let file = IoUringFileObject::new_file(current_task, entries, &mut params)?;
    current_task.write_object(params_addr, &params)?;
    current_task.files.add(file)
}

/// Implements the io_uring_enter syscall.
pub fn sys_io_uring_enter(
    current_task: &CurrentTask,
    fd: FdNumber,
    to_submit: u32,
    min_complete: u32,
    flags: u32,
) -> Result<u32, Errno> {
    let file = current_task.files.get(fd)?;
    let uring = file.downcast_file::<IoUringFileObject>().ok_or_else(|| errno!(EOPNOTSUPP))?;
    uring.process_submissions(current_task, to_submit, min_complete, flags)
}
