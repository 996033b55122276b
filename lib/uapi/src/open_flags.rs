// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::uapi;
use bitflags::bitflags;

bitflags! {
    /// The true bit flags of the open(2) flag word.
    ///
    /// The low two bits are not flags at all: they hold the access mode as a
    /// small enum (O_RDONLY = 0, O_WRONLY = 1, O_RDWR = 2). O_RDONLY is
    /// deliberately absent below, since a zero-valued variant is not a bit;
    /// it is modeled as the empty set instead, and the mode is decoded with
    /// `can_read`/`can_write` rather than `contains`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct OpenFlags: u32 {
        const WRONLY = uapi::O_WRONLY;
        const RDWR = uapi::O_RDWR;

        const CREAT = uapi::O_CREAT;
        const EXCL = uapi::O_EXCL;
        const TRUNC = uapi::O_TRUNC;
        const APPEND = uapi::O_APPEND;
        const NONBLOCK = uapi::O_NONBLOCK;
        const DIRECT = uapi::O_DIRECT;
        const CLOEXEC = uapi::O_CLOEXEC;
    }
}

impl OpenFlags {
    /// The zero access mode: readable, not writable.
    pub const RDONLY: OpenFlags = OpenFlags::empty();

    fn access_mode(&self) -> u32 {
        self.bits() & uapi::O_ACCMODE
    }

    pub fn can_read(&self) -> bool {
        matches!(self.access_mode(), uapi::O_RDONLY | uapi::O_RDWR)
    }

    pub fn can_write(&self) -> bool {
        matches!(self.access_mode(), uapi::O_WRONLY | uapi::O_RDWR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_modes() {
        assert!(OpenFlags::RDONLY.can_read());
        assert!(!OpenFlags::RDONLY.can_write());
        assert!(!OpenFlags::WRONLY.can_read());
        assert!(OpenFlags::WRONLY.can_write());
        assert!(OpenFlags::RDWR.can_read());
        assert!(OpenFlags::RDWR.can_write());
    }

    #[test]
    fn access_mode_survives_other_flags() {
        let flags = OpenFlags::RDWR | OpenFlags::CLOEXEC | OpenFlags::NONBLOCK;
        assert!(flags.can_read());
        assert!(flags.can_write());
        assert!(!(OpenFlags::RDONLY | OpenFlags::CREAT).can_write());
    }
}
