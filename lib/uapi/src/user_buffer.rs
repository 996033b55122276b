// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::errors::{errno, Errno};
use crate::user_address::UserAddress;
use smallvec::SmallVec;

/// A contiguous range of guest memory, as described by an `iovec`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UserBuffer {
    pub address: UserAddress,
    pub length: usize,
}

pub type UserBuffers = SmallVec<[UserBuffer; 1]>;

impl UserBuffer {
    /// Total byte count described by `buffers`, or EINVAL if the sum or any
    /// individual end address overflows.
    pub fn total_length(buffers: &[UserBuffer]) -> Result<usize, Errno> {
        let mut total = 0usize;
        for buffer in buffers {
            buffer.address.checked_add(buffer.length).ok_or_else(|| errno!(EINVAL))?;
            total = total.checked_add(buffer.length).ok_or_else(|| errno!(EINVAL))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn total_length_overflow() {
        let buffers: UserBuffers = smallvec![
            UserBuffer { address: UserAddress::from_raw(0x1000), length: usize::MAX },
            UserBuffer { address: UserAddress::from_raw(0x2000), length: 1 },
        ];
        assert!(UserBuffer::total_length(&buffers).is_err());
    }

    #[test]
    fn total_length_sums() {
        let buffers: UserBuffers = smallvec![
            UserBuffer { address: UserAddress::from_raw(0x1000), length: 7 },
            UserBuffer { address: UserAddress::from_raw(0x2000), length: 9 },
        ];
        assert_eq!(UserBuffer::total_length(&buffers).unwrap(), 16);
    }
}
