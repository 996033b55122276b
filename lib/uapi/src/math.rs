// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::errors::{errno, Errno};

/// Rounds `size` up to the next multiple of `increment`.
///
/// Fails with EINVAL when `increment` is zero or when the rounded value
/// would not fit in a u64. Sizes in this kernel are u64 end to end, so
/// callers working in usize convert at the boundary.
pub fn round_up_to_increment(size: u64, increment: u64) -> Result<u64, Errno> {
    size.checked_next_multiple_of(increment).ok_or_else(|| errno!(EINVAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_multiples() {
        assert_eq!(round_up_to_increment(0, 4096).unwrap(), 0);
        assert_eq!(round_up_to_increment(1, 4096).unwrap(), 4096);
        assert_eq!(round_up_to_increment(4096, 4096).unwrap(), 4096);
        assert_eq!(round_up_to_increment(4097, 4096).unwrap(), 8192);
    }

    #[test]
    fn rejects_zero_increment_and_overflow() {
        assert!(round_up_to_increment(10, 0).is_err());
        assert!(round_up_to_increment(u64::MAX, 4096).is_err());
    }
}
