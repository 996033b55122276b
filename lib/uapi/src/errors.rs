// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt::{Debug, Display, Formatter};

/// An error a syscall surfaces to the guest.
///
/// Carries the kernel source location that raised it, which is what makes
/// `errno!` diagnostics useful; equality ignores the location and compares
/// codes only.
#[derive(Clone, Debug)]
pub struct Errno {
    pub code: ErrnoCode,
    location: &'static std::panic::Location<'static>,
}

impl Errno {
    #[track_caller]
    pub fn new(code: ErrnoCode) -> Self {
        Errno { code, location: std::panic::Location::caller() }
    }

    /// The value to place in a syscall return register, i.e. the negated
    /// errno as a sign-extended u64.
    pub fn return_value(&self) -> u64 {
        self.code.return_value()
    }
}

impl PartialEq for Errno {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl PartialEq<ErrnoCode> for Errno {
    fn eq(&self, other: &ErrnoCode) -> bool {
        self.code == *other
    }
}

impl Eq for Errno {}

impl Display for Errno {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "errno {} from {}", self.code, self.location)
    }
}

impl std::error::Error for Errno {}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct ErrnoCode(u32);

impl ErrnoCode {
    pub const fn return_value(&self) -> u64 {
        -(self.0 as i32) as u64
    }

    pub const fn error_code(&self) -> u32 {
        self.0
    }
}

impl Display for ErrnoCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

macro_rules! errno_codes {
    ($($name:ident),+) => {
        $(pub const $name: ErrnoCode = ErrnoCode(crate::uapi::$name);)+

        impl ErrnoCode {
            fn name(&self) -> &'static str {
                match self.0 {
                    $(
                        crate::uapi::$name => stringify!($name),
                    )+
                    _ => "unknown error code",
                }
            }
        }

        #[cfg(test)]
        #[test]
        fn expected_errno_code_strings() {
            $(
                assert_eq!(
                    $name.to_string(),
                    format!("{}({})", stringify!($name), crate::uapi::$name),
                );
            )+
        }
    };
}

errno_codes![
    EPERM,
    ENOENT,
    ESRCH,
    EINTR,
    EIO,
    ENXIO,
    E2BIG,
    ENOEXEC,
    EBADF,
    ECHILD,
    EAGAIN,
    ENOMEM,
    EACCES,
    EFAULT,
    ENOTBLK,
    EBUSY,
    EEXIST,
    EXDEV,
    ENODEV,
    ENOTDIR,
    EISDIR,
    EINVAL,
    ENFILE,
    EMFILE,
    ENOTTY,
    ETXTBSY,
    EFBIG,
    ENOSPC,
    ESPIPE,
    EROFS,
    EMLINK,
    EPIPE,
    EDOM,
    ERANGE,
    ENAMETOOLONG,
    ENOSYS,
    ENOTEMPTY,
    ELOOP,
    EOVERFLOW,
    EOPNOTSUPP,
    ETIMEDOUT
];

/// `errno` returns an `Errno` struct tagged with the current file name and line number.
///
/// Use `error!` instead if you want the `Errno` to be wrapped in an `Err`.
#[macro_export]
macro_rules! errno {
    ($err:ident) => {
        $crate::errors::Errno::new($crate::errors::$err)
    };
}

/// `error` returns a `Err` containing an `Errno` struct tagged with the current file name and line
/// number.
///
/// Use `errno!` instead if you want an unwrapped, but still tagged, `Errno`.
#[macro_export]
macro_rules! error {
    ($($args:tt)*) => { Err($crate::errno!($($args)*)) };
}

// Public re-export of macros allows them to be used like regular rust items.
pub use {errno, error};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_formatting_names_the_raising_location() {
        let location = std::panic::Location::caller();
        let errno = Errno { code: ENOENT, location };
        assert_eq!(errno.to_string(), format!("errno ENOENT(2) from {}", location));
    }

    #[test]
    fn equality_ignores_the_location() {
        let a = Errno::new(EINVAL);
        let b = Errno::new(EINVAL);
        assert_eq!(a, b);
        assert_eq!(a, EINVAL);
        assert_ne!(Errno::new(EBADF), EINVAL);
    }

    #[test]
    fn return_value_is_negated_code() {
        assert_eq!(EINTR.return_value(), -4i64 as u64);
        assert_eq!(EINVAL.return_value() as i32, -22);
    }
}
