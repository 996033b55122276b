// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// This needs to be available to the macros in this module without clients having to depend on
// tracing themselves.
#[doc(hidden)]
pub use tracing as __tracing;

pub use tracing::Level;

#[inline]
pub const fn logs_enabled() -> bool {
    !cfg!(feature = "disable_logging")
}

#[inline]
pub const fn trace_debug_logs_enabled() -> bool {
    // Allow trace and debug logs only in debug (non-release) builds.
    logs_enabled() && cfg!(debug_assertions)
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        if $crate::trace_debug_logs_enabled() {
            $crate::__tracing::trace!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::trace_debug_logs_enabled() {
            $crate::__tracing::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::logs_enabled() {
            $crate::__tracing::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if $crate::logs_enabled() {
            $crate::__tracing::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if $crate::logs_enabled() {
            $crate::__tracing::error!($($arg)*);
        }
    };
}

/// Records that a guest exercised a surface this kernel does not implement.
///
/// Logs at WARN the first time each call site is hit and stays silent after
/// that, so a guest spinning on an unsupported opcode cannot flood the log.
#[macro_export]
macro_rules! track_stub {
    ($message:expr) => {{
        $crate::track_stub!($message, "");
    }};
    ($message:expr, $context:expr) => {{
        static STUB_LOGGED: std::sync::Once = std::sync::Once::new();
        STUB_LOGGED.call_once(|| {
            $crate::log_warn!(stub = $message, context = ?$context, "not implemented");
        });
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn track_stub_logs_once_per_site() {
        // The macro must expand in expression position and tolerate repeated hits.
        for opcode in 0..3u8 {
            track_stub!("test stub", opcode);
        }
    }
}
