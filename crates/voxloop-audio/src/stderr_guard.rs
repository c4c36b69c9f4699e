//! Scoped stderr silencing for noisy audio backends.
//!
//! ALSA device probing prints warnings about missing PCM plugins directly
//! to fd 2, bypassing Rust's io. The guard swaps stderr for /dev/null and
//! restores the original descriptor on drop, including on panic unwind.

use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd};

pub struct StderrGuard {
    original: Option<File>,
}

impl StderrGuard {
    pub fn new() -> io::Result<Self> {
        // SAFETY: fd 2 is always valid in a Unix process. `dup` gives us an
        // owned copy to restore from, `File::from_raw_fd` takes unique
        // ownership of that fresh descriptor, and `dup2` atomically swaps
        // the target.
        unsafe {
            let saved = libc::dup(libc::STDERR_FILENO);
            if saved < 0 {
                return Err(io::Error::last_os_error());
            }
            let original = File::from_raw_fd(saved);

            let devnull = File::open("/dev/null")?;
            if libc::dup2(devnull.as_raw_fd(), libc::STDERR_FILENO) < 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                original: Some(original),
            })
        }
    }

    /// Run `f` with stderr silenced; if silencing fails, run it anyway.
    pub fn silence<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        match Self::new() {
            Ok(guard) => {
                let result = f();
                drop(guard);
                result
            }
            Err(_) => f(),
        }
    }
}

impl Drop for StderrGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            // SAFETY: restoring the descriptor we saved in `new`. Errors are
            // ignored: Drop must not panic and there is no fallback.
            unsafe {
                libc::dup2(original.as_raw_fd(), libc::STDERR_FILENO);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_returns_closure_result_and_restores() {
        let value = StderrGuard::silence(|| {
            eprintln!("swallowed");
            41 + 1
        });
        assert_eq!(value, 42);
        // stderr is usable again after the guard drops.
        eprintln!("visible again");
    }
}
