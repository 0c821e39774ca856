use std::io::Read;
use std::process::Child;
use std::thread::{self, JoinHandle};

use crate::error::ConvertError;

/// Octets de stderr conservés pour les messages d'erreur.
pub const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Drains a child's stderr on its own thread, keeping only the last
/// [`STDERR_TAIL_BYTES`].
///
/// A child that fills an unread stderr pipe blocks on write and stops
/// producing on stdout, so the pipe must be emptied while stdout/stdin are in
/// use, not after.
pub struct StderrTail {
    handle: Option<JoinHandle<Vec<u8>>>,
}

impl StderrTail {
    /// Take `child.stderr` (if piped) and start draining it.
    ///
    /// # Errors
    /// Returns [`ConvertError::Codec`] if the thread cannot be spawned.
    pub fn spawn(child: &mut Child, thread_name: &str) -> Result<Self, ConvertError> {
        let Some(stderr) = child.stderr.take() else {
            return Ok(Self { handle: None });
        };
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || read_tail(stderr, STDERR_TAIL_BYTES))
            .map_err(|e| ConvertError::codec("impossible de spawner le lecteur stderr", e))?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the pipe to close and return what was kept, trimmed.
    ///
    /// Call after the child has exited (or been killed).
    #[must_use]
    pub fn collect(self) -> String {
        self.handle
            .and_then(|h| h.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .unwrap_or_default()
    }
}

/// Read `reader` to EOF, keeping at most the last `limit` bytes.
pub fn read_tail<R: Read>(mut reader: R, limit: usize) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
    tail
}
