use std::io::SeekFrom;
use std::ops::{Deref, DerefMut};

use log::warn;

use crate::xbf_parser::ReadSeek;

/// Restores a stream to the position it had when the guard was created, on every exit path.
///
/// The guard dereferences to the wrapped stream, so readers borrow it instead of the stream
/// while it is alive.
pub(crate) struct PositionGuard<'a, T: ReadSeek> {
    stream: &'a mut T,
    original_position: u64,
}

impl<'a, T: ReadSeek> PositionGuard<'a, T> {
    pub(crate) fn new(stream: &'a mut T) -> std::io::Result<Self> {
        let original_position = stream.tell()?;
        Ok(PositionGuard {
            stream,
            original_position,
        })
    }
}

impl<T: ReadSeek> Deref for PositionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.stream
    }
}

impl<T: ReadSeek> DerefMut for PositionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.stream
    }
}

impl<T: ReadSeek> Drop for PositionGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.seek(SeekFrom::Start(self.original_position)) {
            warn!(
                "Failed to restore stream position to {}: {}",
                self.original_position, e
            );
        }
    }
}
