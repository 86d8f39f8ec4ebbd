use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// A seekable byte store that can be emptied in place.
///
/// Every write to the almanac starts from an empty backing, so
/// implementations only need to support truncation to zero.
pub trait Backing: Read + Write + Seek {
    /// Discard all contents.
    fn truncate(&mut self) -> io::Result<()>;

    /// Make written bytes durable.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Current length in bytes.
    fn byte_len(&mut self) -> io::Result<u64>;
}

impl Backing for File {
    fn truncate(&mut self) -> io::Result<()> {
        self.set_len(0)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }

    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl Backing for Cursor<Vec<u8>> {
    fn truncate(&mut self) -> io::Result<()> {
        self.get_mut().clear();
        self.set_position(0);
        Ok(())
    }

    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}
