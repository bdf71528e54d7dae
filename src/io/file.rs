//! File-backed sink.

use super::Sink;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// How [`FileSink::open`] positions the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Create or truncate, writing from the start.
    #[default]
    Truncate,
    /// Create if missing, writing from the current end.
    Append,
}

/// A sink that writes straight into a file, with no buffering beyond the
/// OS's own.
///
/// [`Sink::size`] reports the current write position. [`Sink::clear`]
/// re-opens the same path truncated. Put a memory sink in front (see
/// [`Composite`](super::Composite)) when many small writes matter.
pub struct FileSink {
    file: File,
    path: PathBuf,
    pos: u64,
}

impl FileSink {
    /// Create or truncate the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> io::Result<FileSink> {
        Self::open(path, FileMode::Truncate)
    }

    /// Open the file at `path` with the given mode.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> io::Result<FileSink> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            FileMode::Truncate => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?,
            FileMode::Append => OpenOptions::new().append(true).create(true).open(&path)?,
        };
        let pos = match mode {
            FileMode::Truncate => 0,
            FileMode::Append => file.metadata()?.len(),
        };
        Ok(FileSink { file, path, pos })
    }

    /// The path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl io::Write for FileSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = self.file.write(data)?;
        self.pos += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Sink for FileSink {
    fn clear(&mut self) -> io::Result<()> {
        self.file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        self.pos = 0;
        Ok(())
    }

    fn size(&self) -> u32 {
        self.pos as u32
    }

    fn available(&self) -> u32 {
        u32::MAX
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }
}
