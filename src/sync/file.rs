//! Gzip-aware stream helpers.
//!
//! Codec adapters in [`crate::sync`] are pure over streams; these helpers
//! are the only place import/export files get opened. Compression is a
//! transparent stream transform, selected either by an explicit flag or by
//! a `.gz` path suffix.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config;
use crate::error::Result;

/// Open `path` for reading, decompressing transparently when `compress` is
/// set or the path carries a `.gz` suffix.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened.
pub fn open_reader(path: &Path, compress: bool) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if compress || config::is_gzip_path(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// A write stream that may be gzip-compressed.
///
/// Callers must invoke [`finish`](Self::finish) when done; for the gzip
/// variant that is what writes the trailer out.
pub enum StashWriter {
    /// Uncompressed file stream.
    Plain(BufWriter<File>),
    /// Gzip-compressed file stream.
    Gzip(GzEncoder<BufWriter<File>>),
}

impl StashWriter {
    /// Open `path` for writing, compressing transparently when `compress`
    /// is set or the path carries a `.gz` suffix.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn create(path: &Path, compress: bool) -> Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        if compress || config::is_gzip_path(path) {
            Ok(Self::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(Self::Plain(file))
        }
    }

    /// Finalize the stream, flushing buffers and writing the gzip trailer.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing or finishing fails.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Plain(mut file) => file.flush()?,
            Self::Gzip(encoder) => {
                encoder.finish()?.flush()?;
            }
        }
        Ok(())
    }
}

impl Write for StashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(file) => file.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(file) => file.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}
