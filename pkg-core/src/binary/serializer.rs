use std::io::{Seek, SeekFrom, Write};

use anyhow::Context;

/// The write-side counterpart of [`super::Deserializer`]. Tracks the
/// current stream position so two-pass writers (the exporter's
/// build-then-patch layout) can record offsets as they go without calling
/// back into the underlying stream.
pub struct Serializer<W> {
    stream_position: u64,
    stream: W,
}

impl<W> Serializer<W> {
    pub fn stream_position(&self) -> u64 {
        self.stream_position
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()>
    where
        W: Write,
    {
        self.stream
            .write_all(bytes)
            .with_context(|| format!("at stream position {:08x}", self.stream_position))?;
        self.stream_position += bytes.len() as u64;
        Ok(())
    }

    pub fn seek(&mut self, whence: SeekFrom) -> anyhow::Result<u64>
    where
        W: Seek,
    {
        self.stream_position = self.stream.seek(whence)?;
        Ok(self.stream_position)
    }
}

impl<W> Serializer<W>
where
    W: Seek,
{
    pub fn new(mut stream: W) -> anyhow::Result<Self> {
        let stream_position = stream
            .stream_position()
            .context("cannot obtain current stream position")?;
        Ok(Self {
            stream_position,
            stream,
        })
    }
}

impl<W> Serializer<W>
where
    W: Write,
{
    /// For streams that cannot report a position up front (e.g. a plain
    /// `Vec<u8>` sink rather than a `Cursor`), starting at zero is always
    /// correct since nothing has been written yet.
    pub fn from_write(stream: W) -> Self {
        Self {
            stream_position: 0,
            stream,
        }
    }
}
