use std::io::{self, Read, Write};

/// Marks an error raised by the raw source reader, as opposed to one raised
/// by a decompressor or the tar parser stacked on top of it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct SourceReadError(io::Error);

/// Whether `err` originated in the raw source rather than in decoding.
pub(crate) fn is_source_read_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<SourceReadError>())
}

/// Wraps the raw source so its failures stay recognisable after passing
/// through the decoder and tar layers.
pub(crate) struct SourceReader<R> {
    inner: R,
}

impl<R: Read> SourceReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner
            .read(buf)
            .map_err(|e| io::Error::new(e.kind(), SourceReadError(e)))
    }
}

/// A writer that counts the bytes accepted by the inner writer.
pub(crate) struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
