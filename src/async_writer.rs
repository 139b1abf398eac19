use dsv_core::{Dialect, LineBuilder};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::writer::{finish_line, Terminator, WriterBuilder};

/// An asynchronous writer of delimited data.
///
/// Records are encoded exactly as [`Writer`](crate::Writer) encodes them.
/// Output is buffered and, since there is no asynchronous drop, must be
/// flushed explicitly with [`AsyncWriter::flush`] or
/// [`AsyncWriter::into_inner`]. Buffered records are lost otherwise.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut wtr = dsv::AsyncWriter::from_writer(vec![]);
/// wtr.write_record(&["a", "b;c"]).await.unwrap();
/// wtr.write_record(&[""]).await.unwrap();
///
/// let data = String::from_utf8(wtr.into_inner().await.unwrap()).unwrap();
/// assert_eq!(data, "a;\"b;c\"\n\"\"\n");
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncWriter<W> {
    wtr: W,
    buf: Vec<u8>,
    capacity: usize,
    line: LineBuilder,
    term: Terminator,
}

impl<W: AsyncWrite + Unpin> AsyncWriter<W> {
    pub(crate) fn new(
        dialect: Dialect,
        term: Terminator,
        capacity: usize,
        wtr: W,
    ) -> AsyncWriter<W> {
        AsyncWriter {
            wtr,
            buf: Vec::with_capacity(capacity),
            capacity,
            line: LineBuilder::new(dialect),
            term,
        }
    }

    /// Create a new asynchronous writer with the default configuration.
    pub fn from_writer(wtr: W) -> AsyncWriter<W> {
        WriterBuilder::new().from_async_writer(wtr)
    }

    /// The dialect used by this writer.
    pub fn dialect(&self) -> &Dialect {
        self.line.dialect()
    }

    /// Write a single record.
    pub async fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for field in record {
            self.line.append(field.as_ref());
        }
        self.write_terminator().await
    }

    /// Write a single field of the current record.
    pub fn write_field<T: AsRef<str>>(&mut self, field: T) {
        self.line.append(field.as_ref());
    }

    /// Finish the current record.
    pub async fn write_terminator(&mut self) -> Result<()> {
        finish_line(&mut self.line, self.term, &mut self.buf);
        if self.buf.len() >= self.capacity {
            self.flush_buf().await?;
        }
        Ok(())
    }

    /// Flush the buffered records, then flush the underlying writer.
    pub async fn flush(&mut self) -> Result<()> {
        self.flush_buf().await?;
        self.wtr.flush().await?;
        Ok(())
    }

    async fn flush_buf(&mut self) -> Result<()> {
        self.wtr.write_all(&self.buf).await?;
        self.buf.clear();
        Ok(())
    }

    /// Flush and unwrap this writer, returning the underlying writer.
    pub async fn into_inner(mut self) -> Result<W> {
        self.flush().await?;
        Ok(self.wtr)
    }
}
