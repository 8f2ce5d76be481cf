//! Sources of message and image payloads.
//!
//! Callers pick where a payload comes from and the [`Source`][crate::Source] reads it fully before
//! the request is issued. Files are opened and closed within the read.

use crate::Error;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Boxed reader used by the stream variants.
pub type PayloadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Where the text of a message comes from.
pub enum MessageSource {
    /// Text given directly.
    TextLiteral(String),
    /// A reader that is consumed to its end.
    Stream(PayloadStream),
    /// A UTF-8 file on disk.
    FilePath(PathBuf),
}

/// Where the bytes of an image come from.
pub enum ImageSource {
    /// Bytes given directly.
    Bytes(Vec<u8>),
    /// A reader that is consumed to its end.
    Stream(PayloadStream),
    /// A file on disk.
    FilePath(PathBuf),
}

impl MessageSource {
    /// Create a `MessageSource` from a reader.
    pub fn stream<R: AsyncRead + Send + Unpin + 'static>(reader: R) -> Self {
        MessageSource::Stream(Box::new(reader))
    }

    /// Create a `MessageSource` from a file path.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        MessageSource::FilePath(path.as_ref().to_path_buf())
    }

    /// Resolve the message to its text.
    pub async fn read_text(self) -> Result<String, Error> {
        let bytes = match self {
            MessageSource::TextLiteral(text) => return Ok(text),
            MessageSource::Stream(reader) => read_stream(reader).await?,
            MessageSource::FilePath(path) => tokio::fs::read(path).await?,
        };
        String::from_utf8(bytes).map_err(|e| Error::invalid_argument(format!("message is not valid UTF-8: {}", e)))
    }
}

impl ImageSource {
    /// Create an `ImageSource` from a reader.
    pub fn stream<R: AsyncRead + Send + Unpin + 'static>(reader: R) -> Self {
        ImageSource::Stream(Box::new(reader))
    }

    /// Create an `ImageSource` from a file path.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        ImageSource::FilePath(path.as_ref().to_path_buf())
    }

    /// Resolve the image to its raw bytes.
    pub async fn read_bytes(self) -> Result<Vec<u8>, Error> {
        match self {
            ImageSource::Bytes(bytes) => Ok(bytes),
            ImageSource::Stream(reader) => read_stream(reader).await,
            ImageSource::FilePath(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

async fn read_stream(mut reader: PayloadStream) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

impl From<String> for MessageSource {
    fn from(value: String) -> Self {
        MessageSource::TextLiteral(value)
    }
}

impl From<&str> for MessageSource {
    fn from(value: &str) -> Self {
        MessageSource::TextLiteral(value.to_string())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(value: Vec<u8>) -> Self {
        ImageSource::Bytes(value)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(value: &[u8]) -> Self {
        ImageSource::Bytes(value.to_vec())
    }
}

impl Debug for MessageSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageSource::TextLiteral(text) => f.debug_tuple("TextLiteral").field(text).finish(),
            MessageSource::Stream(_) => f.write_str("Stream"),
            MessageSource::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
        }
    }
}

impl Debug for ImageSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ImageSource::Stream(_) => f.write_str("Stream"),
            ImageSource::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn literal_text() {
        let text = MessageSource::from("hello").read_text().await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn stream_text_is_read_fully() {
        let reader = std::io::Cursor::new(b"line one\nline two\n".to_vec());
        let text = MessageSource::stream(reader).read_text().await.unwrap();
        assert_eq!(text, "line one\nline two\n");
    }

    #[tokio::test]
    async fn file_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "from a file").unwrap();

        let text = MessageSource::file(file.path()).read_text().await.unwrap();
        assert_eq!(text, "from a file");
    }

    #[tokio::test]
    async fn invalid_utf8_text() {
        let reader = std::io::Cursor::new(vec![0xff, 0xfe, 0x00]);
        let result = MessageSource::stream(reader).read_text().await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn missing_file() {
        let result = ImageSource::file("/this/path/does/not/exist.png").read_bytes().await;
        assert!(matches!(result, Err(Error::IOError(_))));
    }

    #[tokio::test]
    async fn image_bytes_are_unchanged() {
        let data: Vec<u8> = (0u8..10).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        assert_eq!(ImageSource::from(data.as_slice()).read_bytes().await.unwrap(), data);
        assert_eq!(ImageSource::file(file.path()).read_bytes().await.unwrap(), data);
        assert_eq!(ImageSource::stream(std::io::Cursor::new(data.clone())).read_bytes().await.unwrap(), data);
    }
}
