//! Attachment sources and the assembler that materialises them.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::AssemblyError;
use crate::mime::MimeResolver;

/// A named byte stream supplied by the caller.
pub trait FileAttachment: Send {
    fn file_name(&self) -> &str;

    fn content_stream(&mut self) -> &mut (dyn AsyncRead + Send + Unpin);
}

/// Attachment backed by an in-memory buffer.
#[derive(Debug)]
pub struct MemoryAttachment {
    file_name: String,
    content: Cursor<Vec<u8>>,
}

impl MemoryAttachment {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: Cursor::new(content.into()),
        }
    }
}

impl FileAttachment for MemoryAttachment {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_stream(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut self.content
    }
}

/// Attachment read from disk; the attachment name is the file's name.
#[derive(Debug)]
pub struct FileSystemAttachment {
    file_name: String,
    file: tokio::fs::File,
}

impl FileSystemAttachment {
    /// # Errors
    ///
    /// Returns the I/O error from opening `path`.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self { file_name, file })
    }
}

impl FileAttachment for FileSystemAttachment {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_stream(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut self.file
    }
}

/// Transport-ready attachment owning an immutable copy of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content: Arc<[u8]>,
    pub mime_type: String,
}

impl Attachment {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Reads caller streams into [`Attachment`]s.
#[derive(Clone)]
pub struct AttachmentAssembler {
    mime_resolver: Arc<dyn MimeResolver>,
}

impl AttachmentAssembler {
    pub fn new(mime_resolver: Arc<dyn MimeResolver>) -> Self {
        Self { mime_resolver }
    }

    pub fn mime_resolver(&self) -> &Arc<dyn MimeResolver> {
        &self.mime_resolver
    }

    /// Reads every stream to the end, in order. The sources stay with the
    /// caller afterwards.
    ///
    /// # Errors
    ///
    /// The first failing read aborts assembly with [`AssemblyError::Read`];
    /// nothing assembled so far is returned.
    pub async fn assemble(
        &self,
        files: &mut [Box<dyn FileAttachment>],
    ) -> Result<Vec<Attachment>, AssemblyError> {
        let mut attachments = Vec::with_capacity(files.len());

        for file in files.iter_mut() {
            let mut content = Vec::new();
            let read = file.content_stream().read_to_end(&mut content).await;
            if let Err(source) = read {
                return Err(AssemblyError::Read {
                    file_name: file.file_name().to_string(),
                    source,
                });
            }

            let file_name = file.file_name().to_string();
            let mime_type = self.mime_resolver.resolve(&file_name);
            debug!(file_name = %file_name, mime_type = %mime_type, bytes = content.len(), "Attachment assembled");

            attachments.push(Attachment {
                file_name,
                content: content.into(),
                mime_type,
            });
        }

        Ok(attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::{ExtensionMimeResolver, MockMimeResolver};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct BrokenStream;

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream reset")))
        }
    }

    struct BrokenAttachment(BrokenStream);

    impl FileAttachment for BrokenAttachment {
        fn file_name(&self) -> &str {
            "broken.bin"
        }

        fn content_stream(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
            &mut self.0
        }
    }

    fn assembler() -> AttachmentAssembler {
        AttachmentAssembler::new(Arc::new(ExtensionMimeResolver::new()))
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let attachments = assembler().assemble(&mut []).await.unwrap();
        assert!(attachments.is_empty());
    }

    #[tokio::test]
    async fn test_assemble_preserves_order_and_bytes() {
        let mut files: Vec<Box<dyn FileAttachment>> = vec![
            Box::new(MemoryAttachment::new("b.pdf", b"%PDF-1.7".to_vec())),
            Box::new(MemoryAttachment::new("a.txt", "hello")),
            Box::new(MemoryAttachment::new("empty.bin", Vec::new())),
        ];

        let attachments = assembler().assemble(&mut files).await.unwrap();

        let names: Vec<&str> = attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["b.pdf", "a.txt", "empty.bin"]);
        assert_eq!(&*attachments[0].content, b"%PDF-1.7");
        assert_eq!(attachments[0].mime_type, "application/pdf");
        assert_eq!(&*attachments[1].content, b"hello");
        assert!(attachments[2].is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_aborts_assembly() {
        let mut files: Vec<Box<dyn FileAttachment>> = vec![
            Box::new(MemoryAttachment::new("ok.txt", "fine")),
            Box::new(BrokenAttachment(BrokenStream)),
        ];

        let err = assembler().assemble(&mut files).await.unwrap_err();
        let AssemblyError::Read { file_name, source } = err;
        assert_eq!(file_name, "broken.bin");
        assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn test_resolver_consulted_per_attachment() {
        let mut resolver = MockMimeResolver::new();
        resolver
            .expect_resolve()
            .withf(|name| name == "device.ccap")
            .times(1)
            .returning(|_| "application/ccapConfiguration".to_string());

        let assembler = AttachmentAssembler::new(Arc::new(resolver));
        let mut files: Vec<Box<dyn FileAttachment>> =
            vec![Box::new(MemoryAttachment::new("device.ccap", vec![1, 2, 3]))];

        let attachments = assembler.assemble(&mut files).await.unwrap();
        assert_eq!(attachments[0].mime_type, "application/ccapConfiguration");
    }

    #[tokio::test]
    async fn test_file_system_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build-log.txt");
        std::fs::write(&path, "step 1 ok\nstep 2 ok\n").unwrap();

        let mut files: Vec<Box<dyn FileAttachment>> =
            vec![Box::new(FileSystemAttachment::open(&path).await.unwrap())];
        let attachments = assembler().assemble(&mut files).await.unwrap();

        assert_eq!(attachments[0].file_name, "build-log.txt");
        assert_eq!(attachments[0].mime_type, "text/plain");
        assert_eq!(&*attachments[0].content, b"step 1 ok\nstep 2 ok\n");
    }
}
