//! Settings file to delivered message, with attachments read from disk.

use std::io::{self, Write};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use email_service::{
    AssemblyError, ComposeError, EmailError, EmailService, Endpoint, ExtensionMimeResolver,
    FileAttachment, FileSystemAttachment, MemoryAttachment, OutgoingMessage, RoutingConfig,
    Transport, TransportError,
};
use tokio::io::{AsyncRead, ReadBuf};

#[derive(Default)]
struct CapturingTransport {
    messages: Mutex<Vec<OutgoingMessage>>,
}

#[async_trait]
impl Transport for CapturingTransport {
    async fn transmit(
        &self,
        _endpoint: &Endpoint,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Stream whose first read fails, like a dropped upload.
struct TruncatedUpload;

impl AsyncRead for TruncatedUpload {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "upload truncated")))
    }
}

struct UploadAttachment(TruncatedUpload);

impl FileAttachment for UploadAttachment {
    fn file_name(&self) -> &str {
        "firmware.bin"
    }

    fn content_stream(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut self.0
    }
}

const SETTINGS: &str = r"
Logging:
  LogLevel: Information
SMTP:
  Sender: noreply@example.com
  FriendlyName: Build Bot
  SendActive: true
  Host:
    HostName: smtp.example.com
    Port: 587
    UserName: buildbot
    Password: s3cret
    EnableSsl: true
  DebugActive: false
  MaxMessageSizeInMb: 1
";

fn settings_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    file.write_all(SETTINGS.as_bytes()).unwrap();
    file
}

fn service(transport: Arc<CapturingTransport>) -> EmailService {
    let config = RoutingConfig::from_file(settings_file().path()).unwrap();
    EmailService::new(config, transport, Arc::new(ExtensionMimeResolver::new()))
}

#[tokio::test]
async fn test_html_message_with_disk_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pdf");
    let log = dir.path().join("build.txt");
    std::fs::write(&report, b"%PDF-1.7 fake").unwrap();
    std::fs::write(&log, "compiling\nfinished\n").unwrap();

    let mut files: Vec<Box<dyn FileAttachment>> = vec![
        Box::new(FileSystemAttachment::open(&report).await.unwrap()),
        Box::new(FileSystemAttachment::open(&log).await.unwrap()),
    ];

    let transport = Arc::new(CapturingTransport::default());
    let result = service(transport.clone())
        .send(
            "jane@example.com",
            "Jane",
            "Build finished",
            "<h1>All green</h1>",
            Some("h1{color:green}"),
            &mut files,
        )
        .await
        .unwrap();
    assert!(result.success);

    let messages = transport.messages.lock().unwrap();
    let message = &messages[0];
    assert!(message.is_html);
    assert_eq!(
        message.body,
        "<html><head><style>h1{color:green}</style></head><body><h1>All green</h1></body></html>"
    );
    assert_eq!(message.sender.display_name, "Build Bot");

    let attachments: Vec<(&str, &str, &[u8])> = message
        .attachments
        .iter()
        .map(|a| (a.file_name.as_str(), a.mime_type.as_str(), &*a.content))
        .collect();
    assert_eq!(
        attachments,
        [
            ("report.pdf", "application/pdf", &b"%PDF-1.7 fake"[..]),
            ("build.txt", "text/plain", &b"compiling\nfinished\n"[..]),
        ]
    );
}

#[tokio::test]
async fn test_registered_mapping_applies_to_later_sends() {
    let transport = Arc::new(CapturingTransport::default());
    let service = service(transport.clone());
    service.mime_resolver().add_mapping(".CCAP", "application/ccapConfiguration");

    let mut files: Vec<Box<dyn FileAttachment>> =
        vec![Box::new(MemoryAttachment::new("device.ccap", vec![0x01, 0x02]))];
    service
        .send("jane@example.com", "Jane", "Device config", "see attached", None, &mut files)
        .await
        .unwrap();

    let messages = transport.messages.lock().unwrap();
    assert_eq!(messages[0].attachments[0].mime_type, "application/ccapConfiguration");
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let transport = Arc::new(CapturingTransport::default());
    let mut files: Vec<Box<dyn FileAttachment>> = vec![Box::new(MemoryAttachment::new(
        "dump.bin",
        vec![0_u8; 2 * 1024 * 1024],
    ))];

    let err = service(transport.clone())
        .send("jane@example.com", "Jane", "Core dump", "attached", None, &mut files)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EmailError::Compose(ComposeError::MessageTooLarge { limit: 1_048_576, .. })
    ));
    assert!(transport.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_config_accessor_exposes_loaded_settings() {
    let service = service(Arc::new(CapturingTransport::default()));
    let config = service.config();

    assert_eq!(config.sender, "noreply@example.com");
    assert!(config.send_active);
    assert_eq!(config.host.as_ref().map(|h| h.host_name.as_str()), Some("smtp.example.com"));
}

#[tokio::test]
async fn test_unreadable_attachment_aborts_before_any_endpoint() {
    let mut config = RoutingConfig::from_file(settings_file().path()).unwrap();
    config.debug_active = true;
    config.debug_host = Some(Endpoint::new("localhost", 1025));

    let transport = Arc::new(CapturingTransport::default());
    let service = EmailService::new(
        config,
        transport.clone(),
        Arc::new(ExtensionMimeResolver::new()),
    );

    let mut files: Vec<Box<dyn FileAttachment>> = vec![
        Box::new(MemoryAttachment::new("notes.txt", "fine")),
        Box::new(UploadAttachment(TruncatedUpload)),
    ];
    let err = service
        .send("jane@example.com", "Jane", "Firmware", "attached", None, &mut files)
        .await
        .unwrap_err();

    match err {
        EmailError::Assembly(AssemblyError::Read { file_name, source }) => {
            assert_eq!(file_name, "firmware.bin");
            assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
        }
        other => panic!("expected an attachment read error, got {other:?}"),
    }
    assert!(transport.messages.lock().unwrap().is_empty());
}
