//! Media-upload boundary.
//!
//! The synchronization engine never moves file bytes. A non-text idea is a
//! two-step affair driven by the caller:
//! 1. POST the file to the upload endpoint (multipart field `media`) and get
//!    back `{url, mediaType, filename}`
//! 2. Send `idea_submission` with `data.mediaURL = url`
//!
//! [`submit_idea_with_media`] strings the two together.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::BrainstormClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Content types the upload endpoint accepts.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "audio/mp3",
    "audio/wav",
    "audio/mpeg",
    "video/mp4",
    "text/plain",
    "text/link",
];

/// What the upload endpoint returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUploadResult {
    pub url: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub filename: String,
}

/// A file to upload, already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaAttachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime_type(&filename).to_string();
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }
}

/// Content type from the file extension; `application/octet-stream` when unknown.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn is_allowed_media_type(mime: &str) -> bool {
    ALLOWED_MEDIA_TYPES.contains(&mime)
}

/// Transfers a file and returns where the server stored it.
#[allow(async_fn_in_trait)]
pub trait MediaUploader {
    async fn upload(&self, attachment: &MediaAttachment) -> Result<MediaUploadResult>;
}

/// Multipart POST to the configured upload endpoint.
#[derive(Debug, Clone)]
pub struct HttpMediaUploader {
    http: Client,
    upload_url: String,
}

impl HttpMediaUploader {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            upload_url: upload_url.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.upload_url())
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

impl MediaUploader for HttpMediaUploader {
    async fn upload(&self, attachment: &MediaAttachment) -> Result<MediaUploadResult> {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.filename.clone())
            .mime_str(&attachment.mime_type)?;
        let form = Form::new().part("media", part);

        debug!(url = %self.upload_url, file = %attachment.filename, "uploading media");
        let resp = self.http.post(&self.upload_url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(url = %self.upload_url, status = status.as_u16(), "upload rejected");
            return Err(ClientError::Upload {
                status: status.as_u16(),
                url: self.upload_url.clone(),
            });
        }
        Ok(resp.json::<MediaUploadResult>().await?)
    }
}

/// Submit an idea, uploading its attachment first when there is one.
///
/// Fails before uploading when there is no current session or the server
/// would refuse the content type.
pub async fn submit_idea_with_media<U: MediaUploader>(
    client: &mut BrainstormClient,
    uploader: &U,
    content: &str,
    attachment: Option<&MediaAttachment>,
) -> Result<()> {
    let Some(attachment) = attachment else {
        return client.submit_idea(content, "text", None).await;
    };
    if client.store().current_session_id().is_none() {
        return Err(ClientError::NoCurrentSession);
    }
    if !is_allowed_media_type(&attachment.mime_type) {
        return Err(ClientError::UnsupportedMedia(attachment.mime_type.clone()));
    }
    let uploaded = uploader.upload(attachment).await?;
    client
        .submit_idea(content, &uploaded.media_type, Some(&uploaded.url))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: reads a full request, answers with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + len {
                        break;
                    }
                }
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/api/upload")
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("a.PNG"), "image/png");
        assert_eq!(guess_mime_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_mime_type("song.mp3"), "audio/mpeg");
        assert_eq!(guess_mime_type("noext"), "application/octet-stream");
    }

    #[test]
    fn test_allowlist() {
        assert!(is_allowed_media_type("image/jpeg"));
        assert!(is_allowed_media_type("text/link"));
        assert!(!is_allowed_media_type("image/gif"));
        assert!(!is_allowed_media_type("application/octet-stream"));
    }

    #[test]
    fn test_attachment_guesses_type() {
        let a = MediaAttachment::new("photo.jpg", vec![1, 2, 3]);
        assert_eq!(a.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_attachment_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello").unwrap();
        let a = MediaAttachment::from_path(&path).await.unwrap();
        assert_eq!(a.filename, "note.txt");
        assert_eq!(a.mime_type, "text/plain");
        assert_eq!(a.bytes, b"hello");
    }

    #[test]
    fn test_upload_result_wire_names() {
        let r: MediaUploadResult = serde_json::from_str(
            r#"{"url": "/media/x.png", "mediaType": "image", "filename": "x.png"}"#,
        )
        .unwrap();
        assert_eq!(r.media_type, "image");
    }

    #[tokio::test]
    async fn test_http_upload_parses_response() {
        let url = serve_once(
            "200 OK",
            r#"{"url": "/media/abc.png", "mediaType": "image", "filename": "abc.png"}"#,
        )
        .await;
        let uploader = HttpMediaUploader::new(url);
        let res = uploader
            .upload(&MediaAttachment::new("a.png", vec![0x89, 0x50]))
            .await
            .unwrap();
        assert_eq!(res.url, "/media/abc.png");
        assert_eq!(res.filename, "abc.png");
    }

    #[tokio::test]
    async fn test_http_upload_non_2xx_is_upload_error() {
        let url = serve_once("415 Unsupported Media Type", "Invalid file type").await;
        let uploader = HttpMediaUploader::new(url);
        let err = uploader
            .upload(&MediaAttachment::new("a.png", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Upload { status: 415, .. }));
    }

    struct NeverUpload;

    impl MediaUploader for NeverUpload {
        async fn upload(&self, _: &MediaAttachment) -> Result<MediaUploadResult> {
            panic!("upload must not be attempted");
        }
    }

    #[tokio::test]
    async fn test_no_session_fails_before_upload() {
        let mut client = BrainstormClient::new(ClientConfig::default());
        let a = MediaAttachment::new("a.png", vec![1]);
        let err = submit_idea_with_media(&mut client, &NeverUpload, "x", Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoCurrentSession));
    }

    #[tokio::test]
    async fn test_disallowed_type_fails_before_upload() {
        let mut client = BrainstormClient::new(ClientConfig::default());
        client.handle_frame(r#"{"type":"session_created","data":{"id":"s1"}}"#);
        let a = MediaAttachment::new("a.gif", vec![1]);
        let err = submit_idea_with_media(&mut client, &NeverUpload, "x", Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMedia(_)));
    }
}
