//! src/services/upload_service.rs
//!
//! Image uploads: validation of the declared file type and size, generated
//! filenames, and the `ImageStore` backend that persists the raw bytes.
//! Bytes are stored exactly as received; nothing is resized or re-encoded.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, stream::BoxStream};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use uuid::Uuid;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Public path prefix uploaded images are served from.
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Only image files are allowed (jpeg, jpg, png, webp)")]
    UnsupportedExtension,
    #[error("Only image files are allowed (image/jpeg, image/png, image/webp)")]
    UnsupportedContentType,
    #[error("File extension `{extension}` does not match content type `{content_type}`")]
    TypeMismatch {
        extension: String,
        content_type: String,
    },
    #[error("File exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },
    #[error("invalid image filename")]
    InvalidFilename,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl UploadError {
    /// Whether the caller sent something we refuse, as opposed to a storage
    /// failure on our side.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

/// The image formats accepted for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// An upload that passed validation and is ready to be stored.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub bytes: Bytes,
    /// Extension as sent by the client, without the dot.
    pub extension: String,
    pub kind: ImageKind,
}

/// Upload rules: allowed formats and the size limit.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Check the client filename and declared content type.
    ///
    /// Both must name an allowed format, and they must name the same one.
    /// Returns the original extension and the detected kind.
    pub fn check_type(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> UploadResult<(String, ImageKind)> {
        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .ok_or(UploadError::UnsupportedExtension)?;
        let by_extension =
            ImageKind::from_extension(extension).ok_or(UploadError::UnsupportedExtension)?;

        let declared = content_type.unwrap_or_default();
        let by_content_type =
            ImageKind::from_content_type(declared).ok_or(UploadError::UnsupportedContentType)?;

        if by_extension != by_content_type {
            return Err(UploadError::TypeMismatch {
                extension: extension.to_string(),
                content_type: declared.to_string(),
            });
        }

        Ok((extension.to_string(), by_extension))
    }

    /// Reject `len` bytes if it is over the limit.
    pub fn check_size(&self, len: usize) -> UploadResult<()> {
        if len > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// `<epoch-millis>-<random below 10^9>.<extension>`
pub fn generate_filename(extension: &str) -> String {
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, extension)
}

/// A stored image opened for streaming back to a client.
pub struct StoredImage {
    pub body: BoxStream<'static, io::Result<Bytes>>,
    pub len: u64,
    pub content_type: &'static str,
}

/// Where uploaded images live. `store` returns the public URL of the image.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, upload: ValidatedUpload) -> UploadResult<String>;

    /// Open a previously stored image by filename. `Ok(None)` if missing.
    async fn open(&self, filename: &str) -> UploadResult<Option<StoredImage>>;

    /// Write/read/delete round trip used by readiness checks.
    async fn probe(&self) -> UploadResult<()>;
}

/// Stores images as plain files in one directory.
#[derive(Clone, Debug)]
pub struct LocalImageStore {
    /// Directory holding uploaded files.
    pub base_path: PathBuf,
}

impl LocalImageStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a served filename to a path inside `base_path`.
    ///
    /// Only bare filenames are accepted: no separators, no `..`, no control
    /// characters.
    fn resolve(&self, filename: &str) -> UploadResult<PathBuf> {
        if filename.is_empty()
            || filename.starts_with('.')
            || filename.contains("..")
            || filename
                .bytes()
                .any(|b| b == b'/' || b == b'\\' || b.is_ascii_control())
        {
            return Err(UploadError::InvalidFilename);
        }
        Ok(self.base_path.join(filename))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    /// Write to a temp file, fsync, then rename into place so a served file is
    /// never partially written.
    async fn store(&self, upload: ValidatedUpload) -> UploadResult<String> {
        fs::create_dir_all(&self.base_path).await?;

        let filename = generate_filename(&upload.extension);
        let file_path = self.resolve(&filename)?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        let write = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(&upload.bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &file_path).await
        };
        if let Err(err) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::Io(err));
        }

        info!(
            filename = %filename,
            size = upload.bytes.len(),
            content_type = upload.kind.content_type(),
            "stored upload"
        );
        Ok(format!("{}/{}", UPLOAD_URL_PREFIX, filename))
    }

    async fn open(&self, filename: &str) -> UploadResult<Option<StoredImage>> {
        let path = match self.resolve(filename) {
            Ok(path) => path,
            Err(_) => {
                debug!("rejected image filename {:?}", filename);
                return Ok(None);
            }
        };

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(UploadError::Io(err)),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let content_type = filename
            .rsplit_once('.')
            .and_then(|(_, ext)| ImageKind::from_extension(ext))
            .map(ImageKind::content_type)
            .unwrap_or("application/octet-stream");

        Ok(Some(StoredImage {
            body: ReaderStream::new(file).boxed(),
            len: metadata.len(),
            content_type,
        }))
    }

    async fn probe(&self) -> UploadResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read_back? != b"readyz" {
            return Err(UploadError::Io(io::Error::new(
                ErrorKind::Other,
                "file content mismatch",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn upload(bytes: Vec<u8>, extension: &str) -> ValidatedUpload {
        ValidatedUpload {
            bytes: Bytes::from(bytes),
            extension: extension.into(),
            kind: ImageKind::from_extension(extension).unwrap(),
        }
    }

    async fn read_all(image: StoredImage) -> Vec<u8> {
        let mut out = Vec::new();
        let mut body = image.body;
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[test]
    fn accepts_matching_types() {
        let policy = UploadPolicy::default();
        let (ext, kind) = policy
            .check_type(Some("holiday.JPG"), Some("image/jpeg"))
            .unwrap();
        assert_eq!(ext, "JPG");
        assert_eq!(kind, ImageKind::Jpeg);

        assert!(policy.check_type(Some("a.jpeg"), Some("image/jpg")).is_ok());
        assert!(policy.check_type(Some("a.png"), Some("image/png")).is_ok());
        assert!(policy.check_type(Some("a.b.webp"), Some("image/webp")).is_ok());
    }

    #[test]
    fn rejects_disallowed_types() {
        let policy = UploadPolicy::default();
        assert!(matches!(
            policy.check_type(Some("photo.txt"), Some("text/plain")),
            Err(UploadError::UnsupportedExtension)
        ));
        assert!(matches!(
            policy.check_type(Some("photo.txt"), Some("image/jpeg")),
            Err(UploadError::UnsupportedExtension)
        ));
        assert!(matches!(
            policy.check_type(Some("photo"), Some("image/jpeg")),
            Err(UploadError::UnsupportedExtension)
        ));
        assert!(matches!(
            policy.check_type(None, Some("image/jpeg")),
            Err(UploadError::UnsupportedExtension)
        ));
        assert!(matches!(
            policy.check_type(Some("photo.jpg"), Some("application/octet-stream")),
            Err(UploadError::UnsupportedContentType)
        ));
        assert!(matches!(
            policy.check_type(Some("photo.jpg"), None),
            Err(UploadError::UnsupportedContentType)
        ));
    }

    #[test]
    fn rejects_extension_content_type_mismatch() {
        let err = UploadPolicy::default()
            .check_type(Some("photo.png"), Some("image/jpeg"))
            .unwrap_err();
        assert!(matches!(err, UploadError::TypeMismatch { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn size_limit() {
        let policy = UploadPolicy::default();
        assert!(policy.check_size(5 * MIB).is_ok());
        assert!(policy.check_size(10 * MIB).is_ok());
        assert!(matches!(
            policy.check_size(11 * MIB),
            Err(UploadError::TooLarge { limit }) if limit == 10 * MIB
        ));
    }

    #[test]
    fn generated_filename_shape() {
        let name = generate_filename("png");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        let (millis, random) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert!(random.parse::<u64>().unwrap() < 1_000_000_000);
    }

    #[tokio::test]
    async fn stores_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("uploads"));
        let payload: Vec<u8> = (0..5 * MIB).map(|i| (i % 251) as u8).collect();

        let url = store.store(upload(payload.clone(), "jpg")).await.unwrap();
        let filename = url.strip_prefix("/uploads/").unwrap();
        assert!(filename.ends_with(".jpg"));

        let on_disk = std::fs::read(dir.path().join("uploads").join(filename)).unwrap();
        assert_eq!(on_disk, payload);

        let image = store.open(filename).await.unwrap().unwrap();
        assert_eq!(image.len, payload.len() as u64);
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(read_all(image).await, payload);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn open_rejects_traversal_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();
        let store = LocalImageStore::new(dir.path().join("uploads"));
        std::fs::create_dir_all(&store.base_path).unwrap();

        assert!(store.open("../secret.txt").await.unwrap().is_none());
        assert!(store.open("..").await.unwrap().is_none());
        assert!(store.open("missing.jpg").await.unwrap().is_none());
        assert!(matches!(
            store.resolve("a/b.jpg"),
            Err(UploadError::InvalidFilename)
        ));
    }

    #[tokio::test]
    async fn probe_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        store.probe().await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
