use base64::{engine::general_purpose, Engine};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::NutritionError;
use crate::models::ImageSource;

pub const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// URL path segment under which uploaded images are served.
pub const UPLOADS_SEGMENT: &str = "/uploads/";

/// Raw image bytes plus the MIME type sniffed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ImageBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            mime_type: sniff_mime_type(&data),
            data,
        }
    }
}

/// Detects the image format from magic bytes, defaulting to JPEG.
pub fn sniff_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Resolves image references into bytes: uploaded files are read from
/// disk, everything else is downloaded.
pub struct ImageFetcher {
    uploads_dir: PathBuf,
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(IMAGE_FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            uploads_dir: uploads_dir.into(),
            client,
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub async fn acquire(&self, source: ImageSource<'_>) -> Result<ImageBytes, NutritionError> {
        match source {
            ImageSource::Inline(encoded) => decode_inline(encoded),
            ImageSource::Reference(reference) => self.fetch(reference).await,
        }
    }

    pub async fn fetch(&self, reference: &str) -> Result<ImageBytes, NutritionError> {
        match upload_file_name(reference) {
            Some(name) => self.read_upload(name).await,
            None => self.download(reference).await,
        }
    }

    async fn read_upload(&self, name: &str) -> Result<ImageBytes, NutritionError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(NutritionError::ImageProcessing(format!(
                "Invalid upload file name: {}",
                name
            )));
        }

        let path = self.uploads_dir.join(name);
        log::debug!("📁 Reading uploaded image: {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(data) => {
                log::debug!("📊 Image file size: {} bytes", data.len());
                Ok(ImageBytes::new(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                NutritionError::ImageProcessing(format!("Image file not found: {}", name)),
            ),
            Err(e) => Err(NutritionError::ImageProcessing(format!(
                "Failed to read image file {}: {}",
                name, e
            ))),
        }
    }

    async fn download(&self, url: &str) -> Result<ImageBytes, NutritionError> {
        log::debug!("🌐 Downloading image: {}", url);

        let download_failed = |e: reqwest::Error| {
            NutritionError::ImageProcessing(format!("Failed to download image from URL: {}", e))
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(download_failed)?;
        let bytes = response.bytes().await.map_err(download_failed)?;

        log::debug!("📊 Downloaded image size: {} bytes", bytes.len());
        Ok(ImageBytes::new(bytes.to_vec()))
    }
}

/// File name of an uploaded image, if the reference points at one.
fn upload_file_name(reference: &str) -> Option<&str> {
    let path = reference
        .split_once(['?', '#'])
        .map_or(reference, |(path, _)| path);

    path.rsplit_once(UPLOADS_SEGMENT)
        .map(|(_, name)| name)
        .or_else(|| path.strip_prefix("uploads/"))
}

fn decode_inline(encoded: &str) -> Result<ImageBytes, NutritionError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let clean: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let data = general_purpose::STANDARD
        .decode(clean.as_bytes())
        .map_err(|e| NutritionError::ImageProcessing(format!("Invalid base64 image data: {}", e)))?;

    if data.is_empty() {
        return Err(NutritionError::ImageProcessing(
            "Inline image data is empty".to_string(),
        ));
    }

    Ok(ImageBytes::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_upload_file_name() {
        assert_eq!(
            upload_file_name("http://10.0.2.2:8000/uploads/abc.jpg"),
            Some("abc.jpg")
        );
        assert_eq!(upload_file_name("uploads/abc.jpg"), Some("abc.jpg"));
        assert_eq!(upload_file_name("https://cdn.example.com/a.jpg"), None);
        assert_eq!(
            upload_file_name("http://localhost:8000/uploads/a.jpg?v=2"),
            Some("a.jpg")
        );
        assert_eq!(upload_file_name("/uploads/a.jpg#top"), Some("a.jpg"));
    }

    #[tokio::test]
    async fn test_reads_local_upload_with_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meal.png"), PNG_HEADER).unwrap();
        let fetcher = ImageFetcher::new(dir.path()).unwrap();

        let image = fetcher
            .fetch("http://localhost:8000/uploads/meal.png?v=2")
            .await
            .unwrap();

        assert_eq!(image.data, PNG_HEADER.to_vec());
    }

    #[test]
    fn test_sniff_mime_type() {
        assert_eq!(sniff_mime_type(&PNG_HEADER), "image/png");
        assert_eq!(sniff_mime_type(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime_type(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
        assert_eq!(sniff_mime_type(&[]), "image/jpeg");
    }

    #[tokio::test]
    async fn test_reads_local_upload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meal.png"), PNG_HEADER).unwrap();
        let fetcher = ImageFetcher::new(dir.path()).unwrap();

        let image = fetcher
            .fetch("http://localhost:8000/uploads/meal.png")
            .await
            .unwrap();

        assert_eq!(image.data, PNG_HEADER.to_vec());
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_missing_upload_does_not_hit_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_HEADER.to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(dir.path()).unwrap();

        let err = fetcher
            .fetch(&format!("{}/uploads/missing.jpg", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, NutritionError::ImageProcessing(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(dir.path()).unwrap();

        let err = fetcher.fetch("/uploads/../secret").await.unwrap_err();
        assert!(matches!(err, NutritionError::ImageProcessing(_)));
    }

    #[tokio::test]
    async fn test_downloads_remote_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/meal.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new("uploads").unwrap();
        let image = fetcher
            .fetch(&format!("{}/images/meal.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(image.data, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_remote_error_status_is_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new("uploads").unwrap();
        let err = fetcher
            .fetch(&format!("{}/gone.jpg", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, NutritionError::ImageProcessing(_)));
        assert!(err.to_string().contains("Failed to download image"));
    }

    #[tokio::test]
    async fn test_inline_data_url() {
        let encoded = general_purpose::STANDARD.encode(PNG_HEADER);
        let fetcher = ImageFetcher::new("uploads").unwrap();

        let image = fetcher
            .acquire(ImageSource::Inline(&format!("data:image/png;base64,{}", encoded)))
            .await
            .unwrap();
        assert_eq!(image.mime_type, "image/png");

        let err = fetcher
            .acquire(ImageSource::Inline("not base64!"))
            .await
            .unwrap_err();
        assert!(matches!(err, NutritionError::ImageProcessing(_)));
    }
}
