//! Image attachment detection and download.

use std::{path::Path, time::Duration};

use {async_trait::async_trait, reqwest::StatusCode, tracing::debug};

use crate::{
    error::{Error, Result},
    types::Attachment,
};

/// File extensions treated as images, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// MIME type sent when neither the platform nor the extension tells us.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

impl Attachment {
    /// Whether the attachment is an image the vision model can read.
    #[must_use]
    pub fn is_image(&self) -> bool {
        extension(&self.filename).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            || self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"))
    }

    /// MIME type to declare for the image payload.
    #[must_use]
    pub fn image_mime_type(&self) -> String {
        if let Some(ct) = self.content_type.as_deref()
            && ct.starts_with("image/")
        {
            return ct.split(';').next().unwrap_or(ct).trim().to_string();
        }
        match extension(&self.filename).as_deref() {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => FALLBACK_IMAGE_MIME,
        }
        .to_string()
    }
}

/// Downloads attachment bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url`. Any status other than 200 is an error.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Upper bound on one attachment download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ImageFetcher`] over plain HTTP(S).
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    /// Fetcher that gives up on a download after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).timeout(self.timeout).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::Download {
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await?;
        debug!(url, size = bytes.len(), "downloaded attachment");
        Ok(bytes.to_vec())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn attachment(filename: &str, content_type: Option<&str>) -> Attachment {
        Attachment {
            filename: filename.into(),
            url: "https://cdn.example.com/a".into(),
            content_type: content_type.map(Into::into),
        }
    }

    #[rstest]
    #[case("cat.png", None, true)]
    #[case("CAT.JPG", None, true)]
    #[case("photo.jpeg", None, true)]
    #[case("anim.gif", None, true)]
    #[case("sticker.webp", None, true)]
    #[case("notes.txt", Some("text/plain"), false)]
    #[case("archive.zip", None, false)]
    #[case("noext", Some("image/heic"), true)]
    fn detects_images(
        #[case] filename: &str,
        #[case] content_type: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(attachment(filename, content_type).is_image(), expected);
    }

    #[rstest]
    #[case("a.png", None, "image/png")]
    #[case("a.JPEG", None, "image/jpeg")]
    #[case("a.webp", None, "image/webp")]
    #[case("a.png", Some("image/gif; charset=binary"), "image/gif")]
    #[case("a.bin", Some("application/octet-stream"), "image/jpeg")]
    fn picks_mime_type(
        #[case] filename: &str,
        #[case] content_type: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(attachment(filename, content_type).image_mime_type(), expected);
    }

    #[tokio::test]
    async fn fetch_returns_body_on_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cat.png")
            .with_status(200)
            .with_body(b"\x89PNG")
            .create_async()
            .await;

        let fetcher = HttpImageFetcher::new(DOWNLOAD_TIMEOUT);
        let bytes = fetcher
            .fetch(&format!("{}/cat.png", server.url()))
            .await
            .unwrap();

        assert_eq!(bytes, b"\x89PNG");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_rejects_non_200_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone.png")
            .with_status(404)
            .create_async()
            .await;

        let err = HttpImageFetcher::new(DOWNLOAD_TIMEOUT)
            .fetch(&format!("{}/gone.png", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { status: 404 }));
    }

    #[tokio::test]
    async fn fetch_treats_other_success_codes_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/partial.png")
            .with_status(206)
            .with_body("x")
            .create_async()
            .await;

        let err = HttpImageFetcher::new(DOWNLOAD_TIMEOUT)
            .fetch(&format!("{}/partial.png", server.url()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "image download failed: HTTP 206");
    }

    #[tokio::test]
    async fn fetch_times_out_on_a_silent_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let err = HttpImageFetcher::new(Duration::from_millis(200))
            .fetch(&format!("http://{addr}/cat.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Reqwest(ref e) if e.is_timeout()));
    }
}
