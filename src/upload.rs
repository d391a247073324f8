// ============================================================================
// IMAGE UPLOAD — Imgur client and background upload task
// ============================================================================

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::RgbaImage;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use thiserror::Error;

use crate::settings::Settings;

const IMGUR_UPLOAD_URL: &str = "https://api.imgur.com/3/image";
const IMGUR_DELETE_URL: &str = "https://imgur.com/delete/";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Access token expired or was revoked; refresh it and try again")]
    TokenRefreshRequired,

    #[error("Server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Malformed server response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("No Imgur client id configured")]
    MissingClientId,

    #[error("Upload worker stopped without a result")]
    Disconnected,
}

/// Where an uploaded image ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    pub link: String,
    pub delete_hash: String,
}

impl UploadResponse {
    /// Page that deletes the upload when visited.
    pub fn delete_url(&self) -> String {
        format!("{}{}", IMGUR_DELETE_URL, self.delete_hash)
    }
}

/// Anything that takes PNG bytes and hands back a public link.
pub trait ImageHost: Send + 'static {
    fn upload(&self, png: &[u8]) -> Result<UploadResponse, UploadError>;
}

impl ImageHost for Box<dyn ImageHost> {
    fn upload(&self, png: &[u8]) -> Result<UploadResponse, UploadError> {
        (**self).upload(png)
    }
}

// ============================================================================
// Imgur
// ============================================================================

pub struct ImgurHost {
    client: Client,
    client_id: String,
    access_token: Option<String>,
    endpoint: String,
}

impl ImgurHost {
    /// Anonymous uploads use `client_id`; with an `access_token` the image
    /// goes to that user's account.
    pub fn new(client_id: &str, access_token: Option<&str>, timeout: Duration) -> Result<Self, UploadError> {
        let access_token = access_token.filter(|t| !t.is_empty()).map(str::to_string);
        if client_id.is_empty() && access_token.is_none() {
            return Err(UploadError::MissingClientId);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("PhotoFE/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            client_id: client_id.to_string(),
            access_token,
            endpoint: IMGUR_UPLOAD_URL.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, UploadError> {
        Self::new(
            &settings.imgur_client_id,
            Some(settings.imgur_access_token.as_str()),
            Duration::from_secs(settings.upload_timeout_secs),
        )
    }

    fn authorization(&self) -> String {
        match &self.access_token {
            Some(token) => format!("Bearer {}", token),
            None => format!("Client-ID {}", self.client_id),
        }
    }
}

impl ImageHost for ImgurHost {
    fn upload(&self, png: &[u8]) -> Result<UploadResponse, UploadError> {
        let encoded = STANDARD.encode(png);
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.authorization())
            .form(&[("image", encoded.as_str()), ("type", "base64"), ("title", "PhotoFE upload")])
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        parse_upload_response(status, &body)
    }
}

#[derive(Deserialize)]
struct ImgurEnvelope {
    #[serde(default)]
    data: ImgurData,
    #[serde(default)]
    success: bool,
    status: Option<u16>,
}

#[derive(Deserialize, Default)]
struct ImgurData {
    link: Option<String>,
    deletehash: Option<String>,
    error: Option<serde_json::Value>,
}

/// Turn an Imgur HTTP status and JSON body into a result.
pub fn parse_upload_response(http_status: u16, body: &str) -> Result<UploadResponse, UploadError> {
    if http_status == 403 {
        return Err(UploadError::TokenRefreshRequired);
    }

    let envelope: ImgurEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&http_status) => {
            return Err(UploadError::Server {
                status: http_status,
                message: body.trim().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let status = envelope.status.unwrap_or(http_status);
    if status == 403 {
        return Err(UploadError::TokenRefreshRequired);
    }

    if envelope.success
        && let Some(link) = envelope.data.link
    {
        return Ok(UploadResponse {
            link,
            delete_hash: envelope.data.deletehash.unwrap_or_default(),
        });
    }

    let message = match envelope.data.error {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Object(map)) => match map.get("message").and_then(|m| m.as_str()) {
            Some(m) => m.to_string(),
            None => serde_json::Value::Object(map.clone()).to_string(),
        },
        Some(other) => other.to_string(),
        None => "no link in response".to_string(),
    };
    Err(UploadError::Server { status, message })
}

// ============================================================================
// Background task
// ============================================================================

/// An upload running on its own thread. The result arrives once.
pub struct UploadTask {
    receiver: Receiver<Result<UploadResponse, UploadError>>,
}

impl UploadTask {
    /// Encode `image` as PNG and upload it to `host` in the background.
    pub fn spawn<H: ImageHost>(host: H, image: RgbaImage) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            crate::log_info!("Upload: starting ({}x{})", image.width(), image.height());
            let result = crate::io::encode_png(&image)
                .map_err(UploadError::from)
                .and_then(|png| host.upload(&png));
            match &result {
                Ok(response) => {
                    crate::log_info!("Upload: finished, {}", response.link);
                }
                Err(e) => {
                    crate::log_err!("Upload: failed: {}", e);
                }
            }
            let _ = tx.send(result);
        });
        Self { receiver: rx }
    }

    /// `None` while the upload is still running.
    pub fn poll(&self) -> Option<Result<UploadResponse, UploadError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(UploadError::Disconnected)),
        }
    }

    /// Block until the upload finishes.
    pub fn wait(self) -> Result<UploadResponse, UploadError> {
        self.receiver.recv().unwrap_or(Err(UploadError::Disconnected))
    }
}
