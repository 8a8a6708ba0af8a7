//! # External Collaborators
//!
//! The engine depends on three services it does not implement: who is
//! signed in, how PDFs are drawn and how photos are encoded. Each sits
//! behind a trait so the platform (browser shell, desktop app, tests)
//! plugs its own in.
//!
//! ```text
//! ┌──────────────────┐   current_user / changes    ┌──────────────────┐
//! │ IdentityProvider │ ──────────────────────────► │                  │
//! └──────────────────┘                             │                  │
//! ┌──────────────────┐   render_contract/checkin   │      Engine      │
//! │ DocumentRenderer │ ◄────────────────────────── │                  │
//! └──────────────────┘                             │                  │
//! ┌──────────────────┐   to_data_uri / resize /    │                  │
//! │  ImageProcessor  │ ◄── bound_to_max_bytes ──── │                  │
//! └──────────────────┘                             └──────────────────┘
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Debug;
use thiserror::Error;
use tokio::sync::watch;

use frota_core::{Contract, Identity};

// =============================================================================
// Identity
// =============================================================================

/// Source of the signed-in user.
pub trait IdentityProvider: Send + Sync + Debug + 'static {
    fn current_user(&self) -> Option<Identity>;

    /// Receiver that observes every sign-in and sign-out.
    fn changes(&self) -> watch::Receiver<Option<Identity>>;
}

/// Identity held in a watch channel; `set` signs a user in or out.
#[derive(Debug)]
pub struct StaticIdentity {
    tx: watch::Sender<Option<Identity>>,
}

impl StaticIdentity {
    pub fn new(user: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(user);
        StaticIdentity { tx }
    }

    pub fn signed_in(id: &str, email: &str, display_name: &str) -> Self {
        Self::new(Some(Identity {
            id: id.to_string(),
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        }))
    }

    pub fn set(&self, user: Option<Identity>) {
        self.tx.send_replace(user);
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn changes(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

// =============================================================================
// Document Renderer
// =============================================================================

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Draws the printable documents.
///
/// Both calls receive the plain contract document; for the check-in the
/// contract carries its `rececao` block.
#[async_trait]
pub trait DocumentRenderer: Send + Sync + Debug + 'static {
    async fn render_contract(&self, contract: &Contract) -> Result<Vec<u8>, RenderError>;

    async fn render_checkin(&self, contract: &Contract) -> Result<Vec<u8>, RenderError>;
}

// =============================================================================
// Image Processor
// =============================================================================

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ImageError(pub String);

/// A photo as captured by the camera or file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSource {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoSource {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        PhotoSource {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "image/jpeg", bytes)
    }
}

/// Photo encoding primitives. Every result is a `data:` URI.
#[async_trait]
pub trait ImageProcessor: Send + Sync + Debug + 'static {
    async fn to_data_uri(&self, photo: &PhotoSource) -> Result<String, ImageError>;

    /// Scales down to fit `max_width` x `max_height`, keeping the aspect ratio.
    async fn resize(&self, data_uri: &str, max_width: u32, max_height: u32) -> Result<String, ImageError>;

    /// Re-encodes until the URI is at most `max_bytes` long.
    async fn bound_to_max_bytes(&self, data_uri: &str, max_bytes: usize) -> Result<String, ImageError>;
}

/// Encodes photos as-is.
///
/// Resizing is a no-op and an oversized photo is rejected rather than
/// re-encoded. Fits hosts where the capture device already bounds photos.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughImages;

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[async_trait]
impl ImageProcessor for PassthroughImages {
    async fn to_data_uri(&self, photo: &PhotoSource) -> Result<String, ImageError> {
        if photo.bytes.is_empty() {
            return Err(ImageError(format!("{} is empty", photo.file_name)));
        }
        if !photo.mime_type.starts_with("image/") {
            return Err(ImageError(format!(
                "{} is not an image ({})",
                photo.file_name, photo.mime_type
            )));
        }
        Ok(data_uri(&photo.mime_type, &photo.bytes))
    }

    async fn resize(&self, data_uri: &str, _max_width: u32, _max_height: u32) -> Result<String, ImageError> {
        Ok(data_uri.to_string())
    }

    async fn bound_to_max_bytes(&self, data_uri: &str, max_bytes: usize) -> Result<String, ImageError> {
        if data_uri.len() > max_bytes {
            return Err(ImageError(format!(
                "photo is {} bytes, limit is {}",
                data_uri.len(),
                max_bytes
            )));
        }
        Ok(data_uri.to_string())
    }
}
