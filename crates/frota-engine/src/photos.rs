//! # Photo Pipeline
//!
//! Turns captured files into bounded data URIs, one file at a time.
//!
//! ```text
//! PhotoSource ──► to_data_uri ──► resize (max W x H) ──► [bound_to_max_bytes]
//!                                                          damage photos only
//! ```
//!
//! A file that fails any step is skipped with a warning and listed in the
//! batch's `skipped`, which every operation hands back to its caller.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::collaborators::{ImageProcessor, PhotoSource};
use crate::config::PhotoSettings;

/// A captured file that did not make it through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPhoto {
    pub file_name: String,
    pub reason: String,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoBatch {
    /// Data URIs, in input order.
    pub photos: Vec<String>,
    pub skipped: Vec<SkippedPhoto>,
}

impl PhotoBatch {
    fn skip(&mut self, source: &PhotoSource, reason: String) {
        self.skipped.push(SkippedPhoto {
            file_name: source.file_name.clone(),
            reason,
        });
    }
}

#[derive(Debug, Clone)]
pub struct PhotoPipeline {
    images: Arc<dyn ImageProcessor>,
    settings: PhotoSettings,
}

impl PhotoPipeline {
    pub fn new(images: Arc<dyn ImageProcessor>, settings: PhotoSettings) -> Self {
        PhotoPipeline { images, settings }
    }

    /// Vehicle and check-in photos: encoded and resized.
    pub async fn process(&self, sources: &[PhotoSource]) -> PhotoBatch {
        let mut batch = PhotoBatch::default();
        for source in sources {
            match self.encode_resized(source).await {
                Ok(uri) => batch.photos.push(uri),
                Err(reason) => batch.skip(source, reason),
            }
        }
        debug!(
            requested = sources.len(),
            processed = batch.photos.len(),
            skipped = batch.skipped.len(),
            "Photos processed"
        );
        batch
    }

    /// Damage photos: encoded, resized and bounded in size.
    pub async fn process_damage(&self, sources: &[PhotoSource]) -> PhotoBatch {
        let mut batch = PhotoBatch::default();
        for source in sources {
            let uri = match self.encode_resized(source).await {
                Ok(uri) => uri,
                Err(reason) => {
                    batch.skip(source, reason);
                    continue;
                }
            };
            match self
                .images
                .bound_to_max_bytes(&uri, self.settings.damage_max_bytes)
                .await
            {
                Ok(bounded) => batch.photos.push(bounded),
                Err(e) => {
                    warn!(file = %source.file_name, error = %e, "Skipping damage photo over size limit");
                    batch.skip(source, format!("over size limit: {e}"));
                }
            }
        }
        batch
    }

    /// Re-encodes stored photos for embedding in a document.
    ///
    /// A photo that cannot be resized is kept as it was.
    pub async fn reencode(&self, photos: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(photos.len());
        for photo in photos {
            match self
                .images
                .resize(photo, self.settings.max_width, self.settings.max_height)
                .await
            {
                Ok(resized) => out.push(resized),
                Err(e) => {
                    debug!(error = %e, "Keeping stored photo as-is");
                    out.push(photo.clone());
                }
            }
        }
        out
    }

    async fn encode_resized(&self, source: &PhotoSource) -> Result<String, String> {
        let uri = self.images.to_data_uri(source).await.map_err(|e| {
            warn!(file = %source.file_name, error = %e, "Skipping unreadable photo");
            format!("unreadable: {e}")
        })?;
        self.images
            .resize(&uri, self.settings.max_width, self.settings.max_height)
            .await
            .map_err(|e| {
                warn!(file = %source.file_name, error = %e, "Skipping photo that failed to resize");
                format!("resize failed: {e}")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedImages;

    fn pipeline(images: ScriptedImages) -> PhotoPipeline {
        PhotoPipeline::new(Arc::new(images), PhotoSettings::default())
    }

    #[tokio::test]
    async fn test_failed_photos_are_skipped() {
        let images = ScriptedImages::default();
        let sources = vec![
            PhotoSource::jpeg("front.jpg", vec![1]),
            PhotoSource::jpeg("bad-rear.jpg", vec![2]),
            PhotoSource::jpeg("left.jpg", vec![3]),
        ];
        let batch = pipeline(images.clone()).process(&sources).await;
        assert_eq!(batch.photos.len(), 2);
        assert!(batch.photos.iter().all(|p| p.starts_with("resized:")));
        assert_eq!(images.resize_calls(), vec![(1280, 1280), (1280, 1280)]);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].file_name, "bad-rear.jpg");
        assert!(batch.skipped[0].reason.starts_with("unreadable"));
    }

    #[tokio::test]
    async fn test_damage_photos_are_bounded() {
        let sources = vec![
            PhotoSource::jpeg("scratch.jpg", vec![1]),
            PhotoSource::jpeg("huge-dent.jpg", vec![2]),
        ];
        let batch = pipeline(ScriptedImages::default()).process_damage(&sources).await;
        assert_eq!(batch.photos.len(), 1);
        assert!(batch.photos[0].starts_with("bounded:"));
        assert_eq!(batch.skipped[0].file_name, "huge-dent.jpg");
    }

    #[tokio::test]
    async fn test_reencode_keeps_originals_on_failure() {
        let stored = vec!["data:old".to_string(), "unresizable".to_string()];
        let out = pipeline(ScriptedImages::default()).reencode(&stored).await;
        assert_eq!(out, vec!["resized:data:old".to_string(), "unresizable".to_string()]);
    }
}
