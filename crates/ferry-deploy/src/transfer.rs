//! Image transfer between engines

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};

use ferry_core::traits::ContainerEngine;
use ferry_core::{EngineError, ImageReference, ImageSummary};

use crate::error::DeployError;

/// Copies an image from one engine to another as a streamed archive
pub struct ImageTransfer<'a> {
    local: &'a dyn ContainerEngine,
    remote: &'a dyn ContainerEngine,
}

impl<'a> ImageTransfer<'a> {
    pub fn new(local: &'a dyn ContainerEngine, remote: &'a dyn ContainerEngine) -> Self {
        Self { local, remote }
    }

    /// Export `image` from the local engine and load it into the remote one
    ///
    /// The archive is never buffered whole. It is moved into the import and
    /// dropped with it, so the export stream is released whether the import
    /// succeeds or not. Nothing is removed from either engine on failure.
    pub async fn transfer(&self, image: &ImageReference) -> Result<(), DeployError> {
        let failed = |source| DeployError::Transfer {
            image: image.to_string(),
            source,
        };

        tracing::info!(
            "Exporting {} from {}",
            image,
            self.local.endpoint()
        );
        let archive = self.local.export_image(image.as_str()).await.map_err(failed)?;

        let sent = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&sent);
        let archive = archive
            .inspect_ok(move |chunk| {
                counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            })
            .boxed();

        tracing::info!("Loading {} into {}", image, self.remote.endpoint());
        self.remote.import_image(archive, true).await.map_err(failed)?;
        tracing::debug!(bytes = sent.load(Ordering::Relaxed), "Image archive streamed");

        self.verify(image).await
    }

    /// Confirm the remote engine now lists the image
    async fn verify(&self, image: &ImageReference) -> Result<(), DeployError> {
        let images = self.remote.list_images().await.map_err(|source| DeployError::Transfer {
            image: image.to_string(),
            source,
        })?;

        if images.iter().any(|summary| lists_image(summary, image)) {
            Ok(())
        } else {
            Err(DeployError::Transfer {
                image: image.to_string(),
                source: EngineError::Load(format!(
                    "{} is not listed on the remote engine after loading",
                    image.repo_tag()
                )),
            })
        }
    }
}

fn tag_matches(listed: &str, wanted: &str) -> bool {
    // Some engines list local images with a registry prefix (localhost/app:v2)
    listed == wanted
        || listed
            .strip_suffix(wanted)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

fn lists_image(summary: &ImageSummary, image: &ImageReference) -> bool {
    match image.tag() {
        Some(_) => {
            let wanted = image.repo_tag();
            summary.repo_tags.iter().any(|t| tag_matches(t, &wanted))
        }
        None => summary.repo_tags.iter().any(|t| {
            t.rsplit_once(':')
                .is_some_and(|(repo, _)| tag_matches(repo, image.repository()))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(tags: &[&str]) -> ImageSummary {
        ImageSummary {
            id: "sha256:abc".into(),
            repo_tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_tagged_image_listing() {
        let image = ImageReference::parse("app:v2").unwrap();
        assert!(lists_image(&summary(&["app:v2"]), &image));
        assert!(lists_image(&summary(&["localhost/app:v2"]), &image));
        assert!(!lists_image(&summary(&["app:v1"]), &image));
        assert!(!lists_image(&summary(&["myapp:v2"]), &image));
        assert!(!lists_image(&summary(&[]), &image));
    }

    #[test]
    fn test_untagged_image_listing() {
        let image = ImageReference::parse("app").unwrap();
        assert!(lists_image(&summary(&["app:latest"]), &image));
        assert!(lists_image(&summary(&["app:v7"]), &image));
        assert!(!lists_image(&summary(&["application:latest"]), &image));
    }
}
