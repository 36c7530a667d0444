//! Image reconciliation: make every desired image exist and become active.

use std::{collections::HashMap, sync::Arc};

use stackboot_model::{DesiredImageSet, Image, ImageHandle, ResolvedImageSet, Series};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{capability::ImageCatalog, error::CoreError, poll::PollPolicy};

pub struct ImageProvisioner {
    catalog: Arc<dyn ImageCatalog>,
    policy: PollPolicy,
}

impl ImageProvisioner {
    pub fn new(catalog: Arc<dyn ImageCatalog>) -> Self {
        Self {
            catalog,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ensure every desired image exists and wait until all are active.
    ///
    /// Images are matched by exact name; a match is reused, never recreated.
    /// Missing images are created from their spec and the cloud copies the
    /// bytes in the background. Returns once every handle was last observed
    /// `active`; a handle reaching a failed status aborts the wait.
    #[instrument(level = "info", skip_all, fields(images = desired.len()))]
    pub async fn reconcile(
        &self,
        desired: &DesiredImageSet,
        cancel: &CancellationToken,
    ) -> Result<ResolvedImageSet, CoreError> {
        let existing = self.catalog.list().await.map_err(CoreError::Catalog)?;

        let mut handles = Vec::with_capacity(desired.len());
        for (series, spec) in desired {
            let image = match find_by_name(&existing, &spec.name) {
                Some(found) => {
                    debug!(%series, name = %found.name, id = %found.id, status = %found.status, "image already exists");
                    found.clone()
                }
                None => {
                    info!(%series, name = %spec.name, source = %spec.source_url, "creating image");
                    self.catalog
                        .create(spec)
                        .await
                        .map_err(|source| CoreError::Provision {
                            series: series.clone(),
                            source,
                        })?
                }
            };

            let handle = ImageHandle::from_image(series.clone(), image);
            ensure_not_failed(&handle)?;
            handles.push(handle);
        }

        self.wait_active(&mut handles, cancel).await?;
        Ok(handles.into_iter().collect())
    }

    /// Delete every catalog image whose name matches a desired spec.
    ///
    /// Images that disappear before the delete lands count as removed.
    #[instrument(level = "info", skip_all)]
    pub async fn purge(&self, desired: &DesiredImageSet) -> Result<usize, CoreError> {
        let by_name: HashMap<&str, &Series> = desired
            .iter()
            .map(|(series, spec)| (spec.name.as_str(), series))
            .collect();

        let existing = self.catalog.list().await.map_err(CoreError::Catalog)?;
        let mut removed = 0;
        for image in existing {
            let Some(series) = by_name.get(image.name.as_str()) else {
                continue;
            };

            info!(name = %image.name, id = %image.id, "deleting image");
            match self.catalog.delete(&image.id).await {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {
                    debug!(name = %image.name, id = %image.id, "image already gone");
                }
                Err(source) => {
                    return Err(CoreError::Provision {
                        series: (*series).clone(),
                        source,
                    });
                }
            }
        }
        Ok(removed)
    }

    async fn wait_active(
        &self,
        handles: &mut [ImageHandle],
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let Some(limit) = self.policy.timeout else {
            return self.poll_until_active(handles, cancel).await;
        };

        match tokio::time::timeout(limit, self.poll_until_active(handles, cancel)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::PollTimeout {
                pending: pending_series(handles),
            }),
        }
    }

    async fn poll_until_active(
        &self,
        handles: &mut [ImageHandle],
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let mut rounds = 0u32;
        loop {
            let pending: Vec<usize> = (0..handles.len())
                .filter(|&i| !handles[i].is_active())
                .collect();
            if pending.is_empty() {
                debug!(rounds, "all images active");
                return Ok(());
            }
            if !self.policy.allows(rounds) {
                return Err(CoreError::PollExhausted {
                    attempts: rounds,
                    pending: pending_series(handles),
                });
            }

            for &i in &pending {
                let h = &handles[i];
                info!(
                    name = %h.name,
                    status = %h.status,
                    wait_secs = self.policy.interval.as_secs(),
                    "waiting for image to become active"
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("image polling cancelled");
                    return Err(CoreError::Cancelled);
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
            rounds += 1;

            for i in pending {
                let handle = &mut handles[i];
                let fresh = self
                    .catalog
                    .get(&handle.id)
                    .await
                    .map_err(|source| CoreError::Provision {
                        series: handle.series.clone(),
                        source,
                    })?;
                handle.observe(fresh);
                ensure_not_failed(handle)?;
            }
        }
    }
}

/// Prefer an active image when several share the name.
fn find_by_name<'a>(images: &'a [Image], name: &str) -> Option<&'a Image> {
    let mut matches = images.iter().filter(|i| i.name == name);
    let first = matches.next()?;
    if first.status.is_active() {
        return Some(first);
    }
    Some(matches.find(|i| i.status.is_active()).unwrap_or(first))
}

fn ensure_not_failed(handle: &ImageHandle) -> Result<(), CoreError> {
    if handle.status.is_failed() {
        return Err(CoreError::ImageFailed {
            series: handle.series.clone(),
            name: handle.name.clone(),
            status: handle.status,
        });
    }
    Ok(())
}

fn pending_series(handles: &[ImageHandle]) -> Vec<Series> {
    handles
        .iter()
        .filter(|h| h.status.is_pending())
        .map(|h| h.series.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stackboot_model::{ImageSpec, ImageStatus};

    use super::*;
    use crate::{error::CloudError, testing::FakeCatalog};

    fn trusty() -> DesiredImageSet {
        DesiredImageSet::new().with(
            "trusty",
            ImageSpec::new("trusty-image", "http://example/trusty.img"),
        )
    }

    fn provisioner(catalog: &Arc<FakeCatalog>) -> ImageProvisioner {
        ImageProvisioner::new(catalog.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn creates_missing_image_with_defaults() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Active]);

        let resolved = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap();

        let created = catalog.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "trusty-image");
        assert_eq!(created[0].disk_format, "qcow2");
        assert_eq!(created[0].container_format, "bare");
        assert_eq!(created[0].min_disk, 8);
        assert_eq!(created[0].min_ram, 256);

        let handle = resolved.get("trusty").unwrap();
        assert!(handle.is_active());
        assert_eq!(handle.name, "trusty-image");
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_reuses_images() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Saving, ImageStatus::Active]);
        let desired = trusty();
        let cancel = CancellationToken::new();

        let first = provisioner(&catalog).reconcile(&desired, &cancel).await.unwrap();
        assert_eq!(catalog.created().len(), 1);

        let second = provisioner(&catalog).reconcile(&desired, &cancel).await.unwrap();
        assert_eq!(catalog.created().len(), 1, "second run must not create");
        assert_eq!(
            first.get("trusty").unwrap().id,
            second.get("trusty").unwrap().id
        );
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_only_after_active_is_observed() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script(
            "trusty-image",
            [ImageStatus::Queued, ImageStatus::Saving, ImageStatus::Active],
        );

        let started = tokio::time::Instant::now();
        let resolved = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(catalog.get_calls(), 3);
        assert!(resolved.all_active());
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_pending_image() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.add_image("precise-image", ImageStatus::Active);
        catalog.script("trusty-image", [ImageStatus::Saving, ImageStatus::Active]);
        catalog.script("utopic-image", [ImageStatus::Active]);

        let desired = DesiredImageSet::new()
            .with("precise", ImageSpec::new("precise-image", "http://a"))
            .with("trusty", ImageSpec::new("trusty-image", "http://b"))
            .with("utopic", ImageSpec::new("utopic-image", "http://c"));

        let resolved = provisioner(&catalog)
            .reconcile(&desired, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resolved.len(), 3);
        assert!(resolved.all_active());
        // precise was active from the start and never re-fetched
        assert_eq!(catalog.get_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn create_rejection_is_fatal_and_names_series() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.fail_create(
            "trusty-image",
            CloudError::Rejected {
                status: 413,
                message: "quota".into(),
            },
        );

        let err = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provision { ref series, .. } if series == "trusty"));
        assert_eq!(catalog.get_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn killed_image_is_fatal() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Saving, ImageStatus::Killed]);

        let err = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::ImageFailed { ref series, status: ImageStatus::Killed, .. } if series == "trusty"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn existing_failed_image_is_fatal_without_polling() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.add_image("trusty-image", ImageStatus::Error);

        let err = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ImageFailed { status: ImageStatus::Error, .. }));
        assert_eq!(catalog.get_calls(), 0);
        assert!(catalog.created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prefers_active_duplicate() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.add_image("trusty-image", ImageStatus::Killed);
        let active = catalog.add_image("trusty-image", ImageStatus::Active);

        let resolved = provisioner(&catalog)
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(resolved.get("trusty").unwrap().id, active);
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_bounds_the_wait() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Saving]);

        let err = provisioner(&catalog)
            .with_policy(PollPolicy::default().with_max_attempts(3))
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PollExhausted { attempts: 3, ref pending } if pending == &["trusty"]));
        assert_eq!(catalog.get_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_bounds_the_wait() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Saving]);

        let err = provisioner(&catalog)
            .with_policy(PollPolicy::default().with_timeout(Duration::from_secs(35)))
            .reconcile(&trusty(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PollTimeout { ref pending } if pending == &["trusty"]));
        assert_eq!(catalog.get_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.script("trusty-image", [ImageStatus::Saving]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provisioner(&catalog)
            .reconcile(&trusty(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
        assert_eq!(catalog.get_calls(), 0);
    }

    #[tokio::test]
    async fn purge_deletes_matching_names_only() {
        let catalog = Arc::new(FakeCatalog::new());
        let a = catalog.add_image("trusty-image", ImageStatus::Active);
        let b = catalog.add_image("trusty-image", ImageStatus::Killed);
        catalog.add_image("unrelated", ImageStatus::Active);

        let removed = provisioner(&catalog).purge(&trusty()).await.unwrap();

        assert_eq!(removed, 2);
        let mut deleted = catalog.deleted();
        deleted.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(deleted, expected);
        assert_eq!(catalog.images().len(), 1);
    }

    #[tokio::test]
    async fn purge_tolerates_vanished_images() {
        let catalog = Arc::new(FakeCatalog::new());
        let id = catalog.add_image("trusty-image", ImageStatus::Active);
        catalog.fail_delete(&id, CloudError::not_found("image"));

        let removed = provisioner(&catalog).purge(&trusty()).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn purge_surfaces_other_failures() {
        let catalog = Arc::new(FakeCatalog::new());
        let id = catalog.add_image("trusty-image", ImageStatus::Active);
        catalog.fail_delete(
            &id,
            CloudError::Rejected {
                status: 403,
                message: "forbidden".into(),
            },
        );

        let err = provisioner(&catalog).purge(&trusty()).await.unwrap_err();
        assert!(matches!(err, CoreError::Provision { ref series, .. } if series == "trusty"));
    }
}
