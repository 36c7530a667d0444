//! Metadata container preparation.

use std::sync::Arc;

use stackboot_model::ContainerTarget;
use tracing::{debug, info, instrument, warn};

use crate::{
    capability::ObjectStore,
    error::{CloudError, CoreError},
};

/// Result of the optional wipe; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeOutcome {
    /// Wipe not requested.
    Skipped,
    /// Container and its objects were deleted.
    Removed { objects: usize },
    /// Nothing to delete.
    Absent,
    /// Cleanup stopped on an unexpected error; creation still proceeds.
    Abandoned,
}

pub struct ContainerReconciler {
    store: Arc<dyn ObjectStore>,
}

impl ContainerReconciler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Make `target` exist with its access headers, optionally wiping it first.
    ///
    /// Wipe failures never fail the call: a missing container and an empty one
    /// are the same starting point. Creating the container or applying its
    /// headers is fatal on error.
    #[instrument(level = "info", skip_all, fields(container = %target.name, wipe = wipe_existing))]
    pub async fn prepare(
        &self,
        target: &ContainerTarget,
        wipe_existing: bool,
    ) -> Result<WipeOutcome, CoreError> {
        let outcome = if wipe_existing {
            self.wipe(&target.name).await
        } else {
            WipeOutcome::Skipped
        };

        self.store
            .create_container(&target.name, &target.access_headers)
            .await
            .map_err(|source| CoreError::Container {
                name: target.name.clone(),
                source,
            })?;

        info!(container = %target.name, "container ready");
        Ok(outcome)
    }

    async fn wipe(&self, container: &str) -> WipeOutcome {
        info!(%container, "looking for existing container");
        match self.delete_all(container).await {
            Ok(objects) => {
                info!(%container, objects, "container deleted");
                WipeOutcome::Removed { objects }
            }
            Err(e) if e.is_not_found() => {
                debug!(%container, "container absent; nothing to delete");
                WipeOutcome::Absent
            }
            Err(e) => {
                warn!(%container, error = %e, "container cleanup failed; continuing");
                WipeOutcome::Abandoned
            }
        }
    }

    /// Objects first, then the container itself.
    async fn delete_all(&self, container: &str) -> Result<usize, CloudError> {
        let objects = self.store.list_objects(container).await?;

        for object in &objects {
            info!(%container, %object, "deleting object");
            match self.store.delete_object(container, object).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!(%object, "object already gone"),
                Err(e) => return Err(e),
            }
        }

        info!(%container, "deleting container");
        self.store.delete_container(container).await?;
        Ok(objects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeObjectStore;

    fn forbidden() -> CloudError {
        CloudError::Rejected {
            status: 403,
            message: "forbidden".into(),
        }
    }

    #[tokio::test]
    async fn wipe_removes_existing_objects() {
        let store = Arc::new(FakeObjectStore::new());
        store.add_object("bucket", "a", b"1");
        store.add_object("bucket", "b", b"2");
        let target = ContainerTarget::public_read("bucket");

        let outcome = ContainerReconciler::new(store.clone())
            .prepare(&target, true)
            .await
            .unwrap();

        assert_eq!(outcome, WipeOutcome::Removed { objects: 2 });
        assert_eq!(store.objects("bucket"), Some(vec![]));
        assert_eq!(store.headers("bucket"), Some(target.access_headers.clone()));
    }

    #[tokio::test]
    async fn wipe_of_missing_container_is_not_fatal() {
        let store = Arc::new(FakeObjectStore::new());
        let target = ContainerTarget::public_read("bucket");

        let outcome = ContainerReconciler::new(store.clone())
            .prepare(&target, true)
            .await
            .unwrap();

        assert_eq!(outcome, WipeOutcome::Absent);
        assert_eq!(store.objects("bucket"), Some(vec![]));
    }

    #[tokio::test]
    async fn unexpected_wipe_error_is_swallowed() {
        let store = Arc::new(FakeObjectStore::new());
        store.add_object("bucket", "a", b"1");
        store.fail_delete_object(forbidden());

        let outcome = ContainerReconciler::new(store.clone())
            .prepare(&ContainerTarget::public_read("bucket"), true)
            .await
            .unwrap();

        assert_eq!(outcome, WipeOutcome::Abandoned);
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn listing_failure_abandons_wipe() {
        let store = Arc::new(FakeObjectStore::new());
        store.add_object("bucket", "a", b"1");
        store.fail_list(CloudError::Rejected {
            status: 500,
            message: "internal error".into(),
        });

        let outcome = ContainerReconciler::new(store.clone())
            .prepare(&ContainerTarget::public_read("bucket"), true)
            .await
            .unwrap();

        assert_eq!(outcome, WipeOutcome::Abandoned);
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.objects("bucket"), Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn without_wipe_existing_objects_stay() {
        let store = Arc::new(FakeObjectStore::new());
        store.add_object("bucket", "a", b"1");

        let outcome = ContainerReconciler::new(store.clone())
            .prepare(&ContainerTarget::public_read("bucket"), false)
            .await
            .unwrap();

        assert_eq!(outcome, WipeOutcome::Skipped);
        assert_eq!(store.objects("bucket"), Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn create_failure_is_fatal() {
        let store = Arc::new(FakeObjectStore::new());
        store.fail_create_container(forbidden());

        let err = ContainerReconciler::new(store)
            .prepare(&ContainerTarget::public_read("bucket"), true)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Container { ref name, .. } if name == "bucket"));
    }
}
