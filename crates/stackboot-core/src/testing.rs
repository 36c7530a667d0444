//! In-memory capability fakes with call recording and scripted failures.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use stackboot_model::{Image, ImageSpec, ImageStatus};
use tokio_util::sync::CancellationToken;

use crate::{
    capability::{ClusterTool, ImageCatalog, MetadataGenerator, ObjectStore},
    error::{CloudError, ToolError},
};

/// Image service whose statuses advance only when read.
///
/// Each `get` of an image pops the next status scripted for its name; the
/// last scripted status sticks. Freshly created images start `queued`.
#[derive(Default)]
pub struct FakeCatalog {
    inner: Mutex<CatalogState>,
    get_calls: AtomicUsize,
}

#[derive(Default)]
struct CatalogState {
    images: Vec<Image>,
    scripts: HashMap<String, VecDeque<ImageStatus>>,
    created: Vec<ImageSpec>,
    deleted: Vec<String>,
    create_failures: HashMap<String, CloudError>,
    delete_failures: HashMap<String, CloudError>,
    next_id: usize,
}

impl CatalogState {
    fn push(&mut self, name: &str, status: ImageStatus) -> Image {
        self.next_id += 1;
        let image = Image::new(format!("img-{}", self.next_id), name, status);
        self.images.push(image.clone());
        image
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses successive reads of images named `name` will report.
    pub fn script(&self, name: &str, statuses: impl IntoIterator<Item = ImageStatus>) {
        let mut st = self.inner.lock().unwrap();
        st.scripts.insert(name.to_string(), statuses.into_iter().collect());
    }

    /// Seed an existing image and return its id.
    pub fn add_image(&self, name: &str, status: ImageStatus) -> String {
        self.inner.lock().unwrap().push(name, status).id
    }

    pub fn fail_create(&self, name: &str, err: CloudError) {
        let mut st = self.inner.lock().unwrap();
        st.create_failures.insert(name.to_string(), err);
    }

    pub fn fail_delete(&self, id: &str, err: CloudError) {
        let mut st = self.inner.lock().unwrap();
        st.delete_failures.insert(id.to_string(), err);
    }

    pub fn created(&self) -> Vec<ImageSpec> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Ids of successfully deleted images.
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn images(&self) -> Vec<Image> {
        self.inner.lock().unwrap().images.clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageCatalog for FakeCatalog {
    async fn list(&self) -> Result<Vec<Image>, CloudError> {
        Ok(self.images())
    }

    async fn create(&self, spec: &ImageSpec) -> Result<Image, CloudError> {
        let mut st = self.inner.lock().unwrap();
        if let Some(err) = st.create_failures.get(&spec.name) {
            return Err(err.clone());
        }
        st.created.push(spec.clone());
        Ok(st.push(&spec.name, ImageStatus::Queued))
    }

    async fn get(&self, id: &str) -> Result<Image, CloudError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut st = self.inner.lock().unwrap();
        let st = &mut *st;

        let image = st
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CloudError::not_found(format!("image {id}")))?;
        if let Some(script) = st.scripts.get_mut(&image.name) {
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().copied()
            };
            if let Some(status) = next {
                image.status = status;
            }
        }
        Ok(image.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), CloudError> {
        let mut st = self.inner.lock().unwrap();
        if let Some(err) = st.delete_failures.get(id) {
            return Err(err.clone());
        }
        let before = st.images.len();
        st.images.retain(|i| i.id != id);
        if st.images.len() == before {
            return Err(CloudError::not_found(format!("image {id}")));
        }
        st.deleted.push(id.to_string());
        Ok(())
    }
}

pub const FAKE_STORAGE_URL: &str = "http://swift.example/v1/AUTH_demo";

#[derive(Default)]
struct Container {
    headers: BTreeMap<String, String>,
    objects: BTreeMap<String, Vec<u8>>,
}

/// Object store holding containers in memory.
///
/// Deleting a non-empty container is rejected with 409, as Swift does.
#[derive(Default)]
pub struct FakeObjectStore {
    inner: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    containers: BTreeMap<String, Container>,
    create_calls: usize,
    put_calls: usize,
    fail_create: Option<CloudError>,
    fail_list: Option<CloudError>,
    fail_delete_object: Option<CloudError>,
    fail_put: HashMap<String, CloudError>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container(&self, container: &str) {
        let mut st = self.inner.lock().unwrap();
        st.containers.entry(container.to_string()).or_default();
    }

    /// Seed an object, creating its container when missing.
    pub fn add_object(&self, container: &str, name: &str, body: &[u8]) {
        let mut st = self.inner.lock().unwrap();
        st.containers
            .entry(container.to_string())
            .or_default()
            .objects
            .insert(name.to_string(), body.to_vec());
    }

    /// Sorted object names, or `None` when the container does not exist.
    pub fn objects(&self, container: &str) -> Option<Vec<String>> {
        let st = self.inner.lock().unwrap();
        st.containers
            .get(container)
            .map(|c| c.objects.keys().cloned().collect())
    }

    pub fn object(&self, container: &str, name: &str) -> Option<Vec<u8>> {
        let st = self.inner.lock().unwrap();
        st.containers.get(container)?.objects.get(name).cloned()
    }

    pub fn headers(&self, container: &str) -> Option<BTreeMap<String, String>> {
        let st = self.inner.lock().unwrap();
        st.containers.get(container).map(|c| c.headers.clone())
    }

    pub fn fail_create_container(&self, err: CloudError) {
        self.inner.lock().unwrap().fail_create = Some(err);
    }

    pub fn fail_list(&self, err: CloudError) {
        self.inner.lock().unwrap().fail_list = Some(err);
    }

    /// Every object delete fails with `err`.
    pub fn fail_delete_object(&self, err: CloudError) {
        self.inner.lock().unwrap().fail_delete_object = Some(err);
    }

    pub fn fail_put(&self, object: &str, err: CloudError) {
        let mut st = self.inner.lock().unwrap();
        st.fail_put.insert(object.to_string(), err);
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().unwrap().create_calls
    }

    pub fn put_calls(&self) -> usize {
        self.inner.lock().unwrap().put_calls
    }
}

fn missing_container(container: &str) -> CloudError {
    CloudError::not_found(format!("container {container}"))
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    fn endpoint(&self) -> &str {
        FAKE_STORAGE_URL
    }

    async fn create_container(
        &self,
        container: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), CloudError> {
        let mut st = self.inner.lock().unwrap();
        st.create_calls += 1;
        if let Some(err) = &st.fail_create {
            return Err(err.clone());
        }
        let entry = st.containers.entry(container.to_string()).or_default();
        entry
            .headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn list_objects(&self, container: &str) -> Result<Vec<String>, CloudError> {
        if let Some(err) = &self.inner.lock().unwrap().fail_list {
            return Err(err.clone());
        }
        self.objects(container)
            .ok_or_else(|| missing_container(container))
    }

    async fn delete_object(&self, container: &str, object: &str) -> Result<(), CloudError> {
        let mut st = self.inner.lock().unwrap();
        if let Some(err) = &st.fail_delete_object {
            return Err(err.clone());
        }
        let c = st
            .containers
            .get_mut(container)
            .ok_or_else(|| missing_container(container))?;
        c.objects
            .remove(object)
            .map(|_| ())
            .ok_or_else(|| CloudError::not_found(format!("object {container}/{object}")))
    }

    async fn delete_container(&self, container: &str) -> Result<(), CloudError> {
        let mut st = self.inner.lock().unwrap();
        let c = st
            .containers
            .get(container)
            .ok_or_else(|| missing_container(container))?;
        if !c.objects.is_empty() {
            return Err(CloudError::Rejected {
                status: 409,
                message: "container not empty".into(),
            });
        }
        st.containers.remove(container);
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        object: &str,
        body: Vec<u8>,
    ) -> Result<(), CloudError> {
        let mut st = self.inner.lock().unwrap();
        st.put_calls += 1;
        if let Some(err) = st.fail_put.get(object) {
            return Err(err.clone());
        }
        let c = st
            .containers
            .get_mut(container)
            .ok_or_else(|| missing_container(container))?;
        c.objects.insert(object.to_string(), body);
        Ok(())
    }
}

/// One recorded `generate` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateCall {
    pub image_id: String,
    pub series: String,
    pub output_dir: PathBuf,
}

/// Writes `images/streams/v1/index.json` plus `images/streams/v1/<series>.json`
/// holding the image id.
#[derive(Default)]
pub struct FakeGenerator {
    calls: Mutex<Vec<GenerateCall>>,
    failures: Mutex<HashMap<String, ToolError>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_series(&self, series: &str, err: ToolError) {
        self.failures
            .lock()
            .unwrap()
            .insert(series.to_string(), err);
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataGenerator for FakeGenerator {
    async fn generate(
        &self,
        image_id: &str,
        series: &str,
        output_dir: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push(GenerateCall {
            image_id: image_id.to_string(),
            series: series.to_string(),
            output_dir: output_dir.to_path_buf(),
        });
        let failure = self.failures.lock().unwrap().get(series).cloned();
        if let Some(err) = failure {
            return Err(err);
        }

        let io = |e: std::io::Error| ToolError::new("fake-generator", e.to_string());
        let streams = output_dir.join("images").join("streams").join("v1");
        tokio::fs::create_dir_all(&streams).await.map_err(io)?;
        tokio::fs::write(streams.join("index.json"), b"{\"format\": \"index:1.0\"}")
            .await
            .map_err(io)?;
        tokio::fs::write(streams.join(format!("{series}.json")), image_id)
            .await
            .map_err(io)?;
        Ok(())
    }
}

/// Counts tool invocations; either command can be made to fail.
#[derive(Default)]
pub struct FakeClusterTool {
    validate_calls: AtomicUsize,
    bootstrap_calls: AtomicUsize,
    validate_failure: Mutex<Option<ToolError>>,
    bootstrap_failure: Mutex<Option<ToolError>>,
}

impl FakeClusterTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_validate(&self, err: ToolError) {
        *self.validate_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_bootstrap(&self, err: ToolError) {
        *self.bootstrap_failure.lock().unwrap() = Some(err);
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstrap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterTool for FakeClusterTool {
    async fn validate_images(&self, _cancel: &CancellationToken) -> Result<(), ToolError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match self.validate_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn bootstrap(&self, _cancel: &CancellationToken) -> Result<(), ToolError> {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        match self.bootstrap_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
