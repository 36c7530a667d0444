use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};

use crate::{ImageHandle, ImageSpec, ModelError, Series};

/// Desired images keyed by series label.
///
/// Keys are unique by construction; iteration order is the series order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredImageSet(BTreeMap<Series, ImageSpec>);

impl DesiredImageSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace the spec for `series`.
    pub fn insert(&mut self, series: impl Into<Series>, spec: ImageSpec) -> Option<ImageSpec> {
        self.0.insert(series.into(), spec)
    }

    pub fn with(mut self, series: impl Into<Series>, spec: ImageSpec) -> Self {
        self.insert(series, spec);
        self
    }

    pub fn get(&self, series: &str) -> Option<&ImageSpec> {
        self.0.get(series)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Series, ImageSpec> {
        self.0.iter()
    }

    /// Check every spec, and that no two series claim the same image name.
    ///
    /// Image names are the identity used to find existing images, so a shared
    /// name would resolve two series to the same image.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.0.is_empty() {
            return Err(ModelError::EmptySeries);
        }
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (series, spec) in &self.0 {
            spec.validate(series)?;
            if let Some(first) = seen.insert(spec.name.as_str(), series.as_str()) {
                return Err(ModelError::DuplicateImageName {
                    name: spec.name.clone(),
                    first: first.to_string(),
                    second: series.clone(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(Series, ImageSpec)> for DesiredImageSet {
    fn from_iter<T: IntoIterator<Item = (Series, ImageSpec)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DesiredImageSet {
    type Item = (&'a Series, &'a ImageSpec);
    type IntoIter = btree_map::Iter<'a, Series, ImageSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Images resolved for a [`DesiredImageSet`], one handle per series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedImageSet(BTreeMap<Series, ImageHandle>);

impl ResolvedImageSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, handle: ImageHandle) -> Option<ImageHandle> {
        self.0.insert(handle.series.clone(), handle)
    }

    pub fn get(&self, series: &str) -> Option<&ImageHandle> {
        self.0.get(series)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Series, ImageHandle> {
        self.0.iter()
    }

    /// Returns `true` when every handle was last observed `active`.
    pub fn all_active(&self) -> bool {
        self.0.values().all(ImageHandle::is_active)
    }

    /// First handle (in series order) that is not `active`.
    pub fn first_inactive(&self) -> Option<&ImageHandle> {
        self.0.values().find(|h| !h.is_active())
    }
}

impl FromIterator<ImageHandle> for ResolvedImageSet {
    fn from_iter<T: IntoIterator<Item = ImageHandle>>(iter: T) -> Self {
        Self(iter.into_iter().map(|h| (h.series.clone(), h)).collect())
    }
}

impl<'a> IntoIterator for &'a ResolvedImageSet {
    type Item = (&'a Series, &'a ImageHandle);
    type IntoIter = btree_map::Iter<'a, Series, ImageHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
