// ─── Dependency Set ───
// Flattens a descriptor into every artifact one version needs, each tagged
// present/missing against the local store. Only stat calls (and a read of an
// already-present asset index) touch the filesystem here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::assets::{self, AssetIndex};
use crate::core::downloader::FetchResult;
use crate::core::platform::{current_os_name, platform_arch};
use crate::core::version::{LibraryRef, VersionDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    MainArchive,
    Library,
    NativeLibrary,
    AssetIndex,
    AssetObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Relative to the store root.
    pub target_path: PathBuf,
    pub source_url: String,
    pub sha1: Option<String>,
    pub size_hint: Option<u64>,
    pub platform_classifier: Option<String>,
    pub presence: Presence,
}

impl Artifact {
    pub fn is_present(&self) -> bool {
        self.presence == Presence::Present
    }

    /// Archives whose shared libraries must be unpacked before launch.
    pub fn is_native_archive(&self) -> bool {
        match self.kind {
            ArtifactKind::NativeLibrary => true,
            ArtifactKind::Library => self.platform_classifier.is_some(),
            _ => false,
        }
    }
}

/// Two sources claimed the same target path; the later one won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCollision {
    pub target_path: PathBuf,
    pub replaced_url: String,
    pub winning_url: String,
}

// ── Store layout ───

/// `versions/<id>/<id>.jar`
pub fn main_archive_relative_path(version_id: &str) -> PathBuf {
    PathBuf::from("versions")
        .join(version_id)
        .join(format!("{version_id}.jar"))
}

pub fn libraries_dir(store_root: &Path) -> PathBuf {
    store_root.join("libraries")
}

/// `<root>/libraries/natives/<os>/<arch>`
pub fn natives_dir(store_root: &Path) -> PathBuf {
    libraries_dir(store_root)
        .join("natives")
        .join(current_os_name())
        .join(platform_arch())
}

pub fn assets_dir(store_root: &Path) -> PathBuf {
    store_root.join("assets")
}

/// A present artifact exists with nonzero size.
fn stat_presence(path: &Path) -> Presence {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Presence::Present,
        _ => Presence::Missing,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySet {
    pub version_id: String,
    pub store_root: PathBuf,
    artifacts: Vec<Artifact>,
    collisions: Vec<PathCollision>,
    positions: HashMap<PathBuf, usize>,
}

impl DependencySet {
    /// Expand `descriptor` against the store at `store_root`.
    pub fn build(descriptor: &VersionDescriptor, store_root: &Path) -> Self {
        Self::build_with_resources(descriptor, store_root, assets::RESOURCES_URL)
    }

    /// [`DependencySet::build`] with asset objects served from `resources_base`.
    pub fn build_with_resources(
        descriptor: &VersionDescriptor,
        store_root: &Path,
        resources_base: &str,
    ) -> Self {
        let mut set = Self {
            version_id: descriptor.id.clone(),
            store_root: store_root.to_path_buf(),
            artifacts: Vec::new(),
            collisions: Vec::new(),
            positions: HashMap::new(),
        };

        set.push(
            ArtifactKind::MainArchive,
            main_archive_relative_path(&descriptor.id),
            descriptor.main_archive.url.clone(),
            descriptor.main_archive.sha1.clone(),
            descriptor.main_archive.size_hint,
            None,
        );

        for lib in &descriptor.libraries {
            set.push_library(ArtifactKind::Library, lib);
        }
        for lib in &descriptor.native_libraries {
            set.push_library(ArtifactKind::NativeLibrary, lib);
        }

        if let Some(index_ref) = &descriptor.asset_index {
            let index_path = assets::index_relative_path(&index_ref.id);
            let position = set.push(
                ArtifactKind::AssetIndex,
                index_path.clone(),
                index_ref.url.clone(),
                index_ref.sha1.clone(),
                index_ref.size,
                None,
            );

            if set.artifacts[position].is_present() {
                match AssetIndex::read(&store_root.join(&index_path)) {
                    Ok(index) => {
                        for object in index.unique_objects() {
                            let (Some(path), Some(url)) = (
                                assets::object_relative_path(&object.hash),
                                assets::object_url(resources_base, &object.hash),
                            ) else {
                                warn!("Skipping asset object with malformed hash {:?}", object.hash);
                                continue;
                            };
                            set.push(
                                ArtifactKind::AssetObject,
                                path,
                                url,
                                Some(object.hash.clone()),
                                Some(object.size),
                                None,
                            );
                        }
                    }
                    Err(e) => {
                        warn!("Asset index {:?} is unreadable ({}); refetching", index_path, e);
                        set.artifacts[position].presence = Presence::Missing;
                    }
                }
            } else {
                debug!("Asset index {} not present; objects deferred", index_ref.id);
            }
        }

        info!(
            "Dependency set for {}: {} artifacts, {} missing",
            set.version_id,
            set.artifacts.len(),
            set.missing_count()
        );
        set
    }

    fn push_library(&mut self, kind: ArtifactKind, lib: &LibraryRef) {
        self.push(
            kind,
            PathBuf::from("libraries").join(&lib.target_path),
            lib.source_url.clone(),
            lib.sha1.clone(),
            lib.size,
            lib.platform_classifier.clone(),
        );
    }

    /// Insert or replace by target path; returns the artifact's position.
    fn push(
        &mut self,
        kind: ArtifactKind,
        target_path: PathBuf,
        source_url: String,
        sha1: Option<String>,
        size_hint: Option<u64>,
        platform_classifier: Option<String>,
    ) -> usize {
        let presence = stat_presence(&self.store_root.join(&target_path));
        let artifact = Artifact {
            kind,
            target_path,
            source_url,
            sha1,
            size_hint,
            platform_classifier,
            presence,
        };

        match self.positions.get(&artifact.target_path) {
            Some(&position) => {
                let previous = &self.artifacts[position];
                if previous.source_url != artifact.source_url {
                    warn!(
                        "Path collision at {:?}: {} replaced by {}",
                        artifact.target_path, previous.source_url, artifact.source_url
                    );
                    self.collisions.push(PathCollision {
                        target_path: artifact.target_path.clone(),
                        replaced_url: previous.source_url.clone(),
                        winning_url: artifact.source_url.clone(),
                    });
                }
                self.artifacts[position] = artifact;
                position
            }
            None => {
                let position = self.artifacts.len();
                self.positions.insert(artifact.target_path.clone(), position);
                self.artifacts.push(artifact);
                position
            }
        }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn collisions(&self) -> &[PathCollision] {
        &self.collisions
    }

    pub fn get(&self, target_path: &Path) -> Option<&Artifact> {
        self.positions
            .get(target_path)
            .map(|&position| &self.artifacts[position])
    }

    pub fn is_present(&self, target_path: &Path) -> bool {
        self.get(target_path).is_some_and(Artifact::is_present)
    }

    pub fn missing(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| !a.is_present())
    }

    pub fn missing_count(&self) -> usize {
        self.missing().count()
    }

    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn main_archive(&self) -> Option<&Artifact> {
        self.of_kind(ArtifactKind::MainArchive).next()
    }

    pub fn asset_index(&self) -> Option<&Artifact> {
        self.of_kind(ArtifactKind::AssetIndex).next()
    }

    pub fn absolute_path(&self, artifact: &Artifact) -> PathBuf {
        self.store_root.join(&artifact.target_path)
    }

    /// Present native-classified archives, in set order.
    pub fn native_archives(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|a| a.is_native_archive() && a.is_present())
            .map(|a| self.absolute_path(a))
            .collect()
    }

    /// Mark successfully fetched artifacts present.
    pub fn apply_fetch_results(&mut self, results: &[FetchResult]) {
        for result in results.iter().filter(|r| r.ok) {
            if let Some(&position) = self.positions.get(&result.target_path) {
                self.artifacts[position].presence = Presence::Present;
            }
        }
    }
}
