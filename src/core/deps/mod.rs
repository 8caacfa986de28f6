mod dependency_set;

pub use dependency_set::{
    assets_dir, libraries_dir, main_archive_relative_path, natives_dir, Artifact, ArtifactKind,
    DependencySet, PathCollision, Presence,
};
