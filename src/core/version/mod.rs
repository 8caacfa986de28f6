pub mod manifest;
pub mod resolver;
pub mod version_file;

pub use manifest::{
    CatalogEntry, CatalogSnapshot, CatalogSource, Freshness, ManifestCache, StaticCatalog,
    VersionKind, VersionManifest,
};
pub use resolver::{descriptor_path, DescriptorResolver};
pub use version_file::{
    parse_descriptor, AssetIndexRef, LibraryRef, MainArchiveRef, RawDescriptor, VersionDescriptor,
};
