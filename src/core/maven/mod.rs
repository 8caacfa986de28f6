mod artifact;

pub use artifact::MavenArtifact;

/// Default repository for legacy library entries and Mojang-hosted artifacts.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
