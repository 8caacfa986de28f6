// ─── mcresolve Core ───
// Resolves a Minecraft version into a verified on-disk artifact set and a
// ready-to-spawn launch command.
//
// Architecture:
//   core/
//     version/     Catalog cache, descriptor fetch + normalization, OS rules
//     deps/        Dependency set: artifacts, presence, collisions
//     downloader/  Concurrent downloads with SHA-1 validation + staging
//     assets/      Asset index + object layout
//     maven/       Coordinate parsing and repository layout
//     launch/      Natives, classpath, memory policy, launch plan + spawner
//     java/        Java discovery and version probing
//     auth/        Offline account identity
//     state/       Settings persistence and the pipeline entry point

pub mod assets;
pub mod auth;
pub mod deps;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod maven;
pub mod platform;
pub mod state;
pub mod version;
