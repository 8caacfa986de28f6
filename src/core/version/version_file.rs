// ─── Version File ───
// Parses a Mojang version JSON (modern or legacy shape) and normalizes it
// into a single `VersionDescriptor`. Shape branching stops at this file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};
use crate::core::platform::{current_os_name, natives_arch_bits, platform_arch};

pub const DEFAULT_MAIN_CLASS: &str = "net.minecraft.client.main.Main";
pub const LEGACY_ASSET_INDEX: &str = "legacy";

/// Conventional client jar location for descriptors that name none.
pub fn synthesized_jar_url(id: &str) -> String {
    format!("https://launcher.mojang.com/v1/objects/{id}/{id}.jar")
}

// ─── Normalized model ───

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainArchiveRef {
    pub url: String,
    pub sha1: Option<String>,
    pub size_hint: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub logical_name: String,
    /// Relative to the `libraries/` directory of the store.
    pub target_path: PathBuf,
    pub source_url: String,
    pub platform_classifier: Option<String>,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// A resolved version, independent of the wire shape it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub id: String,
    pub main_class: String,
    pub version_type: String,
    pub main_archive: MainArchiveRef,
    /// Classpath libraries in descriptor order.
    pub libraries: Vec<LibraryRef>,
    /// Per-platform native archives selected through a classifier map.
    pub native_libraries: Vec<LibraryRef>,
    pub asset_index: Option<AssetIndexRef>,
    /// Top-level `assets` id, used when no fetchable index is declared.
    pub assets_id: Option<String>,
    pub java_major_hint: Option<u32>,
    /// Game argument template; empty means "use the built-in template".
    pub game_arguments: Vec<String>,
    pub jvm_arguments: Vec<String>,
    /// Library entries that could not be normalized, with the reason.
    pub skipped_libraries: Vec<String>,
}

impl VersionDescriptor {
    /// Asset index id for `--assetIndex`, falling back to `"legacy"`.
    pub fn asset_index_name(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.assets_id.as_deref())
            .unwrap_or(LEGACY_ASSET_INDEX)
    }
}

// ─── Wire shapes ───

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub asset_index: Option<RawAssetIndex>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssetIndex {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Value>,
    #[serde(default)]
    pub jvm: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct LibraryEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    downloads: Option<LibraryDownloads>,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    natives: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LibraryDownloads {
    #[serde(default)]
    artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    classifiers: BTreeMap<String, LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A library entry classified by shape.
#[derive(Debug, Clone)]
pub enum RawLibrary {
    /// Structured `downloads.artifact` / `downloads.classifiers`.
    Modern {
        name: Option<String>,
        artifact: Option<LibDownloadArtifact>,
        classifiers: BTreeMap<String, LibDownloadArtifact>,
        natives: Option<BTreeMap<String, String>>,
        rules: Vec<Rule>,
    },
    /// Bare Maven `name` with an optional repository `url`.
    Legacy {
        coordinate: MavenArtifact,
        url: Option<String>,
        natives: Option<BTreeMap<String, String>>,
        rules: Vec<Rule>,
    },
}

#[derive(Debug, Clone)]
pub struct RawModern {
    pub header: RawHeader,
    pub client: DownloadArtifact,
    pub libraries: Vec<RawLibrary>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawLegacy {
    pub header: RawHeader,
    pub jar_url: Option<String>,
    pub libraries: Vec<RawLibrary>,
    pub skipped: Vec<String>,
}

/// A descriptor as it arrived on the wire.
#[derive(Debug, Clone)]
pub enum RawDescriptor {
    Modern(RawModern),
    Legacy(RawLegacy),
}

// ─── Rule Evaluation ───

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    /// Feature-gated rules (demo user, custom resolution, ...) never match.
    #[serde(default)]
    pub features: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl Rule {
    fn matches_current_platform(&self) -> bool {
        if self.features.is_some() {
            return false;
        }
        match &self.os {
            None => true,
            Some(os) => {
                let name_ok = os.name.as_deref().map_or(true, |n| n == current_os_name());
                let arch_ok = os.arch.as_deref().map_or(true, |a| a == platform_arch());
                name_ok && arch_ok
            }
        }
    }
}

/// Mojang rule semantics:
/// - no rules → allowed;
/// - otherwise start disallowed and let each matching rule set the state.
pub fn rules_allow(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule.matches_current_platform() {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn extract_argument_values(value: &Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules") {
        match serde_json::from_value::<Vec<Rule>>(rules.clone()) {
            Ok(rules) if rules_allow(&rules) => {}
            _ => return vec![],
        }
    }

    match obj.get("value") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

// ─── Parsing ───

fn malformed(id: &str, reason: impl Into<String>) -> LauncherError {
    LauncherError::DescriptorMalformed {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn library_label(value: &Value) -> String {
    value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}

impl RawLibrary {
    /// Classify one raw library entry; `Err` carries the skip reason.
    fn classify(value: &Value) -> Result<Self, String> {
        let entry: LibraryEntry = serde_json::from_value(value.clone())
            .map_err(|e| format!("{}: {}", library_label(value), e))?;

        if let Some(downloads) = entry.downloads {
            return Ok(RawLibrary::Modern {
                name: entry.name,
                artifact: downloads.artifact,
                classifiers: downloads.classifiers,
                natives: entry.natives,
                rules: entry.rules,
            });
        }

        let name = entry
            .name
            .ok_or_else(|| "entry has neither downloads nor name".to_string())?;
        let coordinate =
            MavenArtifact::parse(&name).map_err(|_| format!("{name}: not a Maven coordinate"))?;
        Ok(RawLibrary::Legacy {
            coordinate,
            url: entry.url.filter(|u| !u.trim().is_empty()),
            natives: entry.natives,
            rules: entry.rules,
        })
    }
}

impl RawDescriptor {
    /// Parse descriptor JSON into its wire shape.
    ///
    /// Only structural problems (not an object, `libraries` not an array,
    /// wrongly typed top-level fields) are errors; individual library
    /// entries that cannot be understood are skipped and reported.
    pub fn parse(version_id: &str, raw: &str) -> LauncherResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| malformed(version_id, e.to_string()))?;
        let Some(obj) = value.as_object() else {
            return Err(malformed(version_id, "descriptor is not a JSON object"));
        };

        let raw_libraries = match obj.get("libraries") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => return Err(malformed(version_id, "`libraries` is not an array")),
        };

        let header: RawHeader =
            serde_json::from_value(value.clone()).map_err(|e| malformed(version_id, e.to_string()))?;

        let mut libraries = Vec::with_capacity(raw_libraries.len());
        let mut skipped = Vec::new();
        for item in raw_libraries {
            match RawLibrary::classify(item) {
                Ok(lib) => libraries.push(lib),
                Err(reason) => {
                    warn!("[{}] Skipping library entry: {}", version_id, reason);
                    skipped.push(reason);
                }
            }
        }

        let client = obj
            .get("downloads")
            .and_then(|d| d.get("client"))
            .and_then(|c| serde_json::from_value::<DownloadArtifact>(c.clone()).ok())
            .filter(|c| !c.url.trim().is_empty());

        Ok(match client {
            Some(client) => RawDescriptor::Modern(RawModern {
                header,
                client,
                libraries,
                skipped,
            }),
            None => RawDescriptor::Legacy(RawLegacy {
                header,
                jar_url: obj
                    .get("jar")
                    .and_then(|j| j.get("url"))
                    .and_then(Value::as_str)
                    .filter(|u| !u.trim().is_empty())
                    .map(ToString::to_string),
                libraries,
                skipped,
            }),
        })
    }

    /// Collapse either shape into a `VersionDescriptor`.
    pub fn normalize(self, version_id: &str) -> VersionDescriptor {
        let (header, main_archive, raw_libraries, mut skipped) = match self {
            RawDescriptor::Modern(m) => (
                m.header,
                MainArchiveRef {
                    url: m.client.url,
                    sha1: m.client.sha1,
                    size_hint: m.client.size,
                },
                m.libraries,
                m.skipped,
            ),
            RawDescriptor::Legacy(l) => {
                let id = l.header.id.clone().unwrap_or_else(|| version_id.to_string());
                let url = match l.jar_url {
                    Some(url) => url,
                    None => {
                        debug!("[{}] No client download declared; synthesizing jar URL", id);
                        synthesized_jar_url(&id)
                    }
                };
                (
                    l.header,
                    MainArchiveRef {
                        url,
                        sha1: None,
                        size_hint: None,
                    },
                    l.libraries,
                    l.skipped,
                )
            }
        };

        let mut libraries = Vec::new();
        let mut native_libraries = Vec::new();
        for lib in raw_libraries {
            if let Err(reason) = lib.normalize_into(&mut libraries, &mut native_libraries) {
                warn!("[{}] Skipping library: {}", version_id, reason);
                skipped.push(reason);
            }
        }

        let (game_arguments, jvm_arguments) = match &header.arguments {
            Some(args) => (
                args.game.iter().flat_map(extract_argument_values).collect(),
                args.jvm.iter().flat_map(extract_argument_values).collect(),
            ),
            None => (
                header
                    .minecraft_arguments
                    .as_deref()
                    .map(|s| s.split_whitespace().map(ToString::to_string).collect())
                    .unwrap_or_default(),
                Vec::new(),
            ),
        };

        let (asset_index, assets_id) = match header.asset_index {
            Some(RawAssetIndex {
                id,
                url: Some(url),
                sha1,
                size,
            }) if !url.trim().is_empty() => (
                Some(AssetIndexRef {
                    id: id.clone(),
                    url,
                    sha1,
                    size,
                }),
                header.assets.or(Some(id)),
            ),
            Some(index) => (None, header.assets.or(Some(index.id))),
            None => (None, header.assets),
        };

        VersionDescriptor {
            id: header.id.unwrap_or_else(|| version_id.to_string()),
            main_class: header
                .main_class
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MAIN_CLASS.to_string()),
            version_type: header.version_type.unwrap_or_else(|| "release".to_string()),
            main_archive,
            libraries,
            native_libraries,
            asset_index,
            assets_id,
            java_major_hint: header.java_version.map(|j| j.major_version),
            game_arguments,
            jvm_arguments,
            skipped_libraries: skipped,
        }
    }
}

/// Parse and normalize in one step.
pub fn parse_descriptor(version_id: &str, raw: &str) -> LauncherResult<VersionDescriptor> {
    Ok(RawDescriptor::parse(version_id, raw)?.normalize(version_id))
}

// ─── Library normalization ───

/// Classifier named by a `natives` map for this OS, with `${arch}` expanded.
fn natives_map_classifier(natives: &BTreeMap<String, String>) -> Option<String> {
    natives
        .get(current_os_name())
        .map(|c| c.replace("${arch}", natives_arch_bits()))
}

fn platform_natives_keys() -> &'static [&'static str] {
    match current_os_name() {
        "windows" => &["natives-windows"],
        "osx" => &["natives-osx", "natives-macos"],
        _ => &["natives-linux"],
    }
}

/// First classifier whose key names this platform. Map order is sorted.
fn scan_classifiers(classifiers: &BTreeMap<String, LibDownloadArtifact>) -> Option<String> {
    let keys = platform_natives_keys();
    classifiers
        .keys()
        .find(|k| keys.iter().any(|p| k.contains(p)))
        .cloned()
}

impl RawLibrary {
    fn normalize_into(
        self,
        libraries: &mut Vec<LibraryRef>,
        natives_out: &mut Vec<LibraryRef>,
    ) -> Result<(), String> {
        match self {
            RawLibrary::Modern {
                name,
                artifact,
                classifiers,
                natives,
                rules,
            } => {
                let label = name.clone().unwrap_or_else(|| "<unnamed>".to_string());
                if !rules_allow(&rules) {
                    debug!("Skipping library (OS rule): {}", label);
                    return Ok(());
                }
                let coordinate = name.as_deref().and_then(|n| MavenArtifact::parse(n).ok());
                let mut produced = false;

                if let Some(artifact) = artifact.filter(|a| !a.url.trim().is_empty()) {
                    let target_path = match (&artifact.path, &coordinate) {
                        (Some(path), _) if !path.is_empty() => PathBuf::from(path),
                        (_, Some(coord)) => coord.local_path(),
                        _ => return Err(format!("{label}: artifact has no path")),
                    };
                    let platform_classifier = coordinate
                        .as_ref()
                        .filter(|c| c.is_natives())
                        .and_then(|c| c.classifier.clone());
                    libraries.push(LibraryRef {
                        logical_name: label.clone(),
                        target_path,
                        source_url: artifact.url,
                        platform_classifier,
                        sha1: artifact.sha1,
                        size: artifact.size,
                    });
                    produced = true;
                }

                let classifier = match &natives {
                    Some(map) => natives_map_classifier(map),
                    None => scan_classifiers(&classifiers),
                };
                if let Some(classifier) = classifier {
                    match classifiers.get(&classifier) {
                        Some(native) if !native.url.trim().is_empty() => {
                            let target_path = match (&native.path, &coordinate) {
                                (Some(path), _) if !path.is_empty() => PathBuf::from(path),
                                (_, Some(coord)) => coord.with_classifier(&classifier).local_path(),
                                _ => return Err(format!("{label}: native artifact has no path")),
                            };
                            natives_out.push(LibraryRef {
                                logical_name: label.clone(),
                                target_path,
                                source_url: native.url.clone(),
                                platform_classifier: Some(classifier),
                                sha1: native.sha1.clone(),
                                size: native.size,
                            });
                            produced = true;
                        }
                        _ => debug!("{}: no download for classifier {}", label, classifier),
                    }
                }

                if !produced && natives.is_none() {
                    return Err(format!("{label}: no downloadable artifact"));
                }
                Ok(())
            }
            RawLibrary::Legacy {
                coordinate,
                url,
                natives,
                rules,
            } => {
                if !rules_allow(&rules) {
                    debug!("Skipping library (OS rule): {}", coordinate);
                    return Ok(());
                }

                let repo = url
                    .as_deref()
                    .filter(|u| !u.ends_with(".jar"))
                    .unwrap_or(MOJANG_LIBRARIES);

                if let Some(natives) = natives {
                    // Native-only entry: the classifier jar is the whole library.
                    if let Some(classifier) = natives_map_classifier(&natives) {
                        let native = coordinate.with_classifier(&classifier);
                        natives_out.push(LibraryRef {
                            logical_name: coordinate.to_string(),
                            target_path: native.local_path(),
                            source_url: native.url(repo),
                            platform_classifier: Some(classifier),
                            sha1: None,
                            size: None,
                        });
                    }
                    return Ok(());
                }

                let source_url = match url {
                    Some(full) if full.ends_with(".jar") => full,
                    _ => coordinate.url(repo),
                };
                libraries.push(LibraryRef {
                    logical_name: coordinate.to_string(),
                    target_path: coordinate.local_path(),
                    source_url,
                    platform_classifier: coordinate
                        .is_natives()
                        .then(|| coordinate.classifier.clone())
                        .flatten(),
                    sha1: None,
                    size: None,
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> VersionDescriptor {
        parse_descriptor("test", &value.to_string()).unwrap()
    }

    fn os_rule(action: &str, os: &str) -> Value {
        json!({"action": action, "os": {"name": os}})
    }

    #[test]
    fn modern_descriptor_uses_client_download() {
        let d = descriptor(json!({
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "downloads": {"client": {"url": "https://x/client.jar", "sha1": "abc", "size": 10}},
            "jar": {"url": "https://ignored/client.jar"},
            "assetIndex": {"id": "6", "url": "https://x/6.json", "sha1": "def"},
            "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17},
            "libraries": []
        }));
        assert_eq!(d.main_archive.url, "https://x/client.jar");
        assert_eq!(d.main_archive.size_hint, Some(10));
        assert_eq!(d.asset_index.as_ref().unwrap().id, "6");
        assert_eq!(d.asset_index_name(), "6");
        assert_eq!(d.java_major_hint, Some(17));
    }

    #[test]
    fn legacy_jar_url_is_used_when_client_download_is_absent() {
        let d = descriptor(json!({
            "id": "b1.7.3",
            "jar": {"url": "https://legacy.example/b1.7.3.jar"},
            "minecraftArguments": "${auth_player_name} ${auth_session}"
        }));
        assert_eq!(d.main_archive.url, "https://legacy.example/b1.7.3.jar");
        assert_eq!(d.game_arguments, vec!["${auth_player_name}", "${auth_session}"]);
        assert_eq!(d.main_class, DEFAULT_MAIN_CLASS);
    }

    #[test]
    fn jar_url_is_synthesized_from_id_as_last_resort() {
        let d = descriptor(json!({"id": "rd-132211", "mainClass": "com.mojang.rubydung.RubyDung"}));
        assert_eq!(
            d.main_archive.url,
            "https://launcher.mojang.com/v1/objects/rd-132211/rd-132211.jar"
        );
        assert!(d.libraries.is_empty());
    }

    #[test]
    fn missing_asset_index_falls_back_to_legacy_name() {
        let d = descriptor(json!({"id": "a1.0.4"}));
        assert!(d.asset_index.is_none());
        assert_eq!(d.asset_index_name(), "legacy");

        let d = descriptor(json!({"id": "1.6.4", "assets": "legacy"}));
        assert_eq!(d.asset_index_name(), "legacy");
    }

    #[test]
    fn structural_problems_are_malformed() {
        for raw in ["[1, 2]", "not json", r#"{"libraries": {"a": 1}}"#] {
            let err = parse_descriptor("x", raw).unwrap_err();
            assert!(matches!(err, LauncherError::DescriptorMalformed { .. }), "{raw}");
        }
    }

    #[test]
    fn unrecognized_library_entries_are_skipped_not_fatal() {
        let d = descriptor(json!({
            "id": "test",
            "libraries": [
                {"name": "com.example:good:1.0",
                 "downloads": {"artifact": {"path": "com/example/good/1.0/good-1.0.jar",
                                            "url": "https://x/good.jar", "sha1": "1", "size": 1}}},
                {"something": "else"},
                {"name": "not-a-coordinate"},
                {"name": "com.example:legacy:2.0"}
            ]
        }));
        let names: Vec<_> = d.libraries.iter().map(|l| l.logical_name.as_str()).collect();
        assert_eq!(names, vec!["com.example:good:1.0", "com.example:legacy:2.0"]);
        assert_eq!(d.skipped_libraries.len(), 2);
    }

    #[test]
    fn legacy_library_urls() {
        let d = descriptor(json!({
            "id": "test",
            "libraries": [
                {"name": "net.sf:jopt:4.5"},
                {"name": "org.example:repo:1.0", "url": "https://maven.example.org/"},
                {"name": "org.example:direct:1.0", "url": "https://cdn.example.org/direct.jar"}
            ]
        }));
        assert_eq!(
            d.libraries[0].source_url,
            "https://libraries.minecraft.net/net/sf/jopt/4.5/jopt-4.5.jar"
        );
        assert_eq!(
            d.libraries[1].source_url,
            "https://maven.example.org/org/example/repo/1.0/repo-1.0.jar"
        );
        assert_eq!(d.libraries[2].source_url, "https://cdn.example.org/direct.jar");
        assert_eq!(
            d.libraries[2].target_path,
            PathBuf::from("org/example/direct/1.0/direct-1.0.jar")
        );
    }

    #[test]
    fn native_classifier_for_current_platform_is_selected() {
        let os = current_os_name();
        let classifier = |os: &str| {
            json!({"path": format!("lwjgl-platform-natives-{os}.jar"),
                   "url": format!("https://x/natives-{os}.jar"), "sha1": os})
        };
        let d = descriptor(json!({
            "id": "1.8.9",
            "libraries": [{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "natives": {"linux": "natives-linux", "windows": "natives-windows", "osx": "natives-osx"},
                "downloads": {"classifiers": {
                    "natives-linux": classifier("linux"),
                    "natives-windows": classifier("windows"),
                    "natives-osx": classifier("osx")
                }}
            }]
        }));
        assert!(d.libraries.is_empty());
        assert_eq!(d.native_libraries.len(), 1);
        let native = &d.native_libraries[0];
        assert_eq!(native.platform_classifier.as_deref(), Some(format!("natives-{os}").as_str()));
        assert_eq!(native.source_url, format!("https://x/natives-{os}.jar"));
    }

    #[test]
    fn classifier_map_is_scanned_without_natives_map() {
        let os = match current_os_name() {
            "osx" => "macos",
            other => other,
        };
        let d = descriptor(json!({
            "id": "t",
            "libraries": [{
                "name": "org.lwjgl:lwjgl:3.3.1",
                "downloads": {"classifiers": {
                    format!("natives-{os}"): {"path": "n.jar", "url": "https://x/n.jar"},
                    "natives-plan9": {"path": "p.jar", "url": "https://x/p.jar"}
                }}
            }]
        }));
        assert_eq!(d.native_libraries.len(), 1);
        assert_eq!(d.native_libraries[0].target_path, PathBuf::from("n.jar"));
    }

    #[test]
    fn modern_natives_artifact_stays_on_classpath_with_classifier() {
        let os = current_os_name();
        let d = descriptor(json!({
            "id": "1.20.1",
            "libraries": [
                {"name": format!("org.lwjgl:lwjgl:3.3.1:natives-{os}"),
                 "downloads": {"artifact": {"path": "lwjgl-natives.jar", "url": "https://x/n.jar"}},
                 "rules": [os_rule("allow", os)]},
                {"name": "org.lwjgl:lwjgl:3.3.1:natives-plan9",
                 "downloads": {"artifact": {"path": "other.jar", "url": "https://x/o.jar"}},
                 "rules": [os_rule("allow", "plan9")]}
            ]
        }));
        assert_eq!(d.libraries.len(), 1);
        assert_eq!(
            d.libraries[0].platform_classifier.as_deref(),
            Some(format!("natives-{os}").as_str())
        );
    }

    #[test]
    fn rules_follow_last_match() {
        let os = current_os_name();
        let rules: Vec<Rule> =
            serde_json::from_value(json!([{"action": "allow"}, os_rule("disallow", os)])).unwrap();
        assert!(!rules_allow(&rules));
        assert!(rules_allow(&[]));

        let rules: Vec<Rule> = serde_json::from_value(json!([os_rule("allow", os)])).unwrap();
        assert!(rules_allow(&rules));
    }

    #[test]
    fn argument_object_rules_apply_to_current_os() {
        let os = current_os_name();
        let d = descriptor(json!({
            "id": "test",
            "arguments": {
                "game": [
                    "--username",
                    "${auth_player_name}",
                    {"rules": [os_rule("allow", os)], "value": ["--here"]},
                    {"rules": [os_rule("allow", "plan9")], "value": "--not-here"},
                    {"rules": [{"action": "allow", "features": {"is_demo_user": true}}],
                     "value": "--demo"}
                ],
                "jvm": ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
            }
        }));
        assert_eq!(d.game_arguments, vec!["--username", "${auth_player_name}", "--here"]);
        assert_eq!(d.jvm_arguments.len(), 3);
    }
}
