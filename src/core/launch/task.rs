// ─── Launch Task ───
// Assembles the game invocation (argv + environment) from a fetched
// dependency set, and spawns it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info};

use crate::core::auth::LaunchAccountProfile;
use crate::core::deps::{assets_dir, libraries_dir, natives_dir, DependencySet};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::classpath::{build_classpath, join_classpath, path_str};
use crate::core::launch::memory::{MemoryPolicy, SystemProfile};
use crate::core::platform::{classpath_separator, library_path_env_var};
use crate::core::version::VersionDescriptor;

pub const LAUNCHER_NAME: &str = "mcresolve";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// G1 tuning battery appended after the heap bounds.
pub const GC_TUNING_FLAGS: &[&str] = &[
    "-XX:+UseG1GC",
    "-XX:+ParallelRefProcEnabled",
    "-XX:MaxGCPauseMillis=200",
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+DisableExplicitGC",
    "-XX:+AlwaysPreTouch",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:G1HeapWastePercent=5",
    "-XX:G1MixedGCCountTarget=4",
    "-XX:InitiatingHeapOccupancyPercent=15",
    "-XX:G1MixedGCLiveThresholdPercent=90",
    "-XX:G1RSetUpdatingPauseTimePercent=5",
    "-XX:SurvivorRatio=32",
    "-XX:+PerfDisableSharedMem",
    "-XX:MaxTenuringThreshold=1",
    "-Dusing.aikars.flags=https://mcflags.emc.gs",
    "-Daikars.new.flags=true",
];

/// Used when a descriptor carries no game argument template.
const DEFAULT_GAME_TEMPLATE: &[&str] = &[
    "--username",
    "${auth_player_name}",
    "--version",
    "${version_name}",
    "--gameDir",
    "${game_directory}",
    "--assetsDir",
    "${assets_root}",
    "--assetIndex",
    "${assets_index_name}",
    "--uuid",
    "${auth_uuid}",
    "--accessToken",
    "${auth_access_token}",
    "--userType",
    "${user_type}",
    "--versionType",
    "${version_type}",
];

/// Set over the inherited environment under a Wayland session so the
/// X11-only toolkits in the game run through XWayland.
pub const WAYLAND_OVERLAY: &[(&str, &str)] = &[
    ("GDK_BACKEND", "x11"),
    ("QT_QPA_PLATFORM", "xcb"),
    ("SDL_VIDEODRIVER", "x11"),
    ("_JAVA_AWT_WM_NONREPARENTING", "1"),
];

/// User-facing launch options, resolved from settings.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub java_path: PathBuf,
    pub account: LaunchAccountProfile,
    pub memory: MemoryPolicy,
    pub window_width: u32,
    pub window_height: u32,
    pub extra_jvm_args: Vec<String>,
    /// Apply the Wayland overlay when a Wayland session is detected.
    pub wayland_compat: bool,
    /// Surface skipped classpath entries as warnings.
    pub debug: bool,
}

/// Everything needed to spawn the game. Recomputed per launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Executable first.
    pub process_args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
}

impl LaunchPlan {
    pub fn program(&self) -> &str {
        self.process_args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Build the invocation for `descriptor` from the fetched `set`.
///
/// Pure: the same inputs and store state produce byte-identical output.
/// Fails only when the main archive is missing.
pub fn build_launch_plan(
    descriptor: &VersionDescriptor,
    set: &DependencySet,
    config: &LaunchConfig,
    system: &SystemProfile,
    inherited_env: &BTreeMap<String, String>,
) -> LauncherResult<LaunchPlan> {
    let main = set
        .main_archive()
        .ok_or_else(|| LauncherError::MainArchiveMissing(set.store_root.clone()))?;
    if !main.is_present() {
        return Err(LauncherError::MainArchiveMissing(set.absolute_path(main)));
    }

    let store_root = set.store_root.as_path();
    let natives = natives_dir(store_root);
    let classpath = join_classpath(&build_classpath(descriptor, set, config.debug));
    let account = config.account.clone().sanitized();

    let placeholders = Placeholders::new(descriptor, store_root, &natives, &classpath, &account);

    // ── JVM Arguments ──
    let heap_mib = config.memory.resolve_mib(system.total_memory_bytes);
    let mut jvm_args = vec![format!("-Xmx{heap_mib}M"), format!("-Xms{heap_mib}M")];
    jvm_args.extend(GC_TUNING_FLAGS.iter().map(|f| f.to_string()));
    jvm_args.extend(sanitize_jvm_args(&descriptor.jvm_arguments, &placeholders));

    let natives_str = path_str(&natives);
    set_jvm_system_property(&mut jvm_args, "java.library.path", &natives_str);
    set_jvm_system_property(&mut jvm_args, "org.lwjgl.librarypath", &natives_str);
    set_jvm_system_property(&mut jvm_args, "minecraft.launcher.brand", LAUNCHER_NAME);
    set_jvm_system_property(&mut jvm_args, "minecraft.launcher.version", LAUNCHER_VERSION);
    jvm_args.extend(config.extra_jvm_args.iter().cloned());

    // ── Game Arguments ──
    let template: Vec<String> = if descriptor.game_arguments.is_empty() {
        DEFAULT_GAME_TEMPLATE.iter().map(|s| s.to_string()).collect()
    } else {
        descriptor.game_arguments.clone()
    };
    let mut game_args = sanitize_game_args(&template, &placeholders);
    if !contains_flag(&game_args, "--width") && !contains_flag(&game_args, "--height") {
        game_args.push("--width".into());
        game_args.push(config.window_width.to_string());
        game_args.push("--height".into());
        game_args.push(config.window_height.to_string());
    }

    let mut process_args = Vec::with_capacity(jvm_args.len() + game_args.len() + 4);
    process_args.push(path_str(&config.java_path));
    process_args.extend(jvm_args);
    process_args.push("-cp".into());
    process_args.push(classpath);
    process_args.push(descriptor.main_class.clone());
    process_args.extend(game_args);

    let env = build_environment(inherited_env, &natives_str, config.wayland_compat);

    Ok(LaunchPlan {
        process_args,
        env,
        working_dir: store_root.to_path_buf(),
    })
}

// ── Placeholders ───

struct Placeholders {
    values: Vec<(&'static str, String)>,
}

impl Placeholders {
    fn new(
        descriptor: &VersionDescriptor,
        store_root: &Path,
        natives: &Path,
        classpath: &str,
        account: &LaunchAccountProfile,
    ) -> Self {
        let game_dir = path_str(store_root);
        let assets_root = path_str(&assets_dir(store_root));
        let values = vec![
            ("${auth_player_name}", account.username.clone()),
            ("${version_name}", descriptor.id.clone()),
            ("${game_directory}", game_dir),
            ("${assets_root}", assets_root.clone()),
            ("${game_assets}", assets_root),
            ("${assets_index_name}", descriptor.asset_index_name().to_string()),
            ("${auth_uuid}", account.uuid.clone()),
            ("${auth_access_token}", account.access_token.clone()),
            ("${auth_session}", account.access_token.clone()),
            ("${auth_xuid}", account.xuid.clone()),
            ("${clientid}", account.client_id.clone()),
            ("${user_type}", account.user_type.clone()),
            ("${user_properties}", "{}".to_string()),
            ("${version_type}", descriptor.version_type.clone()),
            ("${natives_directory}", path_str(natives)),
            ("${library_directory}", path_str(&libraries_dir(store_root))),
            ("${classpath_separator}", classpath_separator().to_string()),
            ("${classpath}", classpath.to_string()),
            ("${launcher_name}", LAUNCHER_NAME.to_string()),
            ("${launcher_version}", LAUNCHER_VERSION.to_string()),
        ];
        Self { values }
    }

    /// `None` when a placeholder remains that we cannot fill.
    fn resolve(&self, arg: &str) -> Option<String> {
        let mut resolved = arg.to_string();
        if resolved.contains("${") {
            for (key, value) in &self.values {
                resolved = resolved.replace(key, value);
            }
        }
        (!resolved.contains("${")).then_some(resolved)
    }
}

fn sanitize_jvm_args(raw_args: &[String], placeholders: &Placeholders) -> Vec<String> {
    let mut sanitized = Vec::new();
    let mut i = 0;

    while i < raw_args.len() {
        let arg = &raw_args[i];

        // The assembled classpath is injected later, so descriptor classpath
        // switches are dropped together with their value.
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }

        match placeholders.resolve(arg) {
            Some(resolved) => sanitized.push(resolved),
            None => drop_dangling_option(&mut sanitized),
        }
        i += 1;
    }

    sanitized
}

fn sanitize_game_args(raw_args: &[String], placeholders: &Placeholders) -> Vec<String> {
    let mut sanitized = Vec::new();

    for arg in raw_args {
        match placeholders.resolve(arg) {
            Some(resolved) => sanitized.push(resolved),
            None => drop_dangling_option(&mut sanitized),
        }
    }

    sanitize_numeric_window_args(sanitized)
}

fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn sanitize_numeric_window_args(args: Vec<String>) -> Vec<String> {
    let mut sanitized = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg == "--width" || arg == "--height" {
            match args.get(i + 1) {
                Some(value) if value.parse::<u32>().is_ok() => {
                    sanitized.push(arg.clone());
                    sanitized.push(value.clone());
                    i += 2;
                }
                _ => i += 1,
            }
            continue;
        }

        sanitized.push(arg.clone());
        i += 1;
    }

    sanitized
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

fn set_jvm_system_property(args: &mut Vec<String>, property: &str, value: &str) {
    let prefix = format!("-D{}=", property);
    args.retain(|arg| !arg.starts_with(&prefix));
    args.push(format!("{}{}", prefix, value));
}

// ── Environment ───

fn is_wayland_session(env: &BTreeMap<String, String>) -> bool {
    env.get("XDG_SESSION_TYPE")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("wayland"))
}

fn prepend_env_path(existing: Option<&String>, value: &str) -> String {
    let separator = classpath_separator();
    match existing {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

fn build_environment(
    inherited: &BTreeMap<String, String>,
    natives: &str,
    wayland_compat: bool,
) -> BTreeMap<String, String> {
    let mut env = inherited.clone();

    let var = library_path_env_var();
    let merged = prepend_env_path(inherited.get(var), natives);
    env.insert(var.to_string(), merged);

    if wayland_compat && is_wayland_session(inherited) {
        debug!("Wayland session detected; applying X11 compatibility overlay");
        for (key, value) in WAYLAND_OVERLAY {
            env.insert(key.to_string(), value.to_string());
        }
    }

    env
}

// ── Spawn ───

/// Spawn the planned process with exactly the plan's environment.
pub fn spawn(plan: &LaunchPlan) -> LauncherResult<tokio::process::Child> {
    let Some((program, args)) = plan.process_args.split_first() else {
        return Err(LauncherError::JavaExecution("empty launch plan".into()));
    };

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(&plan.env)
        .current_dir(&plan.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    info!("Launching with Java: {}", program);
    debug!("Command (copy/paste): {}", format_command_for_logs(plan));

    cmd.spawn()
        .map_err(|e| LauncherError::JavaExecution(format!("{program}: {e}")))
}

pub fn format_command_for_logs(plan: &LaunchPlan) -> String {
    plan.process_args
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '+')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
