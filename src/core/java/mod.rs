mod runtime;

pub use runtime::{
    candidate_paths, find_in_path, find_java_binary, parse_major_version, inspect_java,
    JavaInstallation,
};
