use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

mod atomic_io;
pub mod content;
pub mod math;
pub mod projection;
pub mod sim;

pub use content::{
    load_content, load_content_from_str, ContentBundle, ContentErrorCode, ContentIssue,
    ContentLoadError, ContentResource, RarityTier, RenderKind, Species, SpeciesCatalog, SpeciesId,
    Zone, ZoneId, ZoneRegistry,
};
pub use math::{Vec2, Vec3};
pub use projection::{aim_from_screen, screen_to_world, world_to_screen, Camera2D, Viewport};
pub use sim::{
    AimEvent, Clock, DiscoveryLedger, InteractionOutcome, ManualClock, MonotonicClock,
    SessionConfig, SessionController, SimEvent,
};

pub const ROOT_ENV_VAR: &str = "BOOPER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub saves_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "BOOPER_ROOT is set but does not point to a valid content root: {path}\n\
A valid root must contain Cargo.toml and assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect content root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/reef-booper\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_for_root(root)
}

pub fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let assets_dir = root.join("assets");
    let saves_dir = root.join("saves");

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        assets_dir,
        saves_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml_and_assets() {
        let temp = TempDir::new().expect("temp");
        assert!(!is_repo_marker(temp.path()));
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        assert!(!is_repo_marker(temp.path()));
        fs::create_dir(temp.path().join("assets")).expect("assets");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn app_paths_create_saves_dir() {
        let temp = TempDir::new().expect("temp");
        let paths = app_paths_for_root(temp.path().to_path_buf()).expect("paths");
        assert!(paths.saves_dir.is_dir());
        assert_eq!(paths.assets_dir, temp.path().join("assets"));
    }
}
