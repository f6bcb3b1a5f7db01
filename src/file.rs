use std::{
    env::{self, consts},
    ffi::OsString,
    fmt::Debug,
    path::{Path, PathBuf},
};

use tokio::fs::{self, create_dir_all};
use tracing::{debug, instrument};

/// Host families that keep the game directory in different places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Other,
}

impl Platform {
    /// Classifies an OS name such as `std::env::consts::OS`, "Windows 10" or "Mac OS X".
    pub fn from_os_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        // "darwin" contains "win", so mac is matched first
        if name.contains("mac") || name.contains("darwin") {
            Self::MacOs
        } else if name.contains("win") {
            Self::Windows
        } else {
            Self::Other
        }
    }

    pub fn current() -> Self {
        Self::from_os_name(consts::OS)
    }
}

/// Game root for `platform`. `app_data` is only consulted on Windows and falls back to `home`.
pub fn resolve_game_root(platform: Platform, home: &Path, app_data: Option<&Path>) -> PathBuf {
    match platform {
        Platform::Windows => app_data
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(home)
            .join(".minecraft"),
        Platform::MacOs => home
            .join("Library")
            .join("Application Support")
            .join("minecraft"),
        Platform::Other => home.join(".minecraft"),
    }
}

pub fn default_game_root() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let app_data = env::var_os("APPDATA").map(PathBuf::from);
    resolve_game_root(Platform::current(), &home, app_data.as_deref())
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub root_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub version_dir: PathBuf,
    pub game_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub launcher_profiles: PathBuf,
}

impl Hierarchy {
    pub fn new(root_dir: impl Into<PathBuf>, version_id: &str) -> Self {
        let root_dir = root_dir.into();
        let versions_dir = root_dir.join("versions");
        let version_dir = versions_dir.join(version_id);
        let game_dir = root_dir.join("profiles").join(version_id);
        let mods_dir = game_dir.join("mods");
        let launcher_profiles = root_dir.join("launcher_profiles.json");

        Self {
            root_dir,
            versions_dir,
            version_dir,
            game_dir,
            mods_dir,
            launcher_profiles,
        }
    }

    pub fn version_jar(&self, version_id: &str) -> PathBuf {
        self.version_dir.join(format!("{version_id}.jar"))
    }

    pub fn version_json(&self, version_id: &str) -> PathBuf {
        self.version_dir.join(format!("{version_id}.json"))
    }

    /// Whether another version's descriptor is already installed next to ours.
    pub fn has_version(&self, version_id: &str) -> bool {
        self.versions_dir
            .join(version_id)
            .join(format!("{version_id}.json"))
            .exists()
    }
}

/// Sibling path a file is staged at before it is renamed over `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    path.with_file_name(name)
}

/// Writes `contents` next to `path` and renames it into place, so readers see the old or the new file.
#[instrument(skip(contents))]
pub async fn replace_file(path: impl AsRef<Path> + Debug, contents: &[u8]) -> crate::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    let staged = partial_path(path);
    let result = match fs::write(&staged, contents).await {
        Ok(()) => fs::rename(&staged, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }
    debug!(len = contents.len(), "File replaced");
    Ok(())
}
