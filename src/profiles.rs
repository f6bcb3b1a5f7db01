//! Registration of a custom profile in the launcher's `launcher_profiles.json`.
//!
//! The document is handled as loose json: only the `profiles` object is
//! interpreted, every other key is written back untouched and in order.

use std::{
    fmt::Debug,
    io,
    path::{Path, PathBuf},
};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::file::replace_file;

pub const PROFILES_KEY: &str = "profiles";

static BUNDLED_LOGO: &[u8] = include_bytes!("../assets/logo.png");

pub type Document = Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    pub created: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub game_dir: String,
    pub last_version_id: String,
    pub icon: String,
}

/// Caller supplied part of a profile entry.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub name: String,
    pub last_version_id: String,
    pub game_dir: PathBuf,
}

impl ProfileEntry {
    pub fn new(fields: ProfileFields, icon: String, now: DateTime<Utc>) -> Self {
        Self {
            name: fields.name,
            profile_type: ProfileType::Custom,
            created: now,
            last_used: now,
            game_dir: fields.game_dir.to_string_lossy().into_owned(),
            last_version_id: fields.last_version_id,
            icon,
        }
    }
}

/// PNG shown next to the profile in the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Bundled,
    File(PathBuf),
}

impl Icon {
    /// `data:` URI embedding the PNG, the form the launcher stores.
    pub async fn data_uri(&self) -> crate::Result<String> {
        let encoded = match self {
            Self::Bundled => BASE64_STANDARD.encode(BUNDLED_LOGO),
            Self::File(path) => match fs::read(path).await {
                Ok(png) => BASE64_STANDARD.encode(png),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(crate::Error::ResourceNotFound(path.clone()))
                }
                Err(e) => return Err(e.into()),
            },
        };
        Ok(format!("data:image/png;base64,{encoded}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    AlreadyPresent,
}

fn has_profile(document: &Document, key: &str) -> bool {
    match document.get(PROFILES_KEY) {
        Some(Value::Object(profiles)) => profiles.contains_key(key),
        _ => false,
    }
}

/// Moves the `profiles` object out of `document`. A malformed value becomes `{}`.
///
/// The key keeps its slot (left as `null`), so putting the map back does not reorder the document.
fn take_profiles(document: &mut Document) -> Map<String, Value> {
    match document.get_mut(PROFILES_KEY).map(Value::take) {
        Some(Value::Object(profiles)) => profiles,
        None => Map::new(),
        Some(previous) => {
            warn!(%previous, "Replacing malformed profiles value");
            Map::new()
        }
    }
}

/// Inserts `entry` under `key` unless a profile with that key already exists.
pub fn merge_profile(
    mut document: Document,
    key: &str,
    entry: &ProfileEntry,
) -> crate::Result<(Document, Registration)> {
    let mut profiles = take_profiles(&mut document);
    let registration = if profiles.contains_key(key) {
        Registration::AlreadyPresent
    } else {
        profiles.insert(key.to_owned(), serde_json::to_value(entry)?);
        Registration::Inserted
    };
    document.insert(PROFILES_KEY.to_owned(), Value::Object(profiles));
    Ok((document, registration))
}

/// Reads the launcher document. A missing file is an empty document.
#[instrument]
pub async fn load_document(path: impl AsRef<Path> + Debug) -> crate::Result<Document> {
    let path = path.as_ref();
    let filebuf = match fs::read(path).await {
        Ok(filebuf) => filebuf,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No launcher document yet");
            return Ok(Document::new());
        }
        Err(e) => return Err(e.into()),
    };
    let document: Value =
        serde_json::from_slice(&filebuf).map_err(|source| crate::Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match document {
        Value::Object(document) => Ok(document),
        _ => Err(crate::Error::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

#[instrument(skip(document))]
pub async fn persist_document(
    path: impl AsRef<Path> + Debug,
    document: &Document,
) -> crate::Result<()> {
    let serialized = serde_json::to_vec_pretty(document)?;
    replace_file(path, &serialized).await
}

/// Adds the profile to the document at `config_path` if `key` is not registered yet.
///
/// An existing profile is never touched and the file is not rewritten in that case.
#[instrument(skip(fields))]
pub async fn register_profile(
    config_path: &Path,
    key: &str,
    fields: ProfileFields,
    icon: &Icon,
) -> crate::Result<Registration> {
    let mut document = load_document(config_path).await?;
    if has_profile(&document, key) {
        info!(key, "Profile already registered");
        return Ok(Registration::AlreadyPresent);
    }

    let entry = ProfileEntry::new(fields, icon.data_uri().await?, Utc::now());
    let (document, registration) = merge_profile(document, key, &entry)?;
    persist_document(config_path, &document).await?;
    info!(key, name = %entry.name, "Profile registered");
    Ok(registration)
}
