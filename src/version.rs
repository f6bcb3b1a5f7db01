use std::{fmt::Debug, path::Path};

use serde_derive::Deserialize;
use tokio::fs::{self, create_dir_all};
use tracing::{debug, info, instrument};
use url::Url;

use crate::{download::Manager, file::Hierarchy};

/// Where a custom version's jar and descriptor are fetched from.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionSource {
    pub id: String,
    pub jar_url: Url,
    pub json_url: Url,
}

/// What [`ensure_version`] had to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provisioned {
    pub jar_fetched: bool,
    pub json_fetched: bool,
}

/// Makes sure `<game_root>/versions/<id>/` holds `<id>.jar` and `<id>.json`.
///
/// Files already on disk are trusted as they are. The jar is fetched first and
/// a failure there returns before the descriptor is requested.
#[instrument(skip(manager))]
pub async fn ensure_version(
    manager: &Manager,
    source: &VersionSource,
    game_root: &Path,
) -> crate::Result<Provisioned> {
    let hierarchy = Hierarchy::new(game_root, &source.id);
    create_dir_all(&hierarchy.version_dir).await?;

    let jar_fetched = manager
        .download_if_absent(source.jar_url.clone(), hierarchy.version_jar(&source.id))
        .await?;
    let json_fetched = manager
        .download_if_absent(source.json_url.clone(), hierarchy.version_json(&source.id))
        .await?;

    let provisioned = Provisioned {
        jar_fetched,
        json_fetched,
    };
    info!(id = %source.id, ?provisioned, "Version ready");
    Ok(provisioned)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub id: String,
    pub inherits_from: Option<String>,
}

/// Reads the descriptor's id and the version it inherits from.
#[instrument]
pub async fn inspect_descriptor(
    path: impl AsRef<Path> + Debug,
) -> crate::Result<VersionDescriptor> {
    let path = path.as_ref();
    let filebuf = fs::read(path).await?;
    let descriptor: VersionDescriptor =
        serde_json::from_slice(&filebuf).map_err(|source| crate::Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(?descriptor, "Descriptor parsed");
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_with_parent() {
        let descriptor: VersionDescriptor = serde_json::from_str(
            r#"{
                "id": "pack",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "type": "release",
                "releaseTime": "2023-06-12T13:25:51+00:00",
                "libraries": []
            }"#,
        )
        .unwrap();
        assert_eq!(descriptor.id, "pack");
        assert_eq!(descriptor.inherits_from.as_deref(), Some("1.20.1"));
    }

    #[test]
    fn descriptor_needs_only_an_id() {
        let descriptor: VersionDescriptor = serde_json::from_str(r#"{"id": "pack"}"#).unwrap();
        assert_eq!(descriptor.id, "pack");
        assert!(descriptor.inherits_from.is_none());
    }
}
