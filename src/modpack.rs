use std::{
    collections::HashSet,
    fmt::Debug,
    path::{Component as PathComponent, Path, PathBuf},
};

use serde_derive::Deserialize;
use tokio::fs;
use tracing::{debug, instrument};
use url::Url;

use crate::{profiles::Icon, version::VersionSource};

static BUNDLED_MANIFEST: &str = include_str!("../assets/modpack.toml");

#[derive(Deserialize, Debug, Clone)]
pub struct ProfileSettings {
    pub name: String,
    /// Key under `profiles`, the version id when absent.
    pub key: Option<String>,
    pub icon: Option<PathBuf>,
}

/// An optional (or required) mod jar dropped into the profile's mods directory.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub url: Url,
    pub file_name: String,
    #[serde(default)]
    pub required: bool,
    pub requires: Option<String>,
}

/// A file placed directly into the profile's game directory.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameFile {
    pub url: Url,
    pub file_name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Modpack {
    pub version: VersionSource,
    pub profile: ProfileSettings,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub files: Vec<GameFile>,
}

impl Modpack {
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let modpack: Self = toml::from_str(content)?;
        modpack.validate()?;
        Ok(modpack)
    }

    pub fn bundled() -> crate::Result<Self> {
        Self::from_toml(BUNDLED_MANIFEST)
    }

    /// Reads a manifest file. A relative icon path is taken relative to the manifest.
    #[instrument]
    pub async fn load(path: impl AsRef<Path> + Debug) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let mut modpack = Self::from_toml(&content)?;
        if let (Some(icon), Some(dir)) = (&mut modpack.profile.icon, path.parent()) {
            if icon.is_relative() {
                *icon = dir.join(&*icon);
            }
        }
        debug!(id = %modpack.version.id, components = modpack.components.len(), "Manifest loaded");
        Ok(modpack)
    }

    pub fn profile_key(&self) -> &str {
        self.profile.key.as_deref().unwrap_or(&self.version.id)
    }

    pub fn icon(&self) -> Icon {
        match &self.profile.icon {
            Some(path) => Icon::File(path.clone()),
            None => Icon::Bundled,
        }
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }

    /// Required components plus the ones named in `ids`, in manifest order.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> crate::Result<Vec<&Component>> {
        let mut chosen: HashSet<&str> = self
            .components
            .iter()
            .filter(|component| component.required)
            .map(|component| component.id.as_str())
            .collect();
        for id in ids {
            let component = self
                .component(id.as_ref())
                .ok_or_else(|| crate::Error::UnknownComponent(id.as_ref().to_owned()))?;
            chosen.insert(&component.id);
        }

        let selection: Vec<_> = self
            .components
            .iter()
            .filter(|component| chosen.contains(component.id.as_str()))
            .collect();
        for component in &selection {
            if let Some(requires) = &component.requires {
                if !chosen.contains(requires.as_str()) {
                    return Err(crate::Error::MissingDependency {
                        component: component.id.clone(),
                        requires: requires.clone(),
                    });
                }
            }
        }
        Ok(selection)
    }

    fn validate(&self) -> crate::Result<()> {
        let invalid = |reason: String| Err(crate::Error::InvalidManifest(reason));

        if !is_plain_file_name(&self.version.id) {
            return invalid(format!("version id {:?} is not a plain name", self.version.id));
        }
        let mut ids = HashSet::new();
        for component in &self.components {
            if !ids.insert(component.id.as_str()) {
                return invalid(format!("duplicate component {}", component.id));
            }
            if !is_plain_file_name(&component.file_name) {
                return invalid(format!("bad file name {:?}", component.file_name));
            }
        }
        for component in &self.components {
            if let Some(requires) = &component.requires {
                if !ids.contains(requires.as_str()) {
                    return invalid(format!("{} requires unknown {requires}", component.id));
                }
            }
        }
        if let Some(file) = self
            .files
            .iter()
            .find(|file| !is_plain_file_name(&file.file_name))
        {
            return invalid(format!("bad file name {:?}", file.file_name));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(PathComponent::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        [version]
        id = "pack"
        jar_url = "https://example.com/pack.jar"
        json_url = "https://example.com/pack.json"

        [profile]
        name = "Pack"

        [[components]]
        id = "api"
        name = "API"
        url = "https://example.com/api.jar"
        file_name = "api.jar"
        required = true

        [[components]]
        id = "replay"
        name = "Replay"
        url = "https://example.com/replay.jar"
        file_name = "replay.jar"

        [[components]]
        id = "replay-voice"
        name = "Replay Voice"
        url = "https://example.com/replay-voice.jar"
        file_name = "replay-voice.jar"
        requires = "replay"
    "#;

    fn ids(selection: &[&Component]) -> Vec<String> {
        selection.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn bundled_manifest_is_valid() {
        let modpack = Modpack::bundled().unwrap();
        assert_eq!(modpack.version.id, "ishciv-purge");
        assert_eq!(modpack.profile_key(), "ishciv-purge");
        assert_eq!(modpack.icon(), Icon::Bundled);
        assert!(modpack.component("fabric-api").unwrap().required);
        assert_eq!(modpack.files.len(), 1);
    }

    #[test]
    fn required_components_are_always_selected() {
        let modpack = Modpack::from_toml(SMALL).unwrap();
        let none: [&str; 0] = [];
        assert_eq!(ids(&modpack.select(&none).unwrap()), ["api"]);
    }

    #[test]
    fn selection_follows_manifest_order() {
        let modpack = Modpack::from_toml(SMALL).unwrap();
        let selection = modpack.select(&["replay-voice", "replay"]).unwrap();
        assert_eq!(ids(&selection), ["api", "replay", "replay-voice"]);
    }

    #[test]
    fn dependency_must_be_selected() {
        let modpack = Modpack::from_toml(SMALL).unwrap();
        let err = modpack.select(&["replay-voice"]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::MissingDependency { ref component, ref requires }
                if component == "replay-voice" && requires == "replay"
        ));
    }

    #[test]
    fn unknown_component() {
        let modpack = Modpack::from_toml(SMALL).unwrap();
        let err = modpack.select(&["optifine"]).unwrap_err();
        assert!(matches!(err, crate::Error::UnknownComponent(id) if id == "optifine"));
    }

    #[test]
    fn file_names_cannot_escape_the_mods_dir() {
        let manifest = SMALL.replace("\"api.jar\"", "\"../api.jar\"");
        assert!(matches!(
            Modpack::from_toml(&manifest),
            Err(crate::Error::InvalidManifest(_))
        ));
    }

    #[test]
    fn bad_urls_are_rejected() {
        let manifest = SMALL.replace("https://example.com/pack.jar", "not a url");
        assert!(matches!(
            Modpack::from_toml(&manifest),
            Err(crate::Error::Manifest(_))
        ));
    }

    #[test]
    fn explicit_profile_key() {
        let manifest = SMALL.replace("name = \"Pack\"", "name = \"Pack\"\nkey = \"pack-profile\"");
        let modpack = Modpack::from_toml(&manifest).unwrap();
        assert_eq!(modpack.profile_key(), "pack-profile");
    }
}
