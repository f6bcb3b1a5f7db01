use std::{fmt, path::PathBuf};

use tracing::{info, instrument, warn};

use crate::{
    download::Manager,
    file::Hierarchy,
    modpack::{Component, GameFile, Modpack},
    profiles::{register_profile, ProfileFields, Registration},
    version::{ensure_version, inspect_descriptor, Provisioned, VersionDescriptor},
};

/// Stage the installer is about to run, reported to the caller for progress display.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Component(&'a Component),
    File(&'a GameFile),
    Version(&'a str),
    Profile(&'a str),
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(component) => write!(f, "Downloading {}", component.name),
            Self::File(file) => write!(f, "Downloading {}", file.file_name),
            Self::Version(id) => write!(f, "Preparing version {id}"),
            Self::Profile(name) => write!(f, "Registering profile {name}"),
        }
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub components: Vec<String>,
    pub files: Vec<String>,
    pub provisioned: Provisioned,
    pub registration: Registration,
}

pub struct Installer<'a> {
    manager: &'a Manager,
    modpack: &'a Modpack,
    hierarchy: Hierarchy,
}

impl<'a> Installer<'a> {
    pub fn new(manager: &'a Manager, modpack: &'a Modpack, root_dir: impl Into<PathBuf>) -> Self {
        let hierarchy = Hierarchy::new(root_dir, &modpack.version.id);
        Self {
            manager,
            modpack,
            hierarchy,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Downloads a mod into the profile's mods directory, replacing an older copy.
    #[instrument(skip(self), fields(id = %component.id))]
    pub async fn install_component(&self, component: &Component) -> crate::Result<()> {
        self.manager
            .download_file(
                component.url.clone(),
                self.hierarchy.mods_dir.join(&component.file_name),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn install_file(&self, file: &GameFile) -> crate::Result<()> {
        self.manager
            .download_file(file.url.clone(), self.hierarchy.game_dir.join(&file.file_name))
            .await
    }

    #[instrument(skip(self))]
    pub async fn provision(&self) -> crate::Result<Provisioned> {
        let provisioned =
            ensure_version(self.manager, &self.modpack.version, &self.hierarchy.root_dir).await?;
        self.check_parent_version().await;
        Ok(provisioned)
    }

    /// Adds the launcher profile. Expects [`Installer::provision`] to have run.
    #[instrument(skip(self))]
    pub async fn add_profile(&self) -> crate::Result<Registration> {
        let fields = ProfileFields {
            name: self.modpack.profile.name.clone(),
            last_version_id: self.modpack.version.id.clone(),
            game_dir: self.hierarchy.game_dir.clone(),
        };
        register_profile(
            &self.hierarchy.launcher_profiles,
            self.modpack.profile_key(),
            fields,
            &self.modpack.icon(),
        )
        .await
    }

    /// Runs the whole installation in order and stops at the first failure.
    #[instrument(skip_all, fields(version = %self.modpack.version.id))]
    pub async fn run(
        &self,
        selection: &[&Component],
        mut on_step: impl FnMut(Step<'_>),
    ) -> crate::Result<InstallReport> {
        for component in selection {
            on_step(Step::Component(component));
            self.install_component(component).await?;
        }
        for file in &self.modpack.files {
            on_step(Step::File(file));
            self.install_file(file).await?;
        }

        on_step(Step::Version(&self.modpack.version.id));
        let provisioned = self.provision().await?;
        on_step(Step::Profile(&self.modpack.profile.name));
        let registration = self.add_profile().await?;

        let report = InstallReport {
            components: selection.iter().map(|c| c.id.clone()).collect(),
            files: self.modpack.files.iter().map(|f| f.file_name.clone()).collect(),
            provisioned,
            registration,
        };
        info!(?report, "Installation finished");
        Ok(report)
    }

    // Only warns, the launcher downloads a missing parent on first start.
    async fn check_parent_version(&self) {
        let id = &self.modpack.version.id;
        match inspect_descriptor(self.hierarchy.version_json(id)).await {
            Ok(VersionDescriptor {
                inherits_from: Some(parent),
                ..
            }) if !self.hierarchy.has_version(&parent) => {
                warn!(%parent, "Parent version is not installed yet");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Cannot inspect version descriptor"),
        }
    }
}
