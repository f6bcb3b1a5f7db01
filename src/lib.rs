use std::{io, path::PathBuf, result};

pub mod download;
pub mod file;
pub mod install;
pub mod modpack;
pub mod profiles;
pub mod version;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} does not contain a json object", path.display())]
    NotAnObject { path: PathBuf },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Manifest(#[from] toml::de::Error),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("resource {} not found", .0.display())]
    ResourceNotFound(PathBuf),
    #[error("unknown component {0}")]
    UnknownComponent(String),
    #[error("component {component} requires {requires}")]
    MissingDependency { component: String, requires: String },
}

pub type Result<T> = result::Result<T, Error>;
