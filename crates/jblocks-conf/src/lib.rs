//! Layered TOML settings.
//!
//! Sources, lowest priority first: the user's config directory
//! (`jblocks.toml` under the platform config dir), then `.jblocks.toml`
//! and `jblocks.toml` in the project root. Later sources override
//! earlier ones key by key.

use std::path::Path;

use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("no `{0}` executable on PATH; set it in jblocks.toml")]
    ToolNotFound(&'static str),
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Explicit path to the `java` launcher; discovered on PATH when
    /// unset.
    pub java: Option<Utf8PathBuf>,
    /// Explicit path to `javac`; discovered on PATH when unset.
    pub javac: Option<Utf8PathBuf>,
    /// Where compiled classes (and the generated source file) go.
    pub out_dir: Utf8PathBuf,
    pub main_class: String,
    /// Extra JVM flags passed to the debuggee.
    pub extra_flags: Vec<String>,
    pub attach_retries: u32,
    pub attach_delay_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            java: None,
            javac: None,
            out_dir: Utf8PathBuf::from("target/jblocks"),
            main_class: "Demo".to_owned(),
            extra_flags: Vec::new(),
            attach_retries: 10,
            attach_delay_ms: 200,
            shutdown_grace_ms: 2000,
        }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("dev", "jblocks", "jblocks")
            .map(|proj_dirs| proj_dirs.config_dir().join("jblocks.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".jblocks.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("jblocks.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// The configured `java`, or the first one on PATH.
    pub fn java_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        resolve_tool(self.java.clone(), "java")
    }

    /// The configured `javac`, or the first one on PATH.
    pub fn javac_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        resolve_tool(self.javac.clone(), "javac")
    }
}

fn resolve_tool(
    configured: Option<Utf8PathBuf>,
    name: &'static str,
) -> Result<Utf8PathBuf, ConfigError> {
    if let Some(path) = configured {
        return Ok(path);
    }
    let found = which::which(name).map_err(|_| ConfigError::ToolNotFound(name))?;
    Utf8PathBuf::from_path_buf(found).map_err(|_| ConfigError::ToolNotFound(name))
}
