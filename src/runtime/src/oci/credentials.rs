//! Registry credentials and the resolvers that supply them.
//!
//! The publisher only sees [`CredentialResolver`]. [`StaticCredential`]
//! serves explicit `--username/--password`. [`StoreCredential`] chains the
//! persistent store at `~/.obom/auth/credentials.json` (written by
//! `obom login`), the Docker CLI config and the environment.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use docker_credential::{CredentialRetrievalError, DockerCredential};
use obom_core::error::{ObomError, Result};
use serde::{Deserialize, Serialize};

/// Environment variables consulted when no stored credential matches.
pub const ENV_USERNAME: &str = "REGISTRY_USERNAME";
pub const ENV_PASSWORD: &str = "REGISTRY_PASSWORD";

/// Username paired with a Docker identity token.
pub const IDENTITY_TOKEN_USERNAME: &str = "<token>";

/// Username/password pair. The empty credential means anonymous access.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies the credential for a registry host.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, registry: &str) -> Result<Credential>;
}

/// Fixed credential for one registry; anonymous for any other host.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    registry: String,
    credential: Credential,
}

impl StaticCredential {
    pub fn new(registry: &str, credential: Credential) -> Self {
        Self {
            registry: normalize_registry(registry),
            credential,
        }
    }
}

impl CredentialResolver for StaticCredential {
    fn resolve(&self, registry: &str) -> Result<Credential> {
        if normalize_registry(registry) == self.registry {
            Ok(self.credential.clone())
        } else {
            Ok(Credential::anonymous())
        }
    }
}

/// Credentials from a Docker CLI `config.json`, including `credHelpers`
/// and `credsStore` helpers.
#[derive(Debug, Clone, Default)]
pub struct DockerConfigCredential {
    path: Option<PathBuf>,
}

impl DockerConfigCredential {
    /// `$DOCKER_CONFIG/config.json`, else `~/.docker/config.json`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Credential configured for `registry`. A missing or unreadable config
    /// and a host without an entry are `None`; a failing helper is an error.
    pub fn lookup(&self, registry: &str) -> Result<Option<Credential>> {
        let found = match &self.path {
            None => docker_credential::get_credential(registry),
            Some(path) => match File::open(path) {
                Ok(file) => {
                    docker_credential::get_credential_from_reader(BufReader::new(file), registry)
                }
                Err(_) => Err(CredentialRetrievalError::ConfigReadError),
            },
        };

        match found {
            Ok(DockerCredential::UsernamePassword(username, password)) => {
                Ok(Some(Credential::new(username, password)))
            }
            Ok(DockerCredential::IdentityToken(token)) => {
                Ok(Some(Credential::new(IDENTITY_TOKEN_USERNAME, token)))
            }
            Err(
                CredentialRetrievalError::NoCredentialConfigured
                | CredentialRetrievalError::ConfigNotFound
                | CredentialRetrievalError::ConfigReadError,
            ) => Ok(None),
            Err(e) => Err(ObomError::CredentialError(format!(
                "Docker credential lookup for {} failed: {}",
                registry, e
            ))),
        }
    }
}

impl CredentialResolver for DockerConfigCredential {
    fn resolve(&self, registry: &str) -> Result<Credential> {
        Ok(self.lookup(registry)?.unwrap_or_default())
    }
}

/// Resolver backed by the persistent [`CredentialStore`].
///
/// Falls back to the Docker CLI config, then
/// `REGISTRY_USERNAME`/`REGISTRY_PASSWORD`, then anonymous.
pub struct StoreCredential {
    store: CredentialStore,
    docker: Option<DockerConfigCredential>,
    env_fallback: bool,
}

impl StoreCredential {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            docker: Some(DockerConfigCredential::new()),
            env_fallback: true,
        }
    }

    /// Read Docker credentials from `docker` instead of the default config.
    pub fn with_docker_config(mut self, docker: DockerConfigCredential) -> Self {
        self.docker = Some(docker);
        self
    }

    pub fn without_docker_config(mut self) -> Self {
        self.docker = None;
        self
    }

    /// Skip the environment variables.
    pub fn without_env_fallback(mut self) -> Self {
        self.env_fallback = false;
        self
    }

    fn from_env() -> Option<Credential> {
        let username = std::env::var(ENV_USERNAME).ok()?;
        let password = std::env::var(ENV_PASSWORD).ok()?;
        Some(Credential::new(username, password))
    }
}

impl CredentialResolver for StoreCredential {
    fn resolve(&self, registry: &str) -> Result<Credential> {
        if let Some(credential) = self.store.get(registry)? {
            tracing::debug!(registry, "Using stored credentials");
            return Ok(credential);
        }
        if let Some(docker) = &self.docker {
            if let Some(credential) = docker.lookup(registry)? {
                tracing::debug!(registry, "Using Docker config credentials");
                return Ok(credential);
            }
        }
        if self.env_fallback {
            if let Some(credential) = Self::from_env() {
                tracing::debug!(registry, "Using credentials from environment");
                return Ok(credential);
            }
        }
        Ok(Credential::anonymous())
    }
}

/// Persistent credential file format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    registries: BTreeMap<String, Credential>,
}

/// Persistent per-registry credential store.
///
/// Writes are atomic (write tmp, rename).
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `~/.obom/auth/credentials.json`.
    pub fn default_path() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            ObomError::CredentialError(
                "Cannot determine home directory for credential store".to_string(),
            )
        })?;
        Ok(Self {
            path: home.join(".obom").join("auth").join("credentials.json"),
        })
    }

    /// Create a credential store at a custom path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store credentials for a registry, replacing any existing entry.
    pub fn store(&self, registry: &str, credential: Credential) -> Result<()> {
        let mut file = self.load()?;
        file.registries
            .insert(normalize_registry(registry), credential);
        self.save(&file)
    }

    pub fn get(&self, registry: &str) -> Result<Option<Credential>> {
        let mut file = self.load()?;
        Ok(file.registries.remove(&normalize_registry(registry)))
    }

    /// Remove credentials for a registry. Returns true if an entry existed.
    pub fn remove(&self, registry: &str) -> Result<bool> {
        let mut file = self.load()?;
        let removed = file
            .registries
            .remove(&normalize_registry(registry))
            .is_some();
        if removed {
            self.save(&file)?;
        }
        Ok(removed)
    }

    fn load(&self) -> Result<CredentialFile> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            ObomError::CredentialError(format!(
                "Failed to read credential store {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            ObomError::CredentialError(format!(
                "Failed to parse credential store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ObomError::CredentialError(format!(
                    "Failed to create credential store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let data = serde_json::to_string_pretty(file)?;
        std::fs::write(&tmp_path, data).map_err(|e| {
            ObomError::CredentialError(format!(
                "Failed to write credential store {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            ObomError::CredentialError(format!(
                "Failed to rename credential store {} -> {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

/// Registry keys are case-insensitive and ignore surrounding whitespace.
fn normalize_registry(registry: &str) -> String {
    registry.trim().to_lowercase()
}
