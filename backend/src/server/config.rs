//! Server settings loaded via OrthoConfig.
//!
//! Every value may come from the command line, a configuration file or a
//! `USERS_`-prefixed environment variable. Unset values fall back to the
//! defaults below.

use ortho_config::OrthoConfig;
use pagination::{PageLimits, PaginationError};
use serde::Deserialize;
use thiserror::Error;
use users_api::domain::{ActionLabels, LogMasker, MaskRule};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_SEARCH_MAX_LIMIT: u32 = 100;
const DEFAULT_MASK_FIELD: &str = "phone";
const DEFAULT_MASK_PREFIX: usize = 3;
const DEFAULT_MASK_CHAR: char = '*';

/// Settings that cannot be turned into a running server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Search limits are inconsistent.
    #[error("invalid search limits: {0}")]
    SearchLimits(#[from] PaginationError),
    /// The mask character must be exactly one character.
    #[error("mask_char must be a single character, got {0:?}")]
    MaskChar(String),
}

/// Configuration values for the users HTTP server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERS")]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: Option<String>,
    /// TCP port to bind.
    pub port: Option<u16>,
    /// Page size used when a search omits `limit`.
    pub search_default_limit: Option<u32>,
    /// Largest page size a search may request.
    pub search_max_limit: Option<u32>,
    /// Field masked in log snapshots; empty disables masking.
    pub mask_field: Option<String>,
    /// Characters left visible at the start of the masked field.
    pub mask_prefix: Option<usize>,
    /// Replacement character for the masked tail.
    pub mask_char: Option<String>,
    /// Log label for creation.
    pub action_create: Option<String>,
    /// Log label for full replacement.
    pub action_update: Option<String>,
    /// Log label for partial update.
    pub action_patch: Option<String>,
    /// Log label for removal.
    pub action_delete: Option<String>,
}

impl ServerSettings {
    /// Interface to bind, defaulting to all interfaces.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Port to bind, defaulting to 8080.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Address tuple accepted by `HttpServer::bind`.
    pub fn bind_addr(&self) -> (String, u16) {
        (self.host().to_owned(), self.port())
    }

    /// Validated search page limits.
    ///
    /// # Errors
    /// Returns [`SettingsError::SearchLimits`] when the default is zero or
    /// exceeds the maximum.
    pub fn search_limits(&self) -> Result<PageLimits, SettingsError> {
        Ok(PageLimits::new(
            self.search_default_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            self.search_max_limit.unwrap_or(DEFAULT_SEARCH_MAX_LIMIT),
        )?)
    }

    /// Per-operation log labels; unset ones keep their default name.
    pub fn action_labels(&self) -> ActionLabels {
        let defaults = ActionLabels::default();
        ActionLabels {
            create: self.action_create.clone().unwrap_or(defaults.create),
            update: self.action_update.clone().unwrap_or(defaults.update),
            patch: self.action_patch.clone().unwrap_or(defaults.patch),
            delete: self.action_delete.clone().unwrap_or(defaults.delete),
        }
    }

    /// Log masker built from the mask settings.
    ///
    /// # Errors
    /// Returns [`SettingsError::MaskChar`] when `mask_char` is not a single
    /// character.
    pub fn masker(&self) -> Result<LogMasker, SettingsError> {
        let field = self.mask_field.as_deref().unwrap_or(DEFAULT_MASK_FIELD);
        if field.is_empty() {
            return Ok(LogMasker::disabled());
        }
        let mask_char = match self.mask_char.as_deref() {
            None => DEFAULT_MASK_CHAR,
            Some(raw) => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(only), None) => only,
                    _ => return Err(SettingsError::MaskChar(raw.to_owned())),
                }
            }
        };
        let prefix = self.mask_prefix.unwrap_or(DEFAULT_MASK_PREFIX);
        Ok(LogMasker::new(vec![MaskRule::new(field, prefix, mask_char)]))
    }
}
