//! Admin actions that add or remove a language.
//!
//! Each action checks, in order: the anti-forgery token for that action, the
//! admin capability, and that a language code was supplied. The outcome is a
//! structured result `{success: true}` or
//! `{success: false, data: {code, message}}`.

use crate::defaults::ConfigStore;
use crate::i18n::{LanguageRegistry, RegistryError, ENGLISH_STRINGS};
use crate::model::{AdminNotice, NoticeKind};
use crate::sanitize::sanitize_text;
use crate::security::NonceIssuer;
use crate::store::{self, DocumentStore};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

pub const ADD_LANGUAGE_ACTION: &str = "agcn_add_language";
pub const REMOVE_LANGUAGE_ACTION: &str = "agcn_remove_language";

/// How long the success notice waits to be shown.
const NOTICE_LIFETIME_SECONDS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{}", ENGLISH_STRINGS.security_check_failed)]
    SecurityCheckFailed,

    #[error("{}", ENGLISH_STRINGS.permission_denied)]
    PermissionDenied,

    #[error("{}", ENGLISH_STRINGS.language_not_provided)]
    LanguageNotProvided,

    #[error("{}", ENGLISH_STRINGS.language_already_exists)]
    LanguageAlreadyExists,

    #[error("{}", ENGLISH_STRINGS.language_unavailable)]
    LanguageUnavailable,

    #[error("{}", ENGLISH_STRINGS.persistence_failed)]
    PersistenceFailed,

    #[error("{}", ENGLISH_STRINGS.language_not_found)]
    LanguageNotFound,

    #[error("{}", ENGLISH_STRINGS.last_language)]
    LastLanguageCannotBeRemoved,

    #[error("{}", ENGLISH_STRINGS.unexpected_error)]
    UnexpectedError,
}

impl ActionError {
    /// Stable message key returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::SecurityCheckFailed => "SecurityCheckFailed",
            ActionError::PermissionDenied => "PermissionDenied",
            ActionError::LanguageNotProvided => "LanguageNotProvided",
            ActionError::LanguageAlreadyExists => "LanguageAlreadyExists",
            ActionError::LanguageUnavailable => "LanguageUnavailable",
            ActionError::PersistenceFailed => "PersistenceFailed",
            ActionError::LanguageNotFound => "LanguageNotFound",
            ActionError::LastLanguageCannotBeRemoved => "LastLanguageCannotBeRemoved",
            ActionError::UnexpectedError => "UnexpectedError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::SecurityCheckFailed | ActionError::PermissionDenied => {
                StatusCode::FORBIDDEN
            }
            ActionError::LanguageNotProvided => StatusCode::BAD_REQUEST,
            ActionError::LanguageAlreadyExists
            | ActionError::LanguageUnavailable
            | ActionError::LanguageNotFound
            | ActionError::LastLanguageCannotBeRemoved => StatusCode::CONFLICT,
            ActionError::PersistenceFailed | ActionError::UnexpectedError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RegistryError> for ActionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(_) => ActionError::LanguageAlreadyExists,
            RegistryError::Unavailable(_) => ActionError::LanguageUnavailable,
            RegistryError::NotFound(_) => ActionError::LanguageNotFound,
            RegistryError::LastLanguage(_) => ActionError::LastLanguageCannotBeRemoved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureData {
    pub code: String,
    pub message: String,
}

/// Wire shape of an action outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FailureData>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
        }
    }

    pub fn failure(err: ActionError) -> Self {
        Self {
            success: false,
            data: Some(FailureData {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (self.status(), Json(ActionResult::failure(self))).into_response()
    }
}

/// Submitted fields of an add/remove request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageRequest {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LanguageChange {
    Add,
    Remove,
}

impl LanguageChange {
    fn action(&self) -> &'static str {
        match self {
            LanguageChange::Add => ADD_LANGUAGE_ACTION,
            LanguageChange::Remove => REMOVE_LANGUAGE_ACTION,
        }
    }
}

/// The add/remove language workflows over a document store.
pub struct LanguageActions<'a> {
    pub store: &'a dyn DocumentStore,
    pub defaults: &'a ConfigStore,
    pub nonces: &'a NonceIssuer,
}

impl<'a> LanguageActions<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        defaults: &'a ConfigStore,
        nonces: &'a NonceIssuer,
    ) -> Self {
        Self {
            store,
            defaults,
            nonces,
        }
    }

    /// Add an empty content bundle for the requested language.
    pub async fn add_language(
        &self,
        request: &LanguageRequest,
        is_admin: bool,
    ) -> Result<(), ActionError> {
        self.apply(LanguageChange::Add, request, is_admin).await
    }

    /// Remove the requested language, keeping at least one.
    pub async fn remove_language(
        &self,
        request: &LanguageRequest,
        is_admin: bool,
    ) -> Result<(), ActionError> {
        self.apply(LanguageChange::Remove, request, is_admin).await
    }

    async fn apply(
        &self,
        change: LanguageChange,
        request: &LanguageRequest,
        is_admin: bool,
    ) -> Result<(), ActionError> {
        let nonce = request.nonce.as_deref().unwrap_or_default();
        if !self.nonces.verify(change.action(), nonce) {
            warn!("Rejected {} with a missing or invalid nonce", change.action());
            return Err(ActionError::SecurityCheckFailed);
        }
        if !is_admin {
            warn!("Rejected {} from a non-admin caller", change.action());
            return Err(ActionError::PermissionDenied);
        }

        let code = request
            .language
            .as_deref()
            .map(sanitize_text)
            .filter(|code| !code.is_empty())
            .ok_or(ActionError::LanguageNotProvided)?;
        let code = code.as_str();

        let current = store::load_settings(self.store, self.defaults)
            .await
            .map_err(|e| {
                error!("Failed to load settings for {}: {}", change.action(), e);
                ActionError::UnexpectedError
            })?;

        let registry = LanguageRegistry::from_defaults(self.defaults);
        let next = match change {
            LanguageChange::Add => registry.add(&current, code)?,
            LanguageChange::Remove => registry.remove(&current, code)?,
        };

        store::save_settings(self.store, &next).await.map_err(|e| {
            error!("Failed to persist settings after {}: {}", change.action(), e);
            ActionError::PersistenceFailed
        })?;

        let name = registry.display_name(code);
        let template = match change {
            LanguageChange::Add => ENGLISH_STRINGS.language_added,
            LanguageChange::Remove => ENGLISH_STRINGS.language_removed,
        };
        let notice = AdminNotice {
            kind: NoticeKind::Success,
            message: template.replace("{language}", name),
            dismissible: true,
            expires_at: Utc::now() + Duration::seconds(NOTICE_LIFETIME_SECONDS),
        };
        if let Err(e) = store::save_notice(self.store, &notice).await {
            warn!("Failed to store admin notice: {}", e);
        }

        info!("{}: {}", change.action(), code);
        Ok(())
    }
}
