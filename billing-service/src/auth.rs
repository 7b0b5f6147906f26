//! Bearer-token authentication and role checks.
//!
//! Identities are provisioned elsewhere; this service only knows the BLAKE3
//! digest of each caller's token and the roles granted to it.

use std::collections::HashMap;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    const fn bit(self) -> u8 {
        match self {
            Role::User => 1 << 0,
            Role::Admin => 1 << 1,
        }
    }
}

/// A small set of roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        RoleSet(bits)
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// True when the two sets share at least one role.
    pub fn intersects(self, other: RoleSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::EMPTY;
        for role in iter {
            set.insert(role);
        }
        set
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: RoleSet,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingCredentials,
    #[error("unknown bearer token")]
    UnknownToken,
    #[error("caller is not allowed to access this resource")]
    Forbidden,
}

/// Raised while building the [`Authenticator`] from configuration.
#[derive(thiserror::Error, Debug)]
pub enum AuthConfigError {
    #[error("principal '{name}' has an invalid token digest")]
    InvalidDigest { name: String },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingCredentials | AuthError::UnknownToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        };

        let body = Json(serde_json::json!({ "message": self.to_string() }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// Hex BLAKE3 digest of a bearer token, in the form stored in configuration.
pub fn token_digest(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Resolves bearer tokens to principals.
#[derive(Debug, Default)]
pub struct Authenticator {
    principals: HashMap<blake3::Hash, Principal>,
}

impl Authenticator {
    pub fn from_config(cfg: &AuthConfig) -> Result<Self, AuthConfigError> {
        let mut principals = HashMap::with_capacity(cfg.principals.len());
        for p in &cfg.principals {
            let digest = blake3::Hash::from_hex(p.token_blake3.trim())
                .map_err(|_| AuthConfigError::InvalidDigest { name: p.name.clone() })?;
            principals.insert(
                digest,
                Principal {
                    name: p.name.clone(),
                    roles: p.roles.iter().copied().collect(),
                },
            );
        }
        Ok(Self { principals })
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        self.principals
            .get(&blake3::hash(token.as_bytes()))
            .cloned()
            .ok_or(AuthError::UnknownToken)
    }
}

/// Admit the caller when they hold any of the `required` roles.
pub fn authorize(principal: &Principal, required: RoleSet) -> Result<(), AuthError> {
    if principal.roles.intersects(required) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
