//! Caller identity
//!
//! Token issuance and verification happen upstream. By the time a request
//! reaches a WMP service the gateway has stamped it with `X-Actor-Role` and
//! `X-Actor-Id`; this module only parses and checks those values.
//!
//! Pure functions only; framework extractors live in the services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::Addressee;
use crate::{Error, Result};

/// Header carrying the caller role
pub const ROLE_HEADER: &str = "x-actor-role";

/// Header carrying the caller id
pub const ID_HEADER: &str = "x-actor-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Company,
    Admin,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "company" => Ok(Role::Company),
            "admin" => Ok(Role::Admin),
            other => Err(Error::Authorization(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Company => "company",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,
    pub id: i64,
}

impl Actor {
    pub fn user(id: i64) -> Self {
        Self { role: Role::User, id }
    }

    pub fn company(id: i64) -> Self {
        Self { role: Role::Company, id }
    }

    pub fn admin(id: i64) -> Self {
        Self { role: Role::Admin, id }
    }

    /// Parse raw header values
    pub fn from_headers(role: Option<&str>, id: Option<&str>) -> Result<Self> {
        let role = role
            .ok_or_else(|| Error::Authorization("Missing actor role".to_string()))?
            .parse::<Role>()?;
        let id = id
            .ok_or_else(|| Error::Authorization("Missing actor id".to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Authorization("Malformed actor id".to_string()))?;

        if id <= 0 {
            return Err(Error::Authorization("Malformed actor id".to_string()));
        }

        Ok(Self { role, id })
    }

    /// Require a specific role, returning the actor id
    pub fn require(&self, role: Role) -> Result<i64> {
        if self.role == role {
            Ok(self.id)
        } else {
            Err(Error::Authorization(format!(
                "{} role required, caller is {}",
                role, self.role
            )))
        }
    }

    /// Notification addressee for this actor (admins receive none)
    pub fn addressee(&self) -> Result<Addressee> {
        match self.role {
            Role::User => Ok(Addressee::User(self.id)),
            Role::Company => Ok(Addressee::Company(self.id)),
            Role::Admin => Err(Error::Authorization(
                "Admins have no notification inbox".to_string(),
            )),
        }
    }
}
