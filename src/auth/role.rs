//! Portal roles and the role-keyed endpoint table.
//!
//! Every role has its own credential-exchange, profile and registration
//! paths. The manager never hard-codes them; it asks an
//! [`EndpointResolver`] supplied by the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// ── Role ─────────────────────────────────────────────────────────

/// Closed set of portal roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Role {
    /// Unit holder. Also the fallback when a profile carries no role tag.
    #[default]
    Investor,
    /// RTA back-office staff.
    Admin,
    /// Asset management company.
    Amc,
    /// Mutual-fund distributor.
    Distributor,
    /// Market regulator (wire tag `sebi`).
    Regulator,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Investor,
        Role::Admin,
        Role::Amc,
        Role::Distributor,
        Role::Regulator,
    ];

    /// Wire tag as sent by the API and persisted in the user record.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Admin => "admin",
            Self::Amc => "amc",
            Self::Distributor => "distributor",
            Self::Regulator => "sebi",
        }
    }

    /// Landing view after a successful login.
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Investor => "/investor",
            Self::Admin => "/admin/admindashboard",
            Self::Amc => "/amc",
            Self::Distributor => "/distributor",
            Self::Regulator => "/sebi",
        }
    }

    /// Login view for this role's area.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Investor => "/login",
            Self::Admin => "/admin/login",
            Self::Amc => "/amc/login",
            Self::Distributor => "/distributor/login",
            Self::Regulator => "/sebi/login",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investor" | "user" => Ok(Self::Investor),
            "admin" | "rta ceo" => Ok(Self::Admin),
            "amc" => Ok(Self::Amc),
            "distributor" => Ok(Self::Distributor),
            "sebi" | "regulator" => Ok(Self::Regulator),
            other => Err(format!("unknown role tag '{other}'")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Endpoints ────────────────────────────────────────────────────

/// Paths used by the credential exchange flow for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEndpoints {
    /// `POST` target for `{identifier, password}`.
    pub exchange: String,
    /// `GET` target returning the authenticated identity.
    pub profile: String,
    /// `POST` target for self-registration.
    pub register: String,
    /// JSON key the exchange endpoint expects the identifier under.
    pub identifier_field: String,
}

/// Resolves the endpoint set for a role.
pub trait EndpointResolver: Send + Sync {
    fn resolve(&self, role: Role) -> RoleEndpoints;
}

/// Default endpoint table of the RTA API.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEndpoints;

impl EndpointResolver for StandardEndpoints {
    fn resolve(&self, role: Role) -> RoleEndpoints {
        let (exchange, profile, register) = match role {
            Role::Investor => (
                "/api/investor/auth/login".to_string(),
                "/api/investor/profile/".to_string(),
                "/api/investor/auth/register".to_string(),
            ),
            other => {
                let prefix = format!("/api/{}/auth", other.as_str());
                (
                    format!("{prefix}/login"),
                    format!("{prefix}/me"),
                    format!("{prefix}/register"),
                )
            }
        };

        RoleEndpoints {
            exchange,
            profile,
            register,
            identifier_field: "email".into(),
        }
    }
}

/// Partial per-role override read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOverride {
    pub exchange: Option<String>,
    pub profile: Option<String>,
    pub register: Option<String>,
    pub identifier_field: Option<String>,
}

/// [`StandardEndpoints`] with config overrides layered on top.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredEndpoints {
    overrides: BTreeMap<Role, EndpointOverride>,
}

impl ConfiguredEndpoints {
    pub fn new(overrides: BTreeMap<Role, EndpointOverride>) -> Self {
        Self { overrides }
    }
}

impl EndpointResolver for ConfiguredEndpoints {
    fn resolve(&self, role: Role) -> RoleEndpoints {
        let mut endpoints = StandardEndpoints.resolve(role);
        if let Some(o) = self.overrides.get(&role) {
            if let Some(ref v) = o.exchange {
                endpoints.exchange.clone_from(v);
            }
            if let Some(ref v) = o.profile {
                endpoints.profile.clone_from(v);
            }
            if let Some(ref v) = o.register {
                endpoints.register.clone_from(v);
            }
            if let Some(ref v) = o.identifier_field {
                endpoints.identifier_field.clone_from(v);
            }
        }
        endpoints
    }
}
