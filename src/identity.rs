use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Nurse,
    Hospital,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Hospital => "hospital",
            Role::Admin => "admin",
        }
    }

    /// Doctors and nurses: the accounts that take shifts and receive documents.
    pub fn is_professional(self) -> bool {
        matches!(self, Role::Doctor | Role::Nurse)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            "hospital" => Ok(Role::Hospital),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Gold,
    Platinum,
}

impl SubscriptionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Gold => "gold",
            SubscriptionTier::Platinum => "platinum",
        }
    }

    /// Unset or unrecognised tiers fall back to the free plan.
    pub fn from_column(value: Option<&str>) -> Self {
        value.and_then(|raw| raw.parse().ok()).unwrap_or_default()
    }

    /// Free-plan hospitals may keep a single job open at a time.
    pub fn open_job_limit(self) -> Option<i64> {
        match self {
            SubscriptionTier::Free => Some(1),
            SubscriptionTier::Gold | SubscriptionTier::Platinum => None,
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(SubscriptionTier::Free),
            "gold" => Ok(SubscriptionTier::Gold),
            "platinum" => Ok(SubscriptionTier::Platinum),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// The authenticated caller. Every core operation receives it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}
