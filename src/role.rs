use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Platform roles. Assigned at account creation, changed only by an
/// administrative update, and carried by every verified credential.
///
/// The wire form is the upper-case string stored with the account record
/// (`"ADMIN"`, `"AGENT"`, `"CUSTOMER"`). Unknown strings are rejected at the
/// deserialization boundary; the evaluator never sees a role outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Agent,
    Customer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Agent, Role::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Agent => "AGENT",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "AGENT" => Ok(Role::Agent),
            "CUSTOMER" => Ok(Role::Customer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_wire_form() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn rejects_unknown_and_lowercase() {
        assert!("SUPERVISOR".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
        assert!(serde_json::from_str::<Role>("\"GUEST\"").is_err());
    }
}
