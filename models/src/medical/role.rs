// models/src/medical/role.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ClinicError;

/// The three kinds of account the clinic issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Receptionist,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Receptionist => "RECEPTIONIST",
            Role::Doctor => "DOCTOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "RECEPTIONIST" => Ok(Role::Receptionist),
            "DOCTOR" => Ok(Role::Doctor),
            other => Err(ClinicError::Validation(format!(
                "role must be one of ADMIN, RECEPTIONIST, DOCTOR (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn roles_round_trip_through_their_wire_names() {
        for role in [Role::Admin, Role::Receptionist, Role::Doctor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!("NURSE".parse::<Role>().is_err());
    }
}
