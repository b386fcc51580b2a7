use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two independently authenticated actors of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Chef,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Chef];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Chef => "chef",
        }
    }

    pub fn token_key(&self) -> String {
        format!("{}_token", self.as_str())
    }

    pub fn refresh_token_key(&self) -> String {
        format!("{}_refresh_token", self.as_str())
    }

    pub fn user_key(&self) -> String {
        format!("{}_user", self.as_str())
    }

    /// Every storage key owned by this role's session.
    pub fn storage_keys(&self) -> [String; 3] {
        [self.token_key(), self.refresh_token_key(), self.user_key()]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "chef" => Ok(Role::Chef),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_are_role_namespaced() {
        assert_eq!(
            Role::Chef.storage_keys(),
            [
                "chef_token".to_string(),
                "chef_refresh_token".to_string(),
                "chef_user".to_string()
            ]
        );
        assert_eq!(Role::Admin.token_key(), "admin_token");
    }

    #[test]
    fn parses_known_roles_only() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("chef".parse::<Role>().unwrap(), Role::Chef);
        assert!("Admin".parse::<Role>().is_err());
        assert!("user".parse::<Role>().is_err());
    }
}
