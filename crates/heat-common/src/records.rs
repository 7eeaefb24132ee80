//! City and user records kept in the document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldError, HeatError, HeatResult};

/// Minimum length of a city name after trimming.
pub const MIN_CITY_NAME_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    PublicManager,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::PublicManager => "public_manager",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "public_manager" => Ok(Role::PublicManager),
            "user" => Ok(Role::User),
            other => Err(HeatError::invalid("role", format!("Unknown role: {other}"))),
        }
    }
}

/// Role/city consistency.
///
/// Administrators are global and never belong to a city. Public managers act
/// for exactly one city. Plain users may or may not have one.
pub fn check_role_city(role: Role, city_id: Option<&str>) -> Result<(), FieldError> {
    match (role, city_id) {
        (Role::Admin, Some(_)) => Err(FieldError::new(
            "cityId",
            "Administrators cannot be associated with a city.",
        )),
        (Role::PublicManager, None) => Err(FieldError::new(
            "cityId",
            "Public managers must be associated with a city.",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a city.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCity {
    #[serde(default)]
    pub name: String,
}

impl NewCity {
    /// Validate and normalize, returning the trimmed name.
    pub fn validate(&self) -> HeatResult<String> {
        let name = self.name.trim();
        if name.chars().count() < MIN_CITY_NAME_LEN {
            return Err(HeatError::invalid("name", "Please enter the city name."));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub city_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a user (sign-up or admin action).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub city_id: Option<String>,
}

impl NewUser {
    /// Collect every field-level problem before touching the store.
    pub fn validate(&self) -> HeatResult<()> {
        let mut errors = Vec::new();
        if self.display_name.trim().is_empty() {
            errors.push(FieldError::new("displayName", "Display name is required."));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                errors.push(FieldError::new("email", "Email address is invalid."));
            }
        }
        let city = normalize_city(self.city_id.as_deref());
        if let Err(e) = check_role_city(self.role, city) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HeatError::Validation(errors))
        }
    }
}

/// Partial update from the admin edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub city_id: Option<String>,
}

impl UserPatch {
    /// Apply the patch to `user`, returning the updated record.
    ///
    /// Promoting a user to admin drops any existing city association, the same
    /// way the edit form disables the city selector for administrators. An
    /// explicit city together with the admin role is still rejected.
    pub fn apply(&self, user: &User, now: DateTime<Utc>) -> HeatResult<User> {
        let mut updated = user.clone();

        if let Some(name) = &self.display_name {
            if name.trim().is_empty() {
                return Err(HeatError::invalid("displayName", "Display name is required."));
            }
            updated.display_name = name.trim().to_string();
        }

        let explicit_city = normalize_city(self.city_id.as_deref());
        if let Some(role) = self.role {
            updated.role = role;
            if role == Role::Admin && explicit_city.is_none() {
                updated.city_id = None;
            }
        }
        if let Some(city) = explicit_city {
            updated.city_id = Some(city.to_string());
        }

        check_role_city(updated.role, updated.city_id.as_deref())
            .map_err(|e| HeatError::Validation(vec![e]))?;

        updated.updated_at = now;
        Ok(updated)
    }
}

/// Empty or whitespace city ids count as "no city".
pub fn normalize_city(city_id: Option<&str>) -> Option<&str> {
    city_id.map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, city: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u1".into(),
            display_name: "Ana".into(),
            email: None,
            role,
            city_id: city.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_city_rules() {
        assert!(check_role_city(Role::Admin, None).is_ok());
        assert!(check_role_city(Role::Admin, Some("c1")).is_err());
        assert!(check_role_city(Role::PublicManager, Some("c1")).is_ok());
        assert!(check_role_city(Role::PublicManager, None).is_err());
        assert!(check_role_city(Role::User, None).is_ok());
        assert!(check_role_city(Role::User, Some("c1")).is_ok());
    }

    #[test]
    fn test_new_user_collects_all_errors() {
        let new = NewUser {
            display_name: " ".into(),
            email: Some("not-an-email".into()),
            role: Role::PublicManager,
            city_id: Some("   ".into()),
        };
        match new.validate() {
            Err(HeatError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["displayName", "email", "cityId"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_patch_promote_to_admin_clears_city() {
        let patch = UserPatch {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let updated = patch.apply(&user(Role::PublicManager, Some("c1")), Utc::now()).unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(updated.city_id.is_none());
    }

    #[test]
    fn test_patch_admin_with_explicit_city_rejected() {
        let patch = UserPatch {
            role: Some(Role::Admin),
            city_id: Some("c2".into()),
            ..Default::default()
        };
        assert!(patch.apply(&user(Role::User, None), Utc::now()).is_err());
    }

    #[test]
    fn test_patch_manager_requires_city() {
        let patch = UserPatch {
            role: Some(Role::PublicManager),
            ..Default::default()
        };
        assert!(patch.apply(&user(Role::User, None), Utc::now()).is_err());

        let patch = UserPatch {
            role: Some(Role::PublicManager),
            city_id: Some("c9".into()),
            ..Default::default()
        };
        let updated = patch.apply(&user(Role::User, None), Utc::now()).unwrap();
        assert_eq!(updated.city_id.as_deref(), Some("c9"));
    }

    #[test]
    fn test_city_name_minimum_length() {
        assert!(NewCity { name: " Rio ".into() }.validate().is_ok());
        assert!(NewCity { name: "Ri".into() }.validate().is_err());
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::PublicManager).unwrap(), "\"public_manager\"");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("gestor".parse::<Role>().is_err());
    }
}
