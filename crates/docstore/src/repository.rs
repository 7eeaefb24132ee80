//! Typed access to the `cities` and `users` collections.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use heat_common::records::normalize_city;
use heat_common::{City, HeatError, HeatResult, NewCity, NewUser, User, UserPatch};

use crate::store::{not_found, DocumentStore};

pub const CITIES: &str = "cities";
pub const USERS: &str = "users";

fn to_document<T: serde::Serialize>(record: &T) -> HeatResult<Value> {
    serde_json::to_value(record).map_err(|e| HeatError::Internal(format!("Cannot serialize record: {e}")))
}

#[derive(Clone)]
pub struct CityRepository {
    store: Arc<dyn DocumentStore>,
}

impl CityRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, new))]
    pub async fn create(&self, new: &NewCity) -> HeatResult<City> {
        let name = new.validate()?;
        let created_at = Utc::now();

        let id = self
            .store
            .add(CITIES, json!({ "name": name, "createdAt": created_at }))
            .await?;
        info!(id = %id, name = %name, "City created");
        Ok(City { id, name, created_at })
    }

    pub async fn get(&self, id: &str) -> HeatResult<City> {
        self.store
            .get(CITIES, id)
            .await?
            .ok_or_else(|| not_found(CITIES, id))?
            .into_record()
    }

    pub async fn list(&self) -> HeatResult<Vec<City>> {
        self.store
            .list(CITIES)
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }

    /// Delete a city no user belongs to.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> HeatResult<()> {
        let members = self
            .store
            .query_eq(USERS, "cityId", &Value::String(id.to_string()))
            .await?;
        if !members.is_empty() {
            warn!(users = members.len(), "City still has users");
            return Err(HeatError::invalid(
                "cityId",
                "Cannot delete a city that still has users.",
            ));
        }

        if self.store.delete(CITIES, id).await? {
            Ok(())
        } else {
            Err(not_found(CITIES, id))
        }
    }
}

/// Users, with the role/city rules checked before every write.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
    cities: CityRepository,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            cities: CityRepository::new(store.clone()),
            store,
        }
    }

    /// The referenced city has to exist.
    async fn check_city_exists(&self, city_id: Option<&str>) -> HeatResult<()> {
        let Some(city_id) = city_id else {
            return Ok(());
        };
        match self.cities.get(city_id).await {
            Ok(_) => Ok(()),
            Err(HeatError::NotFound { .. }) => Err(HeatError::invalid("cityId", "Selected city does not exist.")),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, new), fields(role = %new.role))]
    pub async fn create(&self, new: &NewUser) -> HeatResult<User> {
        new.validate()?;
        let city_id = normalize_city(new.city_id.as_deref()).map(str::to_string);
        self.check_city_exists(city_id.as_deref()).await?;

        let now = Utc::now();
        let mut user = User {
            id: String::new(),
            display_name: new.display_name.trim().to_string(),
            email: new.email.as_deref().map(str::trim).map(str::to_string),
            role: new.role,
            city_id,
            created_at: now,
            updated_at: now,
        };

        user.id = self.store.add(USERS, to_document(&user)?).await?;
        info!(id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get(&self, id: &str) -> HeatResult<User> {
        self.store
            .get(USERS, id)
            .await?
            .ok_or_else(|| not_found(USERS, id))?
            .into_record()
    }

    pub async fn list(&self) -> HeatResult<Vec<User>> {
        self.store
            .list(USERS)
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }

    pub async fn list_by_city(&self, city_id: &str) -> HeatResult<Vec<User>> {
        self.store
            .query_eq(USERS, "cityId", &Value::String(city_id.to_string()))
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }

    /// Apply an edit. Nothing is written if the result breaks a role rule.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: &UserPatch) -> HeatResult<User> {
        let current = self.get(id).await?;
        let updated = patch.apply(&current, Utc::now())?;
        if updated.city_id != current.city_id {
            self.check_city_exists(updated.city_id.as_deref()).await?;
        }

        let changes = json!({
            "displayName": updated.display_name,
            "role": updated.role,
            "cityId": updated.city_id,
            "updatedAt": updated.updated_at,
        });
        self.store.update(USERS, id, changes).await?.into_record()
    }
}
