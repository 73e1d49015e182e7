pub mod errors;
pub mod models;

use crate::modules::store::{GroupStore, UserDocument};
use errors::UserError;
use models::{ProfileUpdate, UserProfile};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn GroupStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// Merges `update` into the stored profile and returns the result.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile, UserError> {
        if user_id.trim().is_empty() {
            return Err(UserError::NotAuthenticated);
        }
        let name = match update.name {
            Some(name) if name.trim().is_empty() => return Err(UserError::MissingName),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        self.store
            .upsert_user(&UserDocument {
                id: user_id.to_string(),
                name,
                is_local: update.is_local,
            })
            .await?;
        debug!(user_id, "profile updated");

        self.get_profile(user_id).await
    }

    /// Profile of `user_id`, or the "Unknown" placeholder when none is stored.
    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, UserError> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(UserProfile::from)
            .unwrap_or_else(|| UserProfile::unknown(user_id)))
    }

    /// Resolves member ids in order. A lookup failing for one member degrades
    /// that member to the placeholder instead of failing the whole list.
    pub async fn resolve_members(&self, ids: &[String]) -> Vec<UserProfile> {
        let lookups = ids.iter().map(|id| async move {
            match self.store.get_user(id).await {
                Ok(Some(doc)) => UserProfile::from(doc),
                Ok(None) => UserProfile::unknown(id),
                Err(e) => {
                    warn!(user_id = %id, "failed to resolve member profile: {e:?}");
                    UserProfile::unknown(id)
                }
            }
        });
        futures::future::join_all(lookups).await
    }
}
