use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Public profile of a seller, farmer or deliveryman.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartyProfile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Resolves opaque party references into profiles. Only consulted when a
/// caller asks for expansion; unknown ids are left out of the result.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, PartyProfile>, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryPartyDirectory {
    profiles: DashMap<String, PartyProfile>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = PartyProfile>) -> Self {
        let directory = Self::new();
        for profile in profiles {
            directory.register(profile);
        }
        directory
    }

    pub fn register(&self, profile: PartyProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, PartyProfile>, ServiceError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.profiles
                    .get(id)
                    .map(|profile| (id.clone(), profile.value().clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_ids_are_skipped() {
        let directory = InMemoryPartyDirectory::new();
        directory.register(PartyProfile {
            id: "farmer-1".into(),
            name: "Sunil Perera".into(),
            company: None,
            district: Some("Polonnaruwa".into()),
            mobile: None,
            email: None,
        });

        let found = directory
            .lookup(&["farmer-1".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["farmer-1"].name, "Sunil Perera");
    }

    #[tokio::test]
    async fn seeded_profiles_are_resolvable() {
        let directory = InMemoryPartyDirectory::with_profiles(vec![PartyProfile {
            id: "dm-1".into(),
            name: "Kasun Fernando".into(),
            company: None,
            district: None,
            mobile: Some("0712345678".into()),
            email: None,
        }]);

        let found = directory.lookup(&["dm-1".to_string()]).await.unwrap();
        assert_eq!(found["dm-1"].mobile.as_deref(), Some("0712345678"));
    }
}
