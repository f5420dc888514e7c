use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::{
    ApiKeyStore, PropertyFilter, PropertyPatch, PropertyStore, UserFilter, UserStore,
};
use crate::error::{Error, Result};
use crate::models::api_keys::OwnerApiKeys;
use crate::models::property::Property;
use crate::models::user::{Role, User};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    properties: HashMap<Uuid, Property>,
    api_keys: HashMap<Uuid, OwnerApiKeys>,
}

/// Process-local store. Each call takes the lock once, so every operation is
/// atomic on its own and nothing spans calls.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>> {
        Ok(UserStore::find(self, filter).await?.into_iter().next())
    }

    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn create(&self, user: &User) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(Error::conflict(format!(
                "A user with email {} already exists",
                user.email
            )));
        }
        // Same guarantee as the users_single_admin index.
        if user.role == Role::Admin && inner.users.values().any(|u| u.role == Role::Admin) {
            return Err(Error::conflict("An administrator already exists"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.remove(&id).is_some())
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn find_one(&self, filter: &PropertyFilter) -> Result<Option<Property>> {
        Ok(PropertyStore::find(self, filter).await?.into_iter().next())
    }

    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let inner = self.inner.read().await;
        let mut properties: Vec<Property> = inner
            .properties
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        properties.sort_by_key(|p| p.external_id);
        Ok(properties)
    }

    async fn count(&self, filter: &PropertyFilter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.properties.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn create(&self, property: &Property) -> Result<Property> {
        let mut inner = self.inner.write().await;
        if inner
            .properties
            .values()
            .any(|p| p.external_id == property.external_id)
        {
            return Err(Error::conflict(format!(
                "A property with id {} already exists",
                property.external_id
            )));
        }
        inner.properties.insert(property.id, property.clone());
        Ok(property.clone())
    }

    async fn update_by_id(&self, id: Uuid, patch: &PropertyPatch) -> Result<Option<Property>> {
        let mut inner = self.inner.write().await;
        let Some(property) = inner.properties.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(property);
        Ok(Some(property.clone()))
    }

    async fn update_many(&self, filter: &PropertyFilter, patch: &PropertyPatch) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut modified = 0;
        for property in inner.properties.values_mut().filter(|p| filter.matches(p)) {
            if patch.apply(property) {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.properties.remove(&id).is_some())
    }

    async fn delete_many(&self, filter: &PropertyFilter) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.properties.len();
        inner.properties.retain(|_, p| !filter.matches(p));
        Ok((before - inner.properties.len()) as u64)
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<OwnerApiKeys>> {
        let inner = self.inner.read().await;
        Ok(inner.api_keys.get(&owner_id).cloned())
    }

    async fn upsert(&self, keys: &OwnerApiKeys) -> Result<OwnerApiKeys> {
        let mut inner = self.inner.write().await;
        let stored = match inner.api_keys.get(&keys.owner_id) {
            Some(existing) => OwnerApiKeys {
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..keys.clone()
            },
            None => keys.clone(),
        };
        inner.api_keys.insert(stored.owner_id, stored.clone());
        Ok(stored)
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.write().await;
        Ok(u64::from(inner.api_keys.remove(&owner_id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::AccountantOp;
    use crate::models::property::Ownership;
    use crate::models::user::Role;
    use std::collections::BTreeSet;

    fn property(external_id: i64, ownership: Ownership) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            external_id,
            name: format!("Flat {}", external_id),
            address: "Rua Augusta 1".into(),
            property_type: None,
            bedrooms: 1,
            bathrooms: 1,
            max_guests: 2,
            hostkit_id: None,
            hostkit_api_key: None,
            status: "active".into(),
            amenities: vec![],
            images: vec![],
            ownership,
            accountants: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let user = User::new("A".into(), "a@x.io".into(), None, "h".into(), Role::Owner, vec![]);
        UserStore::create(&store, &user).await.unwrap();

        let twin = User::new("B".into(), "A@X.io".into(), None, "h".into(), Role::Owner, vec![]);
        let err = UserStore::create(&store, &twin).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn accountant_ops_behave_as_a_set() {
        let store = MemoryStore::new();
        let p = property(1, Ownership::Admin);
        PropertyStore::create(&store, &p).await.unwrap();
        let accountant = Uuid::new_v4();

        let add = PropertyPatch::accountants(AccountantOp::Add(accountant));
        assert_eq!(store.update_many(&PropertyFilter::all(), &add).await.unwrap(), 1);
        assert_eq!(store.update_many(&PropertyFilter::all(), &add).await.unwrap(), 0);

        let stored = PropertyStore::find_one(&store, &PropertyFilter::by_id(p.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.accountants.len(), 1);

        let pull = PropertyPatch::accountants(AccountantOp::Remove(accountant));
        assert_eq!(store.update_many(&PropertyFilter::all(), &pull).await.unwrap(), 1);
        assert_eq!(
            PropertyStore::count(&store, &PropertyFilter::by_accountant(accountant))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn api_keys_upsert_replaces() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .upsert(&OwnerApiKeys::new(owner, "k1".into(), "s1".into()))
            .await
            .unwrap();
        store
            .upsert(&OwnerApiKeys::new(owner, "k2".into(), "s2".into()))
            .await
            .unwrap();

        let keys = store.find_by_owner(owner).await.unwrap().unwrap();
        assert_eq!(keys.hostkit_api_key, "k2");
        assert_eq!(store.delete_by_owner(owner).await.unwrap(), 1);
        assert_eq!(store.delete_by_owner(owner).await.unwrap(), 0);
    }
}
