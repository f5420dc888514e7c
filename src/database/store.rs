use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::api_keys::OwnerApiKeys;
use crate::models::property::{Ownership, Property, PropertyRef};
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_email(email: &str) -> Self {
        Self {
            email: Some(crate::models::user::normalize_email(email)),
            ..Default::default()
        }
    }

    pub fn by_role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        self.id.map_or(true, |id| user.id == id)
            && self.email.as_ref().map_or(true, |email| &user.email == email)
            && self.role.map_or(true, |role| user.role == role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    pub external_id: Option<i64>,
    pub owner_id: Option<Uuid>,
    pub accountant_id: Option<Uuid>,
}

impl PropertyFilter {
    /// Every property.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_ref(property_ref: PropertyRef) -> Self {
        match property_ref {
            PropertyRef::Storage(id) => Self::by_id(id),
            PropertyRef::External(external_id) => Self::by_external_id(external_id),
        }
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn by_external_id(external_id: i64) -> Self {
        Self {
            external_id: Some(external_id),
            ..Default::default()
        }
    }

    pub fn by_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn by_accountant(accountant_id: Uuid) -> Self {
        Self {
            accountant_id: Some(accountant_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        self.id.map_or(true, |id| property.id == id)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&property.id))
            && self
                .external_id
                .map_or(true, |external_id| property.external_id == external_id)
            && self
                .owner_id
                .map_or(true, |owner| property.owner_id() == Some(owner))
            && self
                .accountant_id
                .map_or(true, |accountant| property.accountants.contains(&accountant))
    }
}

/// Set operation on a property's accountant references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountantOp {
    Add(Uuid),
    Remove(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub ownership: Option<Ownership>,
    pub accountants: Option<AccountantOp>,
}

impl PropertyPatch {
    pub fn ownership(ownership: Ownership) -> Self {
        Self {
            ownership: Some(ownership),
            ..Default::default()
        }
    }

    pub fn accountants(op: AccountantOp) -> Self {
        Self {
            accountants: Some(op),
            ..Default::default()
        }
    }

    /// Applies the patch in place; returns whether anything changed.
    pub fn apply(&self, property: &mut Property) -> bool {
        let before = property.clone();
        if let Some(ownership) = self.ownership {
            property.ownership = ownership;
        }
        match self.accountants {
            Some(AccountantOp::Add(id)) => {
                property.accountants.insert(id);
            }
            Some(AccountantOp::Remove(id)) => {
                property.accountants.remove(&id);
            }
            None => {}
        }
        let changed = *property != before;
        if changed {
            property.updated_at = chrono::Utc::now();
        }
        changed
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>>;
    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>>;
    async fn count(&self, filter: &UserFilter) -> Result<u64>;
    /// Fails with `Conflict` when the email is taken.
    async fn create(&self, user: &User) -> Result<User>;
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn find_one(&self, filter: &PropertyFilter) -> Result<Option<Property>>;
    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>>;
    async fn count(&self, filter: &PropertyFilter) -> Result<u64>;
    /// Fails with `Conflict` when the external id is taken.
    async fn create(&self, property: &Property) -> Result<Property>;
    async fn update_by_id(&self, id: Uuid, patch: &PropertyPatch) -> Result<Option<Property>>;
    /// Returns how many properties were modified.
    async fn update_many(&self, filter: &PropertyFilter, patch: &PropertyPatch) -> Result<u64>;
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
    async fn delete_many(&self, filter: &PropertyFilter) -> Result<u64>;
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<OwnerApiKeys>>;
    /// Replaces any existing document for the same owner.
    async fn upsert(&self, keys: &OwnerApiKeys) -> Result<OwnerApiKeys>;
    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64>;
}

/// Handle over the three collections.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub properties: Arc<dyn PropertyStore>,
    pub api_keys: Arc<dyn ApiKeyStore>,
}

impl Store {
    pub fn new(
        users: Arc<dyn UserStore>,
        properties: Arc<dyn PropertyStore>,
        api_keys: Arc<dyn ApiKeyStore>,
    ) -> Self {
        Self {
            users,
            properties,
            api_keys,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(crate::database::memory::MemoryStore::new());
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(crate::database::postgres::PgStore::new(pool));
        Self::new(store.clone(), store.clone(), store)
    }
}
