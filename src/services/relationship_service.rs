use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{AccountantOp, PropertyFilter, PropertyPatch, Store, UserFilter};
use crate::error::{Error, Result};
use crate::models::property::{Ownership, Property, PropertyRef};
use crate::models::user::{Role, User};
use crate::services::outcome::{Outcome, Step, Warnings};

/// Where a property is being moved to. On the wire this is either the
/// string `"admin"` or an owner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum OwnerTarget {
    AdminPool,
    Owner(Uuid),
}

impl TryFrom<String> for OwnerTarget {
    type Error = String;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("admin") {
            return Ok(OwnerTarget::AdminPool);
        }
        Uuid::parse_str(raw)
            .map(OwnerTarget::Owner)
            .map_err(|_| format!("'{}' is neither \"admin\" nor an owner id", raw))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountantAssignment {
    pub accountant_id: Uuid,
    pub removed_from: u64,
    pub assigned_property_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDeletion {
    pub owner_id: Uuid,
    pub deleted_properties: u64,
    pub deleted_api_keys: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountantDeletion {
    pub accountant_id: Uuid,
    pub unassigned_properties: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDeletion {
    pub id: Uuid,
    pub external_id: i64,
    pub detached_accountants: u64,
}

/// Keeps property, owner and accountant references consistent. Multi-step
/// operations remove dependents before the authoritative record so that a
/// retry after a partial failure converges.
#[derive(Clone)]
pub struct RelationshipService {
    store: Store,
}

impl RelationshipService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_user(&self, id: Uuid, role: Role) -> Result<User> {
        self.store
            .users
            .find_one(&UserFilter::by_id(id).with_role(role))
            .await?
            .ok_or_else(|| Error::not_found(format!("{} {} not found", role, id)))
    }

    pub async fn find_property(&self, property_ref: PropertyRef) -> Result<Property> {
        self.store
            .properties
            .find_one(&PropertyFilter::by_ref(property_ref))
            .await?
            .ok_or_else(|| Error::not_found(format!("Property {} not found", property_ref)))
    }

    /// The single transition of a property's ownership.
    pub async fn assign_property_to_owner(
        &self,
        external_id: i64,
        target: OwnerTarget,
    ) -> Result<Property> {
        let property = self.find_property(PropertyRef::External(external_id)).await?;
        let ownership = match target {
            OwnerTarget::AdminPool => Ownership::Admin,
            OwnerTarget::Owner(owner_id) => {
                self.require_user(owner_id, Role::Owner).await?;
                Ownership::Owner(owner_id)
            }
        };

        let updated = self
            .store
            .properties
            .update_by_id(property.id, &PropertyPatch::ownership(ownership))
            .await?
            .ok_or_else(|| Error::not_found(format!("Property #{} not found", external_id)))?;

        tracing::info!(
            property_id = %updated.id,
            external_id,
            owner_id = ?ownership.owner_id(),
            admin_owned = ownership.is_admin_owned(),
            "property ownership reassigned"
        );
        Ok(updated)
    }

    /// Clear-then-set: the accountant is pulled from every property first,
    /// then added to each property in `property_ids`.
    pub async fn set_accountant_assignments(
        &self,
        accountant_id: Uuid,
        property_ids: &[Uuid],
    ) -> Result<AccountantAssignment> {
        self.require_user(accountant_id, Role::Accountant).await?;

        let removed_from = self
            .store
            .properties
            .update_many(
                &PropertyFilter::by_accountant(accountant_id),
                &PropertyPatch::accountants(AccountantOp::Remove(accountant_id)),
            )
            .await?;

        let mut wanted = property_ids.to_vec();
        wanted.sort();
        wanted.dedup();
        if !wanted.is_empty() {
            self.store
                .properties
                .update_many(
                    &PropertyFilter::by_ids(wanted),
                    &PropertyPatch::accountants(AccountantOp::Add(accountant_id)),
                )
                .await?;
        }

        let assigned_property_ids = self
            .store
            .properties
            .find(&PropertyFilter::by_accountant(accountant_id))
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect::<Vec<_>>();

        tracing::info!(
            accountant_id = %accountant_id,
            removed_from,
            assigned = assigned_property_ids.len(),
            "accountant assignments replaced"
        );
        Ok(AccountantAssignment {
            accountant_id,
            removed_from,
            assigned_property_ids,
        })
    }

    /// Deletes the owner's properties, then its api keys, then the owner.
    pub async fn delete_owner(&self, owner_id: Uuid) -> Result<OwnerDeletion> {
        self.require_user(owner_id, Role::Owner).await?;

        let deleted_properties = self
            .store
            .properties
            .delete_many(&PropertyFilter::by_owner(owner_id))
            .await?;
        let deleted_api_keys = self.store.api_keys.delete_by_owner(owner_id).await?;

        if !self.store.users.delete_by_id(owner_id).await? {
            return Err(Error::not_found(format!("owner {} not found", owner_id)));
        }

        tracing::info!(
            owner_id = %owner_id,
            deleted_properties,
            deleted_api_keys,
            "owner deleted"
        );
        Ok(OwnerDeletion {
            owner_id,
            deleted_properties,
            deleted_api_keys,
        })
    }

    pub async fn delete_accountant(&self, accountant_id: Uuid) -> Result<AccountantDeletion> {
        self.require_user(accountant_id, Role::Accountant).await?;

        let unassigned_properties = self
            .store
            .properties
            .update_many(
                &PropertyFilter::by_accountant(accountant_id),
                &PropertyPatch::accountants(AccountantOp::Remove(accountant_id)),
            )
            .await?;

        if !self.store.users.delete_by_id(accountant_id).await? {
            return Err(Error::not_found(format!(
                "accountant {} not found",
                accountant_id
            )));
        }

        tracing::info!(
            accountant_id = %accountant_id,
            unassigned_properties,
            "accountant deleted"
        );
        Ok(AccountantDeletion {
            accountant_id,
            unassigned_properties,
        })
    }

    /// Detaching accountants is best-effort; the property is deleted either way.
    pub async fn delete_property(
        &self,
        property_ref: PropertyRef,
    ) -> Result<Outcome<PropertyDeletion>> {
        let property = self.find_property(property_ref).await?;
        let mut warnings = Warnings::new();

        let mut detached_accountants = 0;
        for accountant_id in &property.accountants {
            let cleanup = self
                .store
                .properties
                .update_by_id(
                    property.id,
                    &PropertyPatch::accountants(AccountantOp::Remove(*accountant_id)),
                )
                .await;
            match cleanup {
                Ok(_) => detached_accountants += 1,
                Err(err) => warnings.push(
                    Step::AccountantCleanup,
                    format!("could not detach accountant {}: {}", accountant_id, err),
                ),
            }
        }

        if !self.store.properties.delete_by_id(property.id).await? {
            return Err(Error::not_found(format!("Property {} not found", property_ref)));
        }

        tracing::info!(
            property_id = %property.id,
            external_id = property.external_id,
            detached_accountants,
            "property deleted"
        );
        Ok(warnings.finish(PropertyDeletion {
            id: property.id,
            external_id: property.external_id,
            detached_accountants,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::PropertyStore;
    use crate::models::api_keys::OwnerApiKeys;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    async fn seed_user(store: &Store, role: Role, email: &str) -> User {
        let user = User::new(email.into(), email.into(), None, "hash".into(), role, vec![]);
        store.users.create(&user).await.unwrap()
    }

    async fn seed_property(store: &Store, external_id: i64, ownership: Ownership) -> Property {
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            external_id,
            name: format!("Casa {}", external_id),
            address: "Av. da Liberdade".into(),
            property_type: Some("apartment".into()),
            bedrooms: 2,
            bathrooms: 1,
            max_guests: 4,
            hostkit_id: None,
            hostkit_api_key: None,
            status: "active".into(),
            amenities: vec![],
            images: vec![],
            ownership,
            accountants: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        store.properties.create(&property).await.unwrap()
    }

    #[test]
    fn owner_target_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(OwnerTarget::try_from("ADMIN".to_string()).unwrap(), OwnerTarget::AdminPool);
        assert_eq!(OwnerTarget::try_from(id.to_string()).unwrap(), OwnerTarget::Owner(id));
        assert!(OwnerTarget::try_from("nobody".to_string()).is_err());
    }

    #[tokio::test]
    async fn assignment_moves_both_ownership_fields_together() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let owner = seed_user(&store, Role::Owner, "o@x.io").await;
        seed_property(&store, 10, Ownership::Admin).await;

        let p = service
            .assign_property_to_owner(10, OwnerTarget::Owner(owner.id))
            .await
            .unwrap();
        assert_eq!(p.owner_id(), Some(owner.id));
        assert!(!p.is_admin_owned());

        let p = service
            .assign_property_to_owner(10, OwnerTarget::AdminPool)
            .await
            .unwrap();
        assert_eq!(p.owner_id(), None);
        assert!(p.is_admin_owned());
    }

    #[tokio::test]
    async fn assignment_rejects_unknown_property_and_non_owner_target() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;
        seed_property(&store, 10, Ownership::Admin).await;

        let err = service
            .assign_property_to_owner(99, OwnerTarget::AdminPool)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = service
            .assign_property_to_owner(10, OwnerTarget::Owner(accountant.id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let p = service.find_property(PropertyRef::External(10)).await.unwrap();
        assert!(p.is_admin_owned());
    }

    #[tokio::test]
    async fn assignment_keeps_accountants() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let owner = seed_user(&store, Role::Owner, "o@x.io").await;
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;
        let p = seed_property(&store, 10, Ownership::Admin).await;
        service
            .set_accountant_assignments(accountant.id, &[p.id])
            .await
            .unwrap();

        let moved = service
            .assign_property_to_owner(10, OwnerTarget::Owner(owner.id))
            .await
            .unwrap();
        assert!(moved.accountants.contains(&accountant.id));
    }

    #[tokio::test]
    async fn accountant_assignments_are_idempotent_and_replace() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;
        let p1 = seed_property(&store, 1, Ownership::Admin).await;
        let p2 = seed_property(&store, 2, Ownership::Admin).await;
        let p3 = seed_property(&store, 3, Ownership::Admin).await;

        let once = service
            .set_accountant_assignments(accountant.id, &[p1.id, p2.id, p2.id])
            .await
            .unwrap();
        let twice = service
            .set_accountant_assignments(accountant.id, &[p1.id, p2.id])
            .await
            .unwrap();
        assert_eq!(once.assigned_property_ids, twice.assigned_property_ids);
        assert_eq!(twice.assigned_property_ids.len(), 2);

        let replaced = service
            .set_accountant_assignments(accountant.id, &[p3.id])
            .await
            .unwrap();
        assert_eq!(replaced.removed_from, 2);
        assert_eq!(replaced.assigned_property_ids, vec![p3.id]);

        let p1 = service.find_property(PropertyRef::Storage(p1.id)).await.unwrap();
        assert!(p1.accountants.is_empty());
    }

    #[tokio::test]
    async fn delete_owner_cascades_and_spares_others() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let owner = seed_user(&store, Role::Owner, "o@x.io").await;
        let other = seed_user(&store, Role::Owner, "p@x.io").await;
        seed_property(&store, 1, Ownership::Owner(owner.id)).await;
        seed_property(&store, 2, Ownership::Owner(owner.id)).await;
        seed_property(&store, 3, Ownership::Owner(other.id)).await;
        seed_property(&store, 4, Ownership::Admin).await;
        store
            .api_keys
            .upsert(&OwnerApiKeys::new(owner.id, "k".into(), "s".into()))
            .await
            .unwrap();

        let summary = service.delete_owner(owner.id).await.unwrap();
        assert_eq!(summary.deleted_properties, 2);
        assert_eq!(summary.deleted_api_keys, 1);

        assert_eq!(
            store.properties.count(&PropertyFilter::by_owner(owner.id)).await.unwrap(),
            0
        );
        assert!(store.api_keys.find_by_owner(owner.id).await.unwrap().is_none());
        assert!(store.users.find_one(&UserFilter::by_id(owner.id)).await.unwrap().is_none());
        assert_eq!(store.properties.count(&PropertyFilter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_unknown_owner_touches_nothing() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;

        let err = service.delete_owner(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Wrong role is not an owner either.
        let err = service.delete_owner(accountant.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.users.count(&UserFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_accountant_unassigns_everywhere() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;
        let p1 = seed_property(&store, 1, Ownership::Admin).await;
        let p2 = seed_property(&store, 2, Ownership::Admin).await;
        service
            .set_accountant_assignments(accountant.id, &[p1.id, p2.id])
            .await
            .unwrap();

        let summary = service.delete_accountant(accountant.id).await.unwrap();
        assert_eq!(summary.unassigned_properties, 2);
        assert_eq!(
            store
                .properties
                .count(&PropertyFilter::by_accountant(accountant.id))
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.properties.count(&PropertyFilter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_property_by_either_id() {
        let store = Store::memory();
        let service = RelationshipService::new(store.clone());
        let accountant = seed_user(&store, Role::Accountant, "a@x.io").await;
        let p1 = seed_property(&store, 1, Ownership::Admin).await;
        seed_property(&store, 2, Ownership::Admin).await;
        service
            .set_accountant_assignments(accountant.id, &[p1.id])
            .await
            .unwrap();

        let outcome = service
            .delete_property(PropertyRef::Storage(p1.id))
            .await
            .unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.value.detached_accountants, 1);

        let outcome = service
            .delete_property(PropertyRef::External(2))
            .await
            .unwrap();
        assert_eq!(outcome.value.external_id, 2);

        let err = service
            .delete_property(PropertyRef::External(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    /// Property collection whose single-document updates always fail.
    struct StuckUpdates(Arc<dyn PropertyStore>);

    #[async_trait]
    impl PropertyStore for StuckUpdates {
        async fn find_one(&self, filter: &PropertyFilter) -> Result<Option<Property>> {
            self.0.find_one(filter).await
        }
        async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
            self.0.find(filter).await
        }
        async fn count(&self, filter: &PropertyFilter) -> Result<u64> {
            self.0.count(filter).await
        }
        async fn create(&self, property: &Property) -> Result<Property> {
            self.0.create(property).await
        }
        async fn update_by_id(
            &self,
            _id: Uuid,
            _patch: &PropertyPatch,
        ) -> Result<Option<Property>> {
            Err(Error::Internal("properties collection is read-only".into()))
        }
        async fn update_many(&self, filter: &PropertyFilter, patch: &PropertyPatch) -> Result<u64> {
            self.0.update_many(filter, patch).await
        }
        async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
            self.0.delete_by_id(id).await
        }
        async fn delete_many(&self, filter: &PropertyFilter) -> Result<u64> {
            self.0.delete_many(filter).await
        }
    }

    #[tokio::test]
    async fn delete_property_proceeds_when_detaching_fails() {
        let memory = Store::memory();
        let store = Store::new(
            memory.users.clone(),
            Arc::new(StuckUpdates(memory.properties.clone())),
            memory.api_keys.clone(),
        );
        let service = RelationshipService::new(store.clone());
        let first = seed_user(&store, Role::Accountant, "a1@x.io").await;
        let second = seed_user(&store, Role::Accountant, "a2@x.io").await;
        let p = seed_property(&store, 3, Ownership::Admin).await;
        service.set_accountant_assignments(first.id, &[p.id]).await.unwrap();
        service.set_accountant_assignments(second.id, &[p.id]).await.unwrap();

        let outcome = service
            .delete_property(PropertyRef::External(3))
            .await
            .unwrap();
        assert!(outcome.has_warning(Step::AccountantCleanup));
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.value.detached_accountants, 0);
        assert!(store
            .properties
            .find_one(&PropertyFilter::by_id(p.id))
            .await
            .unwrap()
            .is_none());
    }
}
