use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::database::store::{
    AccountantOp, ApiKeyStore, PropertyFilter, PropertyPatch, PropertyStore, UserFilter,
    UserStore,
};
use crate::error::Result;
use crate::models::api_keys::OwnerApiKeys;
use crate::models::property::{Property, PropertyRow};
use crate::models::user::{User, UserRow};

const USER_SELECT: &str = "SELECT id, name, email, phone, password_hash, role, is_verified, \
     companies, created_at, updated_at FROM users";

const PROPERTY_SELECT: &str = "SELECT p.id, p.external_id, p.name, p.address, p.property_type, \
     p.bedrooms, p.bathrooms, p.max_guests, p.hostkit_id, p.hostkit_api_key, p.status, \
     p.amenities, p.images, p.owner_id, p.is_admin_owned, \
     ARRAY(SELECT pa.accountant_id FROM property_accountants pa \
           WHERE pa.property_id = p.id ORDER BY pa.accountant_id) AS accountants, \
     p.created_at, p.updated_at FROM properties p";

const API_KEYS_COLUMNS: &str =
    "owner_id, hostkit_api_key, hostkit_api_secret, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(email) = &filter.email {
        qb.push(" AND email = ").push_bind(email.clone());
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
}

fn push_property_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PropertyFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = filter.id {
        qb.push(" AND p.id = ").push_bind(id);
    }
    if let Some(ids) = &filter.ids {
        qb.push(" AND p.id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(external_id) = filter.external_id {
        qb.push(" AND p.external_id = ").push_bind(external_id);
    }
    if let Some(owner_id) = filter.owner_id {
        qb.push(" AND p.owner_id = ").push_bind(owner_id);
    }
    if let Some(accountant_id) = filter.accountant_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM property_accountants pa \
             WHERE pa.property_id = p.id AND pa.accountant_id = ",
        )
        .push_bind(accountant_id)
        .push(")");
    }
}

/// Appends the ownership columns when the patch moves the property. Returns
/// whether any column was set.
fn push_property_sets(qb: &mut QueryBuilder<'_, Postgres>, patch: &PropertyPatch) -> bool {
    let Some(ownership) = patch.ownership else {
        return false;
    };
    // Both columns move in one statement.
    qb.push(", owner_id = ")
        .push_bind(ownership.owner_id())
        .push(", is_admin_owned = ")
        .push_bind(ownership.is_admin_owned());
    true
}

impl PgStore {
    async fn apply_property_patch(
        &self,
        filter: &PropertyFilter,
        patch: &PropertyPatch,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut fields_modified = 0;
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE properties p SET updated_at = NOW()");
        if push_property_sets(&mut qb, patch) {
            push_property_filter(&mut qb, filter);
            fields_modified = qb.build().execute(&mut *tx).await?.rows_affected();
        }

        let accountants_modified = match patch.accountants {
            Some(AccountantOp::Add(accountant_id)) => {
                let mut qb = QueryBuilder::<Postgres>::new(
                    "INSERT INTO property_accountants (property_id, accountant_id) SELECT p.id, ",
                );
                qb.push_bind(accountant_id).push(" FROM properties p");
                push_property_filter(&mut qb, filter);
                qb.push(" ON CONFLICT DO NOTHING");
                qb.build().execute(&mut *tx).await?.rows_affected()
            }
            Some(AccountantOp::Remove(accountant_id)) => {
                let mut qb = QueryBuilder::<Postgres>::new(
                    "DELETE FROM property_accountants WHERE accountant_id = ",
                );
                qb.push_bind(accountant_id)
                    .push(" AND property_id IN (SELECT p.id FROM properties p");
                push_property_filter(&mut qb, filter);
                qb.push(")");
                qb.build().execute(&mut *tx).await?.rows_affected()
            }
            None => 0,
        };

        tx.commit().await?;
        Ok(fields_modified.max(accountants_modified))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(USER_SELECT);
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC LIMIT 1");
        let row = qb.build_query_as::<UserRow>().fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(USER_SELECT);
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC, email ASC");
        let rows = qb.build_query_as::<UserRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)? as u64)
    }

    async fn create(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, phone, password_hash, role, is_verified, \
             companies, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id, name, email, phone, password_hash, role, is_verified, companies, \
             created_at, updated_at",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(sqlx::types::Json(&user.companies))
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        User::try_from(row)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %id, error = ?e, "user deletion failed");
                e
            })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PropertyStore for PgStore {
    async fn find_one(&self, filter: &PropertyFilter) -> Result<Option<Property>> {
        let mut qb = QueryBuilder::<Postgres>::new(PROPERTY_SELECT);
        push_property_filter(&mut qb, filter);
        qb.push(" ORDER BY p.external_id ASC LIMIT 1");
        let row = qb
            .build_query_as::<PropertyRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(Property::try_from).transpose()
    }

    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let mut qb = QueryBuilder::<Postgres>::new(PROPERTY_SELECT);
        push_property_filter(&mut qb, filter);
        qb.push(" ORDER BY p.external_id ASC");
        let rows = qb.build_query_as::<PropertyRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Property::try_from).collect()
    }

    async fn count(&self, filter: &PropertyFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties p");
        push_property_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)? as u64)
    }

    async fn create(&self, property: &Property) -> Result<Property> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO properties (id, external_id, name, address, property_type, bedrooms, \
             bathrooms, max_guests, hostkit_id, hostkit_api_key, status, amenities, images, \
             owner_id, is_admin_owned, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(property.id)
        .bind(property.external_id)
        .bind(&property.name)
        .bind(&property.address)
        .bind(&property.property_type)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.max_guests)
        .bind(&property.hostkit_id)
        .bind(&property.hostkit_api_key)
        .bind(&property.status)
        .bind(&property.amenities)
        .bind(&property.images)
        .bind(property.owner_id())
        .bind(property.is_admin_owned())
        .bind(property.created_at)
        .bind(property.updated_at)
        .execute(&mut *tx)
        .await?;

        for accountant_id in &property.accountants {
            sqlx::query(
                "INSERT INTO property_accountants (property_id, accountant_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(property.id)
            .bind(accountant_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(property.clone())
    }

    async fn update_by_id(&self, id: Uuid, patch: &PropertyPatch) -> Result<Option<Property>> {
        let filter = PropertyFilter::by_id(id);
        self.apply_property_patch(&filter, patch).await?;
        PropertyStore::find_one(self, &filter).await
    }

    async fn update_many(&self, filter: &PropertyFilter, patch: &PropertyPatch) -> Result<u64> {
        self.apply_property_patch(filter, patch).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, filter: &PropertyFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM properties p");
        push_property_filter(&mut qb, filter);
        Ok(qb.build().execute(&self.pool).await?.rows_affected())
    }
}

#[async_trait]
impl ApiKeyStore for PgStore {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<OwnerApiKeys>> {
        let keys = sqlx::query_as::<_, OwnerApiKeys>(&format!(
            "SELECT {} FROM owner_api_keys WHERE owner_id = $1",
            API_KEYS_COLUMNS
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn upsert(&self, keys: &OwnerApiKeys) -> Result<OwnerApiKeys> {
        let stored = sqlx::query_as::<_, OwnerApiKeys>(&format!(
            "INSERT INTO owner_api_keys ({cols}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (owner_id) DO UPDATE SET \
                 hostkit_api_key = EXCLUDED.hostkit_api_key, \
                 hostkit_api_secret = EXCLUDED.hostkit_api_secret, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW() \
             RETURNING {cols}",
            cols = API_KEYS_COLUMNS
        ))
        .bind(keys.owner_id)
        .bind(&keys.hostkit_api_key)
        .bind(&keys.hostkit_api_secret)
        .bind(keys.is_active)
        .bind(keys.created_at)
        .bind(keys.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM owner_api_keys WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
