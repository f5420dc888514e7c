use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::invoice::Invoice;
use crate::models::property::Property;
use crate::models::user::{Company, Role, User};
use crate::services::admin_service::{CreatedUser, OwnerStatement};
use crate::services::relationship_service::OwnerTarget;
use crate::services::statement_service::StatementBreakdown;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePropertyPayload {
    #[validate(range(min = 1))]
    pub external_id: i64,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub property_type: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub bedrooms: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub bathrooms: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub max_guests: i32,
    pub hostkit_id: Option<String>,
    pub hostkit_api_key: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Ignored for inline properties, which always belong to the new owner.
    pub owner_id: Option<Uuid>,
}

/// `property` is validated by the inline-property step, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserPayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub companies: Vec<Company>,
    pub hostkit_api_key: Option<String>,
    pub hostkit_api_secret: Option<String>,
    pub property: Option<CreatePropertyPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignOwnerPayload {
    pub owner: OwnerTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAccountantPropertiesPayload {
    #[serde(default)]
    pub property_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyListQuery {
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BootstrapOtpPayload {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteBootstrapPayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 4, max = 12))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub companies: Vec<Company>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role: u.role,
            is_verified: u.is_verified,
            companies: u.companies,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// The api key itself is never returned; `owner_id`/`is_admin_owned` are
/// both derived from the single ownership value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResponse {
    pub id: Uuid,
    pub external_id: i64,
    pub name: String,
    pub address: String,
    pub property_type: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub max_guests: i32,
    pub hostkit_id: Option<String>,
    pub has_hostkit_api_key: bool,
    pub status: String,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub owner_id: Option<Uuid>,
    pub is_admin_owned: bool,
    pub accountants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Property> for PropertyResponse {
    fn from(p: Property) -> Self {
        Self {
            id: p.id,
            external_id: p.external_id,
            owner_id: p.owner_id(),
            is_admin_owned: p.is_admin_owned(),
            has_hostkit_api_key: p.hostkit_api_key.as_deref().is_some_and(|k| !k.is_empty()),
            name: p.name,
            address: p.address,
            property_type: p.property_type,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            max_guests: p.max_guests,
            hostkit_id: p.hostkit_id,
            status: p.status,
            amenities: p.amenities,
            images: p.images,
            accountants: p.accountants.into_iter().collect(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUserResponse {
    pub user: UserResponse,
    pub has_api_keys: bool,
    pub property: Option<PropertyResponse>,
}

impl From<CreatedUser> for CreatedUserResponse {
    fn from(created: CreatedUser) -> Self {
        Self {
            user: created.user.into(),
            has_api_keys: created.has_api_keys,
            property: created.property.map(PropertyResponse::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyListResponse {
    pub items: Vec<PropertyResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementResponse {
    pub property_id: i64,
    pub property_name: String,
    pub is_admin_owned: bool,
    #[serde(flatten)]
    pub breakdown: StatementBreakdown,
    pub invoices: Vec<Invoice>,
}

impl From<OwnerStatement> for StatementResponse {
    fn from(s: OwnerStatement) -> Self {
        Self {
            property_id: s.property.external_id,
            is_admin_owned: s.property.is_admin_owned(),
            property_name: s.property.name,
            breakdown: s.breakdown,
            invoices: s.invoices,
        }
    }
}
