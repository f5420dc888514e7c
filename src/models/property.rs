use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

/// Who a property belongs to. The only transition is an explicit reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "owner_id", rename_all = "snake_case")]
pub enum Ownership {
    Admin,
    Owner(Uuid),
}

impl Ownership {
    pub fn owner_id(&self) -> Option<Uuid> {
        match self {
            Ownership::Admin => None,
            Ownership::Owner(id) => Some(*id),
        }
    }

    pub fn is_admin_owned(&self) -> bool {
        matches!(self, Ownership::Admin)
    }

    /// Inverse of the `(owner, is_admin_owned)` column pair. Mixed pairs are
    /// rejected instead of being guessed at.
    pub fn from_columns(owner_id: Option<Uuid>, is_admin_owned: bool) -> Result<Self, Error> {
        match (owner_id, is_admin_owned) {
            (None, true) => Ok(Ownership::Admin),
            (Some(id), false) => Ok(Ownership::Owner(id)),
            (owner, admin) => Err(Error::Internal(format!(
                "inconsistent ownership columns: owner={:?} is_admin_owned={}",
                owner, admin
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub external_id: i64,
    pub name: String,
    pub address: String,
    pub property_type: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub max_guests: i32,
    pub hostkit_id: Option<String>,
    #[serde(skip_serializing)]
    pub hostkit_api_key: Option<String>,
    pub status: String,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub ownership: Ownership,
    pub accountants: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn is_admin_owned(&self) -> bool {
        self.ownership.is_admin_owned()
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.ownership.owner_id()
    }
}

/// Either identifier a caller may use for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRef {
    Storage(Uuid),
    External(i64),
}

impl PropertyRef {
    /// A UUID is a storage id, an integer is the external id, anything else
    /// is rejected.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if let Ok(id) = Uuid::parse_str(raw) {
            return Ok(PropertyRef::Storage(id));
        }
        raw.parse::<i64>()
            .map(PropertyRef::External)
            .map_err(|_| Error::InvalidInput(format!("'{}' is not a property id", raw)))
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyRef::Storage(id) => write!(f, "{}", id),
            PropertyRef::External(id) => write!(f, "#{}", id),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub external_id: i64,
    pub name: String,
    pub address: String,
    pub property_type: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub max_guests: i32,
    pub hostkit_id: Option<String>,
    pub hostkit_api_key: Option<String>,
    pub status: String,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub owner_id: Option<Uuid>,
    pub is_admin_owned: bool,
    pub accountants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = Error;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        Ok(Property {
            ownership: Ownership::from_columns(row.owner_id, row.is_admin_owned)?,
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            address: row.address,
            property_type: row.property_type,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            max_guests: row.max_guests,
            hostkit_id: row.hostkit_id,
            hostkit_api_key: row.hostkit_api_key,
            status: row.status,
            amenities: row.amenities,
            images: row.images,
            accountants: row.accountants.into_iter().collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_column_pairs() {
        let owner = Uuid::new_v4();
        assert_eq!(Ownership::from_columns(None, true).unwrap(), Ownership::Admin);
        assert_eq!(
            Ownership::from_columns(Some(owner), false).unwrap(),
            Ownership::Owner(owner)
        );
        assert!(Ownership::from_columns(Some(owner), true).is_err());
        assert!(Ownership::from_columns(None, false).is_err());

        assert_eq!(Ownership::Owner(owner).owner_id(), Some(owner));
        assert!(!Ownership::Owner(owner).is_admin_owned());
        assert!(Ownership::Admin.is_admin_owned());
    }

    #[test]
    fn property_ref_by_shape() {
        let id = Uuid::new_v4();
        assert_eq!(
            PropertyRef::parse(&id.to_string()).unwrap(),
            PropertyRef::Storage(id)
        );
        assert_eq!(PropertyRef::parse(" 4021 ").unwrap(), PropertyRef::External(4021));
        assert!(matches!(
            PropertyRef::parse("villa-7"),
            Err(Error::InvalidInput(_))
        ));
    }
}
