use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{PropertyFilter, Store, UserFilter};
use crate::dto::admin_dto::{CompleteBootstrapPayload, CreatePropertyPayload, CreateUserPayload};
use crate::error::{Error, Result};
use crate::models::api_keys::OwnerApiKeys;
use crate::models::invoice::Invoice;
use crate::models::property::{Ownership, Property, PropertyRef};
use crate::models::user::{Role, User};
use crate::services::invoice_service::InvoiceSource;
use crate::services::notification_service::{Notifier, WelcomeEmail};
use crate::services::otp_service::{OtpPurpose, OtpService};
use crate::services::outcome::{Outcome, Step, Warnings};
use crate::services::relationship_service::{
    AccountantAssignment, AccountantDeletion, OwnerDeletion, OwnerTarget, PropertyDeletion,
    RelationshipService,
};
use crate::services::statement_service::{Period, StatementBreakdown, StatementService};
use crate::utils::crypto::hash_password;

#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: User,
    /// Whether credentials were supplied, not whether they work.
    pub has_api_keys: bool,
    pub property: Option<Property>,
}

#[derive(Debug, Clone)]
pub struct OwnerStatement {
    pub property: Property,
    pub breakdown: StatementBreakdown,
    pub invoices: Vec<Invoice>,
}

/// Admin use-cases. The primary record of each operation decides success;
/// auxiliary writes and notifications are reported as warnings.
#[derive(Clone)]
pub struct AdminService {
    store: Store,
    relationships: RelationshipService,
    notifier: Arc<dyn Notifier>,
    invoices: Arc<dyn InvoiceSource>,
    otp: Arc<dyn OtpService>,
    portal_url: String,
}

impl AdminService {
    pub fn new(
        store: Store,
        notifier: Arc<dyn Notifier>,
        invoices: Arc<dyn InvoiceSource>,
        otp: Arc<dyn OtpService>,
        portal_url: String,
    ) -> Self {
        Self {
            relationships: RelationshipService::new(store.clone()),
            store,
            notifier,
            invoices,
            otp,
            portal_url,
        }
    }

    pub async fn create_owner_or_accountant(
        &self,
        payload: CreateUserPayload,
    ) -> Result<Outcome<CreatedUser>> {
        payload.validate()?;
        if payload.role == Role::Admin {
            return Err(Error::invalid(
                "administrators can only be created through the bootstrap flow",
            ));
        }
        let password = payload
            .password
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::invalid("password is required"))?;
        if self
            .store
            .users
            .find_one(&UserFilter::by_email(&payload.email))
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "A user with email {} already exists",
                payload.email.trim()
            )));
        }

        let mut user = User::new(
            payload.name.trim().to_string(),
            payload.email,
            payload.phone,
            hash_password(&password)?,
            payload.role,
            payload.companies,
        );
        // Admin-created accounts skip email verification.
        user.is_verified = true;
        let user = self.store.users.create(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");

        let mut warnings = Warnings::new();

        let credentials = match (payload.hostkit_api_key, payload.hostkit_api_secret) {
            (Some(key), Some(secret)) if !key.trim().is_empty() && !secret.trim().is_empty() => {
                Some((key, secret))
            }
            (None, None) => None,
            _ => {
                warnings.push(
                    Step::ApiKeys,
                    "both hostkit_api_key and hostkit_api_secret are required",
                );
                None
            }
        };
        let has_api_keys = credentials.is_some();
        if let Some((key, secret)) = credentials {
            if user.role != Role::Owner {
                warnings.push(Step::ApiKeys, "api credentials are only stored for owners");
            } else if let Err(err) = self
                .store
                .api_keys
                .upsert(&OwnerApiKeys::new(user.id, key, secret))
                .await
            {
                warnings.push(Step::ApiKeys, format!("could not store api keys: {}", err));
            }
        }

        let mut property = None;
        if let Some(inline) = payload.property {
            if user.role != Role::Owner {
                warnings.push(
                    Step::InlineProperty,
                    "inline properties are only created for owners",
                );
            } else {
                match self.insert_property(inline, Ownership::Owner(user.id)).await {
                    Ok(created) => property = Some(created),
                    Err(err) => warnings.push(
                        Step::InlineProperty,
                        format!("could not create property: {}", err),
                    ),
                }
            }
        }

        let email = WelcomeEmail {
            name: user.name.clone(),
            email: user.email.clone(),
            password,
            portal_url: self.portal_url.clone(),
        };
        let delivered = match user.role {
            Role::Accountant => self.notifier.send_accountant_welcome_email(&email).await,
            _ => self.notifier.send_welcome_email(&email).await,
        };
        if !delivered {
            warnings.push(Step::WelcomeEmail, "welcome email was not delivered");
        }

        Ok(warnings.finish(CreatedUser {
            user,
            has_api_keys,
            property,
        }))
    }

    pub async fn create_property(&self, payload: CreatePropertyPayload) -> Result<Property> {
        let ownership = match payload.owner_id {
            Some(owner_id) => {
                self.require_owner(owner_id).await?;
                Ownership::Owner(owner_id)
            }
            None => Ownership::Admin,
        };
        let property = self.insert_property(payload, ownership).await?;
        tracing::info!(
            property_id = %property.id,
            external_id = property.external_id,
            admin_owned = property.is_admin_owned(),
            "property created"
        );
        Ok(property)
    }

    async fn insert_property(
        &self,
        payload: CreatePropertyPayload,
        ownership: Ownership,
    ) -> Result<Property> {
        payload.validate()?;
        if self
            .store
            .properties
            .find_one(&PropertyFilter::by_external_id(payload.external_id))
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "A property with id {} already exists",
                payload.external_id
            )));
        }

        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            external_id: payload.external_id,
            name: payload.name.trim().to_string(),
            address: payload.address.trim().to_string(),
            property_type: payload.property_type,
            bedrooms: payload.bedrooms,
            bathrooms: payload.bathrooms,
            max_guests: payload.max_guests,
            hostkit_id: payload.hostkit_id,
            hostkit_api_key: payload.hostkit_api_key,
            status: payload.status.unwrap_or_else(|| "active".to_string()),
            amenities: payload.amenities,
            images: payload.images,
            ownership,
            accountants: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.properties.create(&property).await
    }

    async fn require_owner(&self, owner_id: Uuid) -> Result<User> {
        self.store
            .users
            .find_one(&UserFilter::by_id(owner_id).with_role(Role::Owner))
            .await?
            .ok_or_else(|| Error::not_found(format!("owner {} not found", owner_id)))
    }

    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let filter = UserFilter {
            role,
            ..Default::default()
        };
        self.store.users.find(&filter).await
    }

    pub async fn list_properties(&self, owner_id: Option<Uuid>) -> Result<Vec<Property>> {
        let filter = PropertyFilter {
            owner_id,
            ..Default::default()
        };
        self.store.properties.find(&filter).await
    }

    pub async fn get_property(&self, property_ref: PropertyRef) -> Result<Property> {
        self.relationships.find_property(property_ref).await
    }

    pub async fn assign_property_to_owner(
        &self,
        external_id: i64,
        target: OwnerTarget,
    ) -> Result<Property> {
        self.relationships
            .assign_property_to_owner(external_id, target)
            .await
    }

    pub async fn set_accountant_assignments(
        &self,
        accountant_id: Uuid,
        property_ids: &[Uuid],
    ) -> Result<AccountantAssignment> {
        self.relationships
            .set_accountant_assignments(accountant_id, property_ids)
            .await
    }

    pub async fn delete_owner(&self, owner_id: Uuid) -> Result<OwnerDeletion> {
        self.relationships.delete_owner(owner_id).await
    }

    pub async fn delete_accountant(&self, accountant_id: Uuid) -> Result<AccountantDeletion> {
        self.relationships.delete_accountant(accountant_id).await
    }

    pub async fn delete_property(
        &self,
        property_ref: PropertyRef,
    ) -> Result<Outcome<PropertyDeletion>> {
        self.relationships.delete_property(property_ref).await
    }

    pub async fn generate_owner_statement(
        &self,
        external_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<OwnerStatement> {
        if start_date > end_date {
            return Err(Error::invalid(format!(
                "start_date {} is after end_date {}",
                start_date, end_date
            )));
        }
        let property = self
            .relationships
            .find_property(PropertyRef::External(external_id))
            .await?;
        let invoices = self
            .invoices
            .get_invoices(external_id, start_date, end_date)
            .await?;

        let breakdown = StatementService::compute(
            property.is_admin_owned(),
            &invoices,
            Period {
                start_date,
                end_date,
            },
        )?;
        tracing::info!(
            external_id,
            invoice_count = breakdown.invoice_count,
            gross = %breakdown.gross_amount,
            final_owner_amount = %breakdown.final_owner_amount,
            "owner statement generated"
        );
        Ok(OwnerStatement {
            property,
            breakdown,
            invoices,
        })
    }

    async fn ensure_no_admin(&self) -> Result<()> {
        let admins = self
            .store
            .users
            .count(&UserFilter::by_role(Role::Admin))
            .await?;
        if admins > 0 {
            return Err(Error::conflict("An administrator already exists"));
        }
        Ok(())
    }

    /// First step of the one-time admin bootstrap: mails a verification code.
    pub async fn request_admin_bootstrap(&self, email: &str) -> Result<()> {
        self.ensure_no_admin().await?;
        if !self.otp.send_otp(email, OtpPurpose::AdminBootstrap).await {
            return Err(Error::Internal(
                "verification code could not be delivered".to_string(),
            ));
        }
        tracing::info!(email = %email.trim(), "admin bootstrap code sent");
        Ok(())
    }

    pub async fn complete_admin_bootstrap(&self, payload: CompleteBootstrapPayload) -> Result<User> {
        payload.validate()?;
        if !self.otp.verify_otp(&payload.email, &payload.code).await {
            return Err(Error::invalid("verification code is invalid or expired"));
        }
        self.ensure_no_admin().await?;
        if self
            .store
            .users
            .find_one(&UserFilter::by_email(&payload.email))
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "A user with email {} already exists",
                payload.email.trim()
            )));
        }

        let mut admin = User::new(
            payload.name.trim().to_string(),
            payload.email,
            payload.phone,
            hash_password(&payload.password)?,
            Role::Admin,
            Vec::new(),
        );
        admin.is_verified = true;
        let admin = self.store.users.create(&admin).await?;
        tracing::info!(user_id = %admin.id, "administrator bootstrapped");
        Ok(admin)
    }
}
