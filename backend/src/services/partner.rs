//! Supplier and institution registry
//!
//! Both registries have the same shape: a unique name plus optional contact
//! details. Suppliers are referenced by purchase orders, institutions by
//! deliveries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validate_email;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Which registry a partner belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerKind {
    Supplier,
    Institution,
}

impl PartnerKind {
    fn table(&self) -> &'static str {
        match self {
            PartnerKind::Supplier => "suppliers",
            PartnerKind::Institution => "institutions",
        }
    }

    /// Table and column that reference this registry
    fn referenced_by(&self) -> (&'static str, &'static str) {
        match self {
            PartnerKind::Supplier => ("purchase_orders", "supplier_id"),
            PartnerKind::Institution => ("deliveries", "institution_id"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PartnerKind::Supplier => "Supplier",
            PartnerKind::Institution => "Institution",
        }
    }
}

/// Supplier or institution
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a partner
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePartnerInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub contact_email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

/// Registry service for suppliers and institutions
#[derive(Clone)]
pub struct PartnerService {
    db: PgPool,
    kind: PartnerKind,
}

impl PartnerService {
    pub fn new(db: PgPool, kind: PartnerKind) -> Self {
        Self { db, kind }
    }

    pub fn suppliers(db: PgPool) -> Self {
        Self::new(db, PartnerKind::Supplier)
    }

    pub fn institutions(db: PgPool) -> Self {
        Self::new(db, PartnerKind::Institution)
    }

    /// Register a partner; names are unique per registry
    pub async fn create(&self, input: CreatePartnerInput) -> AppResult<Partner> {
        input.validate()?;

        let contact_email = input
            .contact_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(email) = contact_email {
            validate_email(email)?;
        }
        let phone = input.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let partner = sqlx::query_as::<_, Partner>(&format!(
            r#"
            INSERT INTO {} (name, contact_email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, contact_email, phone, created_at
            "#,
            self.kind.table()
        ))
        .bind(input.name.trim())
        .bind(contact_email)
        .bind(phone)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "name"))?;

        tracing::info!(id = %partner.id, kind = self.kind.label(), name = %partner.name, "Partner registered");

        Ok(partner)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Partner> {
        sqlx::query_as::<_, Partner>(&format!(
            "SELECT id, name, contact_email, phone, created_at FROM {} WHERE id = $1",
            self.kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<Partner>> {
        let partners = sqlx::query_as::<_, Partner>(&format!(
            "SELECT id, name, contact_email, phone, created_at FROM {} ORDER BY name",
            self.kind.table()
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(partners)
    }

    /// Delete a partner that no document references
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let partner = self.get(id).await?;

        let (table, column) = self.kind.referenced_by();
        let references = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table, column
        ))
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if references > 0 {
            return Err(AppError::conflicting_delete(
                &self.kind.label().to_lowercase(),
                format!("{} is referenced by {} document(s)", partner.name, references),
            ));
        }

        // A document created after the count is caught by the foreign key
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.kind.table()))
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_delete_violation(e, &self.kind.label().to_lowercase()))?;

        tracing::info!(id = %id, kind = self.kind.label(), "Partner deleted");

        Ok(())
    }
}
