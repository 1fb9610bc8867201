use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::admin::associates::looks_like_email;
use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::{
    ContactQueryFilter, ContactsRepo, NewContactParams, RepoError,
};
use crate::domain::entities::ContactRecord;
use crate::domain::types::ContactStatus;

pub const CONTACT_SUBMITTED_MESSAGE: &str = "Contact form submitted successfully";

const ENTITY: &str = "contact";

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error("Invalid status")]
    InvalidStatus,
    #[error("Contact not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct ContactService {
    repo: Arc<dyn ContactsRepo>,
    audit: AdminAuditService,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactsRepo>, audit: AdminAuditService) -> Self {
        Self { repo, audit }
    }

    pub async fn submit(&self, submission: ContactSubmission) -> Result<ContactRecord, ContactError> {
        let name = required(submission.name, "name")?;
        let email = required(submission.email, "email")?;
        if !looks_like_email(&email) {
            return Err(ContactError::Invalid {
                field: "email",
                message: "Enter a valid email address.".into(),
            });
        }
        let subject = required(submission.subject, "subject")?;
        let message = required(submission.message, "message")?;
        let phone = submission
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty());

        let record = self
            .repo
            .create_contact(NewContactParams {
                name,
                email,
                phone,
                subject,
                message,
            })
            .await?;
        info!(
            target = "lightfield::application::contacts",
            contact_id = %record.id,
            "Contact submission stored"
        );
        Ok(record)
    }

    pub async fn list(&self, filter: &ContactQueryFilter) -> Result<Vec<ContactRecord>, ContactError> {
        Ok(self.repo.list_contacts(filter).await?)
    }

    /// Fetch a submission; opening an unread one marks it read.
    pub async fn open(&self, id: Uuid) -> Result<ContactRecord, ContactError> {
        let record = self
            .repo
            .find_contact(id)
            .await?
            .ok_or(ContactError::NotFound)?;
        if record.status != ContactStatus::Unread {
            return Ok(record);
        }
        Ok(self
            .repo
            .update_contact_status(id, ContactStatus::Read)
            .await?)
    }

    /// Only `read` and `responded` can be set by staff.
    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: Option<&str>,
    ) -> Result<ContactRecord, ContactError> {
        let status = match status.map(str::trim) {
            Some("read") => ContactStatus::Read,
            Some("responded") => ContactStatus::Responded,
            _ => return Err(ContactError::InvalidStatus),
        };
        if self.repo.find_contact(id).await?.is_none() {
            return Err(ContactError::NotFound);
        }

        let record = self.repo.update_contact_status(id, status).await?;
        self.audit
            .record(
                actor,
                "contact.status",
                ENTITY,
                Some(&id.to_string()),
                Some(&status.as_str()),
            )
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), ContactError> {
        if self.repo.find_contact(id).await?.is_none() {
            return Err(ContactError::NotFound);
        }
        self.repo.delete_contact(id).await?;
        self.audit
            .record::<()>(actor, "contact.delete", ENTITY, Some(&id.to_string()), None)
            .await?;
        Ok(())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ContactError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ContactError::Invalid {
            field,
            message: "This field is required.".into(),
        }),
    }
}
