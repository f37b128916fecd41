//! Contact and newsletter operations for one project.

use std::sync::Arc;

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::extractors::ClientMeta;
use common::models::{
    ContactList, ContactListQuery, ContactRequest, ContactStatus, ContactSubmission,
    NewsletterList, NewsletterListQuery, NewsletterRequest, NewsletterSubscription,
    UpdateContactRequest,
};
use common::response::Pagination;

use crate::db_manager::DatabaseManager;
use crate::mailer::Notifier;
use crate::models::{
    ContactSubmissions, NewContact, NewSubscription, NewsletterSubscriptions, CONTACT_SUBMISSION,
    NEWSLETTER_SUBSCRIPTION,
};

const CONTACTS_PAGE_SIZE: u32 = 20;
const SUBSCRIBERS_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_SOURCE: &str = "website";

/// Result of a newsletter subscription request.
#[derive(Debug, Clone)]
pub enum SubscribeOutcome {
    Created(NewsletterSubscription),
    AlreadySubscribed,
    Reactivated(NewsletterSubscription),
}

/// Form service trait.
#[async_trait]
pub trait FormServiceTrait: Send + Sync {
    /// Stores a contact submission, notifying by mail first when possible.
    async fn submit_contact(&self, req: ContactRequest, client: ClientMeta) -> AppResult<ContactSubmission>;

    async fn subscribe(&self, req: NewsletterRequest, client: ClientMeta) -> AppResult<SubscribeOutcome>;

    async fn list_contacts(&self, query: ContactListQuery) -> AppResult<ContactList>;

    async fn update_contact(&self, id: i64, req: UpdateContactRequest) -> AppResult<ContactSubmission>;

    async fn list_subscribers(&self, query: NewsletterListQuery) -> AppResult<NewsletterList>;
}

/// Form service bound to one project's models.
pub struct FormService {
    manager: Arc<DatabaseManager>,
    notifier: Arc<dyn Notifier>,
    project: String,
}

impl FormService {
    pub fn new(
        manager: Arc<DatabaseManager>,
        notifier: Arc<dyn Notifier>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            notifier,
            project: project.into(),
        }
    }

    async fn contacts(&self) -> AppResult<Arc<ContactSubmissions>> {
        self.manager.model(&self.project, CONTACT_SUBMISSION).await
    }

    async fn subscriptions(&self) -> AppResult<Arc<NewsletterSubscriptions>> {
        self.manager.model(&self.project, NEWSLETTER_SUBSCRIPTION).await
    }
}

/// Trims and drops empty optional text.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn page_params(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[async_trait]
impl FormServiceTrait for FormService {
    async fn submit_contact(&self, req: ContactRequest, client: ClientMeta) -> AppResult<ContactSubmission> {
        let contacts = self.contacts().await?;

        let mut contact = NewContact {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: non_empty(req.phone),
            company: non_empty(req.company),
            inquiry_type: req.inquiry.trim().to_string(),
            subject: req.subject.trim().to_string(),
            message: req.message.trim().to_string(),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            email_sent: false,
        };
        tracing::info!(
            project = %self.project,
            email = %contact.email,
            inquiry = %contact.inquiry_type,
            "Contact form submission"
        );

        if self.notifier.is_enabled() {
            match self.notifier.notify_contact(&contact).await {
                Ok(()) => contact.email_sent = true,
                Err(e) => {
                    tracing::warn!(project = %self.project, error = %e, "Contact notification failed, storing anyway")
                }
            }
        } else {
            tracing::debug!(project = %self.project, "Mail disabled, skipping contact notification");
        }

        let submission = contacts.create(contact).await?;
        tracing::info!(project = %self.project, id = submission.id, email_sent = submission.email_sent, "Contact submission saved");
        Ok(submission)
    }

    async fn subscribe(&self, req: NewsletterRequest, client: ClientMeta) -> AppResult<SubscribeOutcome> {
        let subscriptions = self.subscriptions().await?;
        let email = req.email.trim().to_string();

        if let Some(existing) = subscriptions.find_by_email(&email).await? {
            if existing.is_active {
                return Ok(SubscribeOutcome::AlreadySubscribed);
            }
            subscriptions.reactivate(existing.id).await?;
            let reactivated = subscriptions
                .find_by_email(&email)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Subscription {} disappeared", existing.id)))?;
            return Ok(SubscribeOutcome::Reactivated(reactivated));
        }

        let subscription = subscriptions
            .create(NewSubscription {
                email,
                name: non_empty(req.name),
                source: Some(non_empty(req.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string())),
                ip_address: client.ip_address,
            })
            .await?;
        tracing::info!(project = %self.project, id = subscription.id, "Newsletter subscription saved");
        Ok(SubscribeOutcome::Created(subscription))
    }

    async fn list_contacts(&self, query: ContactListQuery) -> AppResult<ContactList> {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<ContactStatus>)
            .transpose()?;
        let (page, limit) = page_params(query.page, query.limit, CONTACTS_PAGE_SIZE);

        let (submissions, total) = self.contacts().await?.list(status, page, limit).await?;
        Ok(ContactList {
            submissions,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn update_contact(&self, id: i64, req: UpdateContactRequest) -> AppResult<ContactSubmission> {
        self.contacts()
            .await?
            .update(id, req.status, req.notes)
            .await?
            .ok_or_else(|| AppError::NotFound("Contact submission not found.".to_string()))
    }

    async fn list_subscribers(&self, query: NewsletterListQuery) -> AppResult<NewsletterList> {
        let (page, limit) = page_params(query.page, query.limit, SUBSCRIBERS_PAGE_SIZE);
        let (subscribers, total) = self
            .subscriptions()
            .await?
            .list(query.active, page, limit)
            .await?;
        Ok(NewsletterList {
            subscribers,
            pagination: Pagination::new(page, limit, total),
        })
    }
}
