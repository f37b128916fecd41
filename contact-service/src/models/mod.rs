//! Persisted models.
//!
//! A model is bound to one project's [`Database`](crate::database::Database)
//! when it is registered with the manager, declares the table it owns and
//! carries the queries for it.

mod contact_submission;
mod newsletter_subscription;

pub use contact_submission::{ContactSubmissions, NewContact};
pub use newsletter_subscription::{NewSubscription, NewsletterSubscriptions};

use common::errors::AppResult;

use crate::db_manager::DatabaseManager;
use crate::schema::TableSchema;

/// Registry name of the contact submission model.
pub const CONTACT_SUBMISSION: &str = "ContactSubmission";
/// Registry name of the newsletter subscription model.
pub const NEWSLETTER_SUBSCRIPTION: &str = "NewsletterSubscription";

/// A table-backed model registered with the [`DatabaseManager`].
pub trait Model: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Table this model owns.
    fn schema(&self) -> &'static TableSchema;
}

/// Registers the contact and newsletter models for an initialized project.
pub async fn register_form_models(manager: &DatabaseManager, project: &str) -> AppResult<()> {
    manager
        .register_model(project, CONTACT_SUBMISSION, ContactSubmissions::new)
        .await?;
    manager
        .register_model(project, NEWSLETTER_SUBSCRIPTION, NewsletterSubscriptions::new)
        .await?;
    Ok(())
}
