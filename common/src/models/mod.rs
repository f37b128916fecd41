//! Request and response models for the form endpoints.

pub mod contact;
pub mod newsletter;

// Re-export commonly used types
pub use contact::{
    ContactList, ContactListQuery, ContactReceipt, ContactRequest, ContactStatus,
    ContactSubmission, UpdateContactRequest,
};
pub use newsletter::{
    NewsletterList, NewsletterListQuery, NewsletterReceipt, NewsletterRequest,
    NewsletterSubscription,
};
