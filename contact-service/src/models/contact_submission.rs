//! `contact_submissions` table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::errors::{AppError, AppResult};
use common::models::{ContactStatus, ContactSubmission};
use common::response::Pagination;

use super::Model;
use crate::database::{on_pool, query_error, Database, DbPool};
use crate::schema::{Column, ColumnKind, DefaultValue, Index, TableSchema};

pub static CONTACT_SUBMISSIONS: TableSchema = TableSchema {
    name: "contact_submissions",
    columns: &[
        Column::id(),
        Column::required("name", ColumnKind::Varchar(100)),
        Column::required("email", ColumnKind::Varchar(255)),
        Column::optional("phone", ColumnKind::Varchar(20)),
        Column::optional("company", ColumnKind::Varchar(200)),
        Column::required("inquiry_type", ColumnKind::Varchar(50)),
        Column::required("subject", ColumnKind::Varchar(255)),
        Column::required("message", ColumnKind::Text),
        Column::required("status", ColumnKind::Enum(&ContactStatus::ALL))
            .with_default(DefaultValue::Str("new")),
        Column::optional("ip_address", ColumnKind::Varchar(45)),
        Column::optional("user_agent", ColumnKind::Text),
        Column::required("email_sent", ColumnKind::Bool).with_default(DefaultValue::Bool(false)),
        Column::optional("notes", ColumnKind::Text),
        Column::required("created_at", ColumnKind::Timestamp),
        Column::required("updated_at", ColumnKind::Timestamp),
    ],
    indexes: &[
        Index::on(&["email"]),
        Index::on(&["status"]),
        Index::on(&["inquiry_type"]),
        Index::on(&["created_at"]),
    ],
};

const SELECT_COLUMNS: &str = "id, name, email, phone, company, inquiry_type, subject, message, \
     status, ip_address, user_agent, email_sent, notes, created_at, updated_at";

/// Row from the `contact_submissions` table.
#[derive(sqlx::FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    inquiry_type: String,
    subject: String,
    message: String,
    status: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    email_sent: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactRow {
    fn into_submission(self) -> AppResult<ContactSubmission> {
        let status = self.status.parse::<ContactStatus>().map_err(|_| {
            AppError::DatabaseQuery(format!(
                "contact submission {} has unknown status {:?}",
                self.id, self.status
            ))
        })?;
        Ok(ContactSubmission {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            inquiry_type: self.inquiry_type,
            subject: self.subject,
            message: self.message,
            status,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            email_sent: self.email_sent,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Fields of a submission about to be stored.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub inquiry_type: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub email_sent: bool,
}

macro_rules! insert_contact {
    ($new:expr, $now:expr) => {
        sqlx::query(
            "INSERT INTO contact_submissions \
             (name, email, phone, company, inquiry_type, subject, message, status, \
              ip_address, user_agent, email_sent, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&$new.name)
        .bind(&$new.email)
        .bind(&$new.phone)
        .bind(&$new.company)
        .bind(&$new.inquiry_type)
        .bind(&$new.subject)
        .bind(&$new.message)
        .bind(ContactStatus::New.as_str())
        .bind(&$new.ip_address)
        .bind(&$new.user_agent)
        .bind($new.email_sent)
        .bind($now)
        .bind($now)
    };
}

/// Contact submissions of one project.
pub struct ContactSubmissions {
    db: Arc<Database>,
}

impl ContactSubmissions {
    pub fn new(db: &Arc<Database>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, new: NewContact) -> AppResult<ContactSubmission> {
        let now = Utc::now();
        let id = match self.db.pool() {
            DbPool::Sqlite(pool) => insert_contact!(new, now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_rowid()),
            DbPool::MySql(pool) => insert_contact!(new, now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .map_err(query_error)?;

        tracing::debug!(project = %self.db.project(), id, "Contact submission stored");
        Ok(ContactSubmission {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            company: new.company,
            inquiry_type: new.inquiry_type,
            subject: new.subject,
            message: new.message,
            status: ContactStatus::New,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            email_sent: new.email_sent,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find(&self, id: i64) -> AppResult<Option<ContactSubmission>> {
        let sql = format!("SELECT {} FROM contact_submissions WHERE id = ?", SELECT_COLUMNS);
        let row = on_pool!(self.db.pool(), pool => {
            sqlx::query_as::<_, ContactRow>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .map_err(query_error)?;
        row.map(ContactRow::into_submission).transpose()
    }

    /// Newest first, optionally filtered by status. Returns the page and the total count.
    pub async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        limit: u32,
    ) -> AppResult<(Vec<ContactSubmission>, u64)> {
        let filter = if status.is_some() { " WHERE status = ?" } else { "" };
        let count_sql = format!("SELECT COUNT(*) FROM contact_submissions{}", filter);
        let list_sql = format!(
            "SELECT {} FROM contact_submissions{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, filter
        );
        let offset = Pagination::offset(page, limit) as i64;

        let total = on_pool!(self.db.pool(), pool => {
            let mut query = sqlx::query_scalar::<_, i64>(&count_sql);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            query.fetch_one(pool).await
        })
        .map_err(query_error)?;

        let rows = on_pool!(self.db.pool(), pool => {
            let mut query = sqlx::query_as::<_, ContactRow>(&list_sql);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            query.bind(i64::from(limit)).bind(offset).fetch_all(pool).await
        })
        .map_err(query_error)?;

        let submissions = rows
            .into_iter()
            .map(ContactRow::into_submission)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((submissions, total.max(0) as u64))
    }

    /// Applies an admin update. `notes: Some(None)` clears the notes.
    /// `None` when no submission has this id.
    pub async fn update(
        &self,
        id: i64,
        status: Option<ContactStatus>,
        notes: Option<Option<String>>,
    ) -> AppResult<Option<ContactSubmission>> {
        if self.find(id).await?.is_none() {
            return Ok(None);
        }

        let mut assignments = Vec::new();
        if status.is_some() {
            assignments.push("status = ?");
        }
        if notes.is_some() {
            assignments.push("notes = ?");
        }
        assignments.push("updated_at = ?");
        let sql = format!(
            "UPDATE contact_submissions SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let now = Utc::now();

        on_pool!(self.db.pool(), pool => {
            let mut query = sqlx::query(&sql);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            if let Some(notes) = &notes {
                query = query.bind(notes.as_deref());
            }
            query.bind(now).bind(id).execute(pool).await.map(|_| ())
        })
        .map_err(query_error)?;

        tracing::info!(project = %self.db.project(), id, status = ?status, "Contact submission updated");
        self.find(id).await
    }
}

impl Model for ContactSubmissions {
    fn name(&self) -> &'static str {
        super::CONTACT_SUBMISSION
    }

    fn schema(&self) -> &'static TableSchema {
        &CONTACT_SUBMISSIONS
    }
}
