//! `newsletter_subscriptions` table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::errors::AppResult;
use common::models::NewsletterSubscription;
use common::response::Pagination;

use super::Model;
use crate::database::{on_pool, query_error, Database, DbPool};
use crate::schema::{Column, ColumnKind, DefaultValue, Index, TableSchema};

pub static NEWSLETTER_SUBSCRIPTIONS: TableSchema = TableSchema {
    name: "newsletter_subscriptions",
    columns: &[
        Column::id(),
        Column::required("email", ColumnKind::Varchar(255)),
        Column::optional("name", ColumnKind::Varchar(100)),
        Column::optional("source", ColumnKind::Varchar(50)),
        Column::required("is_active", ColumnKind::Bool).with_default(DefaultValue::Bool(true)),
        Column::optional("unsubscribed_at", ColumnKind::Timestamp),
        Column::optional("ip_address", ColumnKind::Varchar(45)),
        Column::required("created_at", ColumnKind::Timestamp),
        Column::required("updated_at", ColumnKind::Timestamp),
    ],
    indexes: &[Index::unique(&["email"]), Index::on(&["is_active"])],
};

const SELECT_COLUMNS: &str =
    "id, email, name, source, is_active, unsubscribed_at, ip_address, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    email: String,
    name: Option<String>,
    source: Option<String>,
    is_active: bool,
    unsubscribed_at: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for NewsletterSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            source: row.source,
            is_active: row.is_active,
            unsubscribed_at: row.unsubscribed_at,
            ip_address: row.ip_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields of a subscription about to be stored.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub ip_address: Option<String>,
}

macro_rules! insert_subscription {
    ($new:expr, $now:expr) => {
        sqlx::query(
            "INSERT INTO newsletter_subscriptions \
             (email, name, source, is_active, ip_address, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&$new.email)
        .bind(&$new.name)
        .bind(&$new.source)
        .bind(true)
        .bind(&$new.ip_address)
        .bind($now)
        .bind($now)
    };
}

/// Newsletter subscriptions of one project.
pub struct NewsletterSubscriptions {
    db: Arc<Database>,
}

impl NewsletterSubscriptions {
    pub fn new(db: &Arc<Database>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<NewsletterSubscription>> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscriptions WHERE email = ?",
            SELECT_COLUMNS
        );
        let row = on_pool!(self.db.pool(), pool => {
            sqlx::query_as::<_, SubscriptionRow>(&sql)
                .bind(email)
                .fetch_optional(pool)
                .await
        })
        .map_err(query_error)?;
        Ok(row.map(NewsletterSubscription::from))
    }

    pub async fn create(&self, new: NewSubscription) -> AppResult<NewsletterSubscription> {
        let now = Utc::now();
        let id = match self.db.pool() {
            DbPool::Sqlite(pool) => insert_subscription!(new, now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_rowid()),
            DbPool::MySql(pool) => insert_subscription!(new, now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .map_err(query_error)?;

        tracing::debug!(project = %self.db.project(), id, "Newsletter subscription stored");
        Ok(NewsletterSubscription {
            id,
            email: new.email,
            name: new.name,
            source: new.source,
            is_active: true,
            unsubscribed_at: None,
            ip_address: new.ip_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks an unsubscribed entry active again.
    pub async fn reactivate(&self, id: i64) -> AppResult<()> {
        let now = Utc::now();
        on_pool!(self.db.pool(), pool => {
            sqlx::query(
                "UPDATE newsletter_subscriptions \
                 SET is_active = ?, unsubscribed_at = NULL, updated_at = ? WHERE id = ?",
            )
            .bind(true)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .map_err(query_error)?;
        tracing::info!(project = %self.db.project(), id, "Newsletter subscription reactivated");
        Ok(())
    }

    /// Newest first, optionally filtered by the active flag.
    pub async fn list(
        &self,
        active: Option<bool>,
        page: u32,
        limit: u32,
    ) -> AppResult<(Vec<NewsletterSubscription>, u64)> {
        let filter = if active.is_some() { " WHERE is_active = ?" } else { "" };
        let count_sql = format!("SELECT COUNT(*) FROM newsletter_subscriptions{}", filter);
        let list_sql = format!(
            "SELECT {} FROM newsletter_subscriptions{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, filter
        );
        let offset = Pagination::offset(page, limit) as i64;

        let total = on_pool!(self.db.pool(), pool => {
            let mut query = sqlx::query_scalar::<_, i64>(&count_sql);
            if let Some(active) = active {
                query = query.bind(active);
            }
            query.fetch_one(pool).await
        })
        .map_err(query_error)?;

        let rows = on_pool!(self.db.pool(), pool => {
            let mut query = sqlx::query_as::<_, SubscriptionRow>(&list_sql);
            if let Some(active) = active {
                query = query.bind(active);
            }
            query.bind(i64::from(limit)).bind(offset).fetch_all(pool).await
        })
        .map_err(query_error)?;

        Ok((
            rows.into_iter().map(NewsletterSubscription::from).collect(),
            total.max(0) as u64,
        ))
    }

    #[cfg(test)]
    pub(crate) async fn unsubscribe(&self, id: i64) -> AppResult<()> {
        let now = Utc::now();
        on_pool!(self.db.pool(), pool => {
            sqlx::query(
                "UPDATE newsletter_subscriptions \
                 SET is_active = ?, unsubscribed_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(false)
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .map_err(query_error)
    }
}

impl Model for NewsletterSubscriptions {
    fn name(&self) -> &'static str {
        super::NEWSLETTER_SUBSCRIPTION
    }

    fn schema(&self) -> &'static TableSchema {
        &NEWSLETTER_SUBSCRIPTIONS
    }
}
