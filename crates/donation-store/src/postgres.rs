use async_trait::async_trait;
use chrono::Utc;
use domain::{Donation, DonationStatus, DonationUpdate};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ConfirmedFilter, DonationFilter, DonationId, Participant, PostId, Result, StoreError, UserId,
    store::DonationStore,
};

const COLUMNS: &str = "id, from_user, to_user, post, amount, status, created_at, updated_at";

/// PostgreSQL-backed donation store.
#[derive(Clone)]
pub struct PostgresDonationStore {
    pool: PgPool,
}

impl PostgresDonationStore {
    /// Creates a new PostgreSQL donation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_donation(row: PgRow) -> Result<Donation> {
        let amount: i64 = row.try_get("amount")?;
        let amount = u64::try_from(amount)
            .map_err(|_| StoreError::Encoding(format!("negative amount {amount}")))?;

        let status: String = row.try_get("status")?;
        let status = DonationStatus::from_name(&status)
            .ok_or_else(|| StoreError::Encoding(format!("unknown status {status:?}")))?;

        let post: Option<String> = row.try_get("post")?;

        Ok(Donation::restore(
            DonationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::new(row.try_get::<String, _>("from_user")?),
            UserId::new(row.try_get::<String, _>("to_user")?),
            post.and_then(PostId::non_empty),
            amount,
            status,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }

    /// Builds the WHERE clause for a confirmed-only filter.
    ///
    /// Returns the SQL fragment and the values to bind, in placeholder order.
    /// The status predicate is always the first placeholder.
    fn confirmed_clause(filter: &ConfirmedFilter) -> (String, Vec<String>) {
        let fields: &DonationFilter = filter.fields();
        let mut sql = String::from("status = $1");
        let mut binds = vec![ConfirmedFilter::STATUS.as_str().to_string()];

        if let Some(ref user) = fields.recipient {
            binds.push(user.as_str().to_string());
            sql.push_str(&format!(" AND to_user = ${}", binds.len()));
        }
        if let Some(ref user) = fields.donor {
            binds.push(user.as_str().to_string());
            sql.push_str(&format!(" AND from_user = ${}", binds.len()));
        }
        if let Some(ref post) = fields.post {
            binds.push(post.as_str().to_string());
            sql.push_str(&format!(" AND post = ${}", binds.len()));
        }

        (sql, binds)
    }

    /// Returns the column holding `field`.
    fn participant_column(field: Participant) -> &'static str {
        match field {
            Participant::From => "from_user",
            Participant::To => "to_user",
        }
    }
}

#[async_trait]
impl DonationStore for PostgresDonationStore {
    async fn create(&self, donation: &Donation) -> Result<()> {
        let amount = i64::try_from(donation.amount())
            .map_err(|_| StoreError::Encoding(format!("amount {} too large", donation.amount())))?;

        sqlx::query(
            r#"
            INSERT INTO donations (id, from_user, to_user, post, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(donation.id().as_uuid())
        .bind(donation.from().as_str())
        .bind(donation.to().as_str())
        .bind(donation.post().map(PostId::as_str))
        .bind(amount)
        .bind(donation.status().as_str())
        .bind(donation.created_at())
        .bind(donation.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(donation.id());
            }
            StoreError::Database(e)
        })?;

        tracing::debug!(donation_id = %donation.id(), "donation inserted");
        Ok(())
    }

    async fn get_by_recipient(&self, user: &UserId) -> Result<Vec<Donation>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM donations WHERE to_user = $1 ORDER BY id ASC"
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_donation).collect()
    }

    async fn get_by_ids(&self, ids: &[DonationId]) -> Result<Vec<Donation>> {
        let ids: Vec<Uuid> = ids.iter().map(DonationId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM donations WHERE id = ANY($1) ORDER BY id ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_donation).collect()
    }

    async fn count_confirmed(&self, user: &UserId) -> Result<u64> {
        let filter = DonationFilter::for_recipient(user.clone()).confirmed();
        let (clause, binds) = Self::confirmed_clause(&filter);
        let sql = format!("SELECT COUNT(*) FROM donations WHERE {clause}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let count = query.fetch_one(&self.pool).await?;

        Ok(count.max(0) as u64)
    }

    async fn distinct_donors(
        &self,
        field: Participant,
        filter: DonationFilter,
    ) -> Result<Vec<UserId>> {
        let filter = filter.confirmed();
        let (clause, binds) = Self::confirmed_clause(&filter);
        let column = Self::participant_column(field);
        let sql =
            format!("SELECT DISTINCT {column} FROM donations WHERE {clause} ORDER BY {column} ASC");

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let users = query.fetch_all(&self.pool).await?;

        Ok(users.into_iter().map(UserId::new).collect())
    }

    async fn sum_confirmed_amount(&self, user: &UserId) -> Result<u64> {
        let filter = DonationFilter::for_recipient(user.clone()).confirmed();
        let (clause, binds) = Self::confirmed_clause(&filter);
        let sql = format!("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM donations WHERE {clause}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let sum = query.fetch_one(&self.pool).await?;

        u64::try_from(sum).map_err(|_| StoreError::Encoding(format!("negative sum {sum}")))
    }

    async fn update_and_return(
        &self,
        id: DonationId,
        update: DonationUpdate,
    ) -> Result<Donation> {
        let DonationUpdate::Status(next) = update;
        let allowed_from: Vec<String> = DonationStatus::predecessors(next)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE donations
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = ANY($4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(next.as_str())
        .bind(Utc::now())
        .bind(allowed_from)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_donation(row);
        }

        // Nothing updated: either the donation is missing or the edge is illegal.
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM donations WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Err(StoreError::NotFound(id)),
            Some(status) => {
                let from = DonationStatus::from_name(&status)
                    .ok_or_else(|| StoreError::Encoding(format!("unknown status {status:?}")))?;
                Err(StoreError::InvalidTransition { id, from, to: next })
            }
        }
    }
}
