//! MySQL implementation of the outbox store.
//!
//! Verification records and their delivery tasks live in two tables written in
//! one transaction. Delivery tasks are claimed with `FOR UPDATE SKIP LOCKED`, so
//! several worker processes can drain the same table without overlapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use kg_core::domain::entities::{
    truncate_error, DeliveryStatus, DeliveryTask, OtpPurpose, VerificationRecord, REDACTED_OTP,
};
use kg_core::errors::DomainError;
use kg_core::repositories::{DeliveryQueue, OtpRepository};

const TASK_COLUMNS: &str = "id, aggregate_type, aggregate_id, event_type, payload, status, attempts, created_at, processed_at, last_error";

const RECORD_COLUMNS: &str = "id, purpose, target, code_hash, expires_at, used, created_at";

// Terminal rows keep their payload shape but lose the code.
const REDACT_PAYLOAD: &str =
    "CASE WHEN JSON_VALID(payload) THEN JSON_SET(payload, '$.otp', ?) ELSE payload END";

fn storage_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::Storage {
        message: format!("{}: {}", context, e),
    }
}

fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    row.try_get(name).map_err(|e| DomainError::Storage {
        message: format!("Failed to get {}: {}", name, e),
    })
}

fn parse_uuid(value: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value).map_err(|e| DomainError::Storage {
        message: format!("Invalid UUID {:?}: {}", value, e),
    })
}

/// MySQL implementation of `OtpRepository` and `DeliveryQueue`
#[derive(Clone)]
pub struct MySqlOutboxStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlOutboxStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &MySqlRow) -> Result<DeliveryTask, DomainError> {
        let id: String = column(row, "id")?;
        let aggregate_id: String = column(row, "aggregate_id")?;
        let status: String = column(row, "status")?;

        Ok(DeliveryTask {
            id: parse_uuid(&id)?,
            aggregate_type: column(row, "aggregate_type")?,
            aggregate_id: parse_uuid(&aggregate_id)?,
            event_type: column(row, "event_type")?,
            payload: column(row, "payload")?,
            status: status
                .parse::<DeliveryStatus>()
                .map_err(|message| DomainError::Storage { message })?,
            attempts: column(row, "attempts")?,
            created_at: column::<DateTime<Utc>>(row, "created_at")?,
            terminal_at: column::<Option<DateTime<Utc>>>(row, "processed_at")?,
            last_error: column(row, "last_error")?,
        })
    }

    fn row_to_record(row: &MySqlRow) -> Result<VerificationRecord, DomainError> {
        let id: String = column(row, "id")?;
        let purpose: String = column(row, "purpose")?;

        Ok(VerificationRecord {
            id: parse_uuid(&id)?,
            purpose: purpose
                .parse::<OtpPurpose>()
                .map_err(|message| DomainError::Storage { message })?,
            target: column(row, "target")?,
            code_hash: column(row, "code_hash")?,
            expires_at: column::<DateTime<Utc>>(row, "expires_at")?,
            used: column(row, "used")?,
            created_at: column::<DateTime<Utc>>(row, "created_at")?,
        })
    }

    /// Count tasks in a given status
    pub async fn count_by_status(&self, status: DeliveryStatus) -> Result<i64, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM outbox_tasks WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error("Failed to count outbox tasks"))?;
        column(&row, "total")
    }

    /// Load a single task by id
    pub async fn find_task(&self, id: Uuid) -> Result<Option<DeliveryTask>, DomainError> {
        let query = format!("SELECT {} FROM outbox_tasks WHERE id = ?", TASK_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load outbox task"))?;

        row.as_ref().map(Self::row_to_task).transpose()
    }
}

#[async_trait]
impl DeliveryQueue for MySqlOutboxStore {
    async fn claim_pending(&self, limit: u32) -> Result<Vec<DeliveryTask>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("Failed to open claim transaction"))?;

        let select = format!(
            "SELECT {} FROM outbox_tasks WHERE status = 'PENDING' ORDER BY created_at LIMIT ? FOR UPDATE SKIP LOCKED",
            TASK_COLUMNS
        );
        let rows = sqlx::query(&select)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage_error("Failed to select pending outbox tasks"))?;

        let mut tasks = rows.iter().map(Self::row_to_task).collect::<Result<Vec<_>, _>>()?;

        if !tasks.is_empty() {
            let placeholders = vec!["?"; tasks.len()].join(", ");
            let update = format!(
                "UPDATE outbox_tasks SET status = 'PROCESSING', attempts = attempts + 1 WHERE id IN ({})",
                placeholders
            );
            let mut query = sqlx::query(&update);
            for task in &tasks {
                query = query.bind(task.id.to_string());
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(storage_error("Failed to claim outbox tasks"))?;

            for task in &mut tasks {
                task.mark_processing();
            }
        }

        tx.commit()
            .await
            .map_err(storage_error("Failed to commit outbox claim"))?;

        Ok(tasks)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<bool, DomainError> {
        let query = format!(
            "UPDATE outbox_tasks SET status = 'SENT', processed_at = ?, payload = {} WHERE id = ? AND status = 'PROCESSING'",
            REDACT_PAYLOAD
        );
        let result = sqlx::query(&query)
            .bind(Utc::now())
            .bind(REDACTED_OTP)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to mark outbox task sent"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, DomainError> {
        let query = format!(
            "UPDATE outbox_tasks SET status = 'FAILED', processed_at = ?, last_error = ?, payload = {} WHERE id = ? AND status = 'PROCESSING'",
            REDACT_PAYLOAD
        );
        let result = sqlx::query(&query)
            .bind(Utc::now())
            .bind(truncate_error(error))
            .bind(REDACTED_OTP)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to mark outbox task failed"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn requeue(&self, id: Uuid, error: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE outbox_tasks SET status = 'PENDING', last_error = ? WHERE id = ? AND status = 'PROCESSING'",
        )
        .bind(truncate_error(error))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to requeue outbox task"))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OtpRepository for MySqlOutboxStore {
    async fn save_with_task(&self, record: &VerificationRecord, task: &DeliveryTask) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("Failed to open transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO verification_records (
                id, purpose, target, code_hash, expires_at, used, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.purpose.as_str())
        .bind(&record.target)
        .bind(&record.code_hash)
        .bind(record.expires_at)
        .bind(record.used)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("Failed to insert verification record"))?;

        sqlx::query(
            r#"
            INSERT INTO outbox_tasks (
                id, aggregate_type, aggregate_id, event_type, payload, status, attempts, created_at, processed_at, last_error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.aggregate_type)
        .bind(task.aggregate_id.to_string())
        .bind(&task.event_type)
        .bind(&task.payload)
        .bind(task.status.as_str())
        .bind(task.attempts)
        .bind(task.created_at)
        .bind(task.terminal_at)
        .bind(&task.last_error)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("Failed to insert outbox task"))?;

        tx.commit()
            .await
            .map_err(storage_error("Failed to commit verification record"))
    }

    async fn find_active(&self, reference_id: Uuid, purpose: OtpPurpose) -> Result<Option<VerificationRecord>, DomainError> {
        let query = format!(
            "SELECT {} FROM verification_records WHERE id = ? AND purpose = ? AND used = FALSE LIMIT 1",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(reference_id.to_string())
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to find verification record"))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn mark_used(&self, reference_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE verification_records SET used = TRUE WHERE id = ? AND used = FALSE")
            .bind(reference_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to mark verification record used"))?;

        Ok(result.rows_affected() == 1)
    }
}
