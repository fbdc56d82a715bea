//! PostgreSQL implementation of RegistrationRepository.
//!
//! Every lifecycle write is a single `UPDATE ... WHERE id = $1 AND version = $n`.
//! Lifecycle writes never touch the delivery columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, MemberId, Money, RegistrationId, Timestamp,
};
use crate::domain::registration::{
    AttendanceStatus, DeliveryLock, DeliveryState, NewRegistration, PaymentStatus, Registration,
};
use crate::ports::RegistrationRepository;

/// Column list shared by every registration SELECT.
const REGISTRATION_COLUMNS: &str = r#"
    id, event_id, member_id, status, payment_status,
    amount_due_minor, amount_paid_minor, payment_order_id, payment_id,
    refund_id, amount_refunded_minor, registered_at, attended_at, cancelled_at,
    delivery_sent_at, delivery_lock_owner, delivery_locked_at, version
"#;

/// PostgreSQL implementation of the RegistrationRepository port.
pub struct PostgresRegistrationRepository {
    pool: PgPool,
}

impl PostgresRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a registration.
#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: i64,
    event_id: i64,
    member_id: Option<i64>,
    status: String,
    payment_status: String,
    amount_due_minor: i64,
    amount_paid_minor: Option<i64>,
    payment_order_id: Option<String>,
    payment_id: Option<String>,
    refund_id: Option<String>,
    amount_refunded_minor: Option<i64>,
    registered_at: DateTime<Utc>,
    attended_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    delivery_sent_at: Option<DateTime<Utc>>,
    delivery_lock_owner: Option<String>,
    delivery_locked_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = DomainError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let status: AttendanceStatus = row.status.parse().map_err(|_| {
            DomainError::database(format!("Invalid status value: {}", row.status))
        })?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(|_| {
            DomainError::database(format!("Invalid payment_status value: {}", row.payment_status))
        })?;

        let lock = match (row.delivery_lock_owner, row.delivery_locked_at) {
            (Some(owner), Some(acquired_at)) => Some(DeliveryLock {
                owner,
                acquired_at: Timestamp::from_datetime(acquired_at),
            }),
            _ => None,
        };

        Ok(Registration {
            id: RegistrationId::new(row.id),
            event_id: EventId::new(row.event_id),
            member_id: row.member_id.map(MemberId::new),
            status,
            payment_status,
            amount_due: money(row.amount_due_minor)?,
            amount_paid: row.amount_paid_minor.map(money).transpose()?,
            payment_order_id: row.payment_order_id,
            payment_id: row.payment_id,
            refund_id: row.refund_id,
            amount_refunded: row.amount_refunded_minor.map(money).transpose()?,
            registered_at: Timestamp::from_datetime(row.registered_at),
            attended_at: row.attended_at.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            delivery: DeliveryState {
                sent_at: row.delivery_sent_at.map(Timestamp::from_datetime),
                lock,
            },
            version: row.version,
        })
    }
}

fn money(minor: i64) -> Result<Money, DomainError> {
    Money::from_minor(minor)
        .map_err(|e| DomainError::database(format!("Invalid stored amount: {}", e)))
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

fn select_where(filter: &str) -> String {
    format!("SELECT {} FROM registrations WHERE {}", REGISTRATION_COLUMNS, filter)
}

#[async_trait]
impl RegistrationRepository for PostgresRegistrationRepository {
    async fn find_by_id(&self, id: RegistrationId) -> Result<Option<Registration>, DomainError> {
        let sql = select_where("id = $1");
        let row: Option<RegistrationRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find registration", e))?;

        row.map(Registration::try_from).transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Registration>, DomainError> {
        let sql = select_where("payment_order_id = $1");
        let row: Option<RegistrationRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find registration by order", e))?;

        row.map(Registration::try_from).transpose()
    }

    async fn find_live_by_event_member(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> Result<Option<Registration>, DomainError> {
        let sql = select_where("event_id = $1 AND member_id = $2 AND status <> 'cancelled'");
        let row: Option<RegistrationRow> = sqlx::query_as(&sql)
            .bind(event_id.value())
            .bind(member_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find live registration", e))?;

        row.map(Registration::try_from).transpose()
    }

    async fn insert(&self, registration: NewRegistration) -> Result<Registration, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO registrations (
                event_id, member_id, status, payment_status, amount_due_minor,
                payment_order_id, registered_at, version
            ) VALUES ($1, $2, 'registered', $3, $4, $5, $6, 1)
            RETURNING id
            "#,
        )
        .bind(registration.event_id.value())
        .bind(registration.member_id.value())
        .bind(registration.payment_status.as_str())
        .bind(registration.amount_due.minor_units())
        .bind(&registration.payment_order_id)
        .bind(registration.registered_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("registrations_live_event_member_key") {
                    return DomainError::new(
                        ErrorCode::AlreadyRegistered,
                        "A live registration already exists for this event and member",
                    );
                }
            }
            db_error("insert registration", e)
        })?;

        Ok(registration.into_registration(RegistrationId::new(id)))
    }

    async fn update_if_version(&self, registration: &Registration) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations SET
                member_id = $3,
                status = $4,
                payment_status = $5,
                amount_due_minor = $6,
                amount_paid_minor = $7,
                payment_order_id = $8,
                payment_id = $9,
                refund_id = $10,
                amount_refunded_minor = $11,
                attended_at = $12,
                cancelled_at = $13,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(registration.id.value())
        .bind(registration.version)
        .bind(registration.member_id.map(|m| m.value()))
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(registration.amount_due.minor_units())
        .bind(registration.amount_paid.map(|m| m.minor_units()))
        .bind(&registration.payment_order_id)
        .bind(&registration.payment_id)
        .bind(&registration.refund_id)
        .bind(registration.amount_refunded.map(|m| m.minor_units()))
        .bind(registration.attended_at.map(|t| *t.as_datetime()))
        .bind(registration.cancelled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("registrations_payment_order_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "Payment order already belongs to another registration",
                    )
                    .with_detail("field", "payment_order_id");
                }
            }
            db_error("update registration", e)
        })?;

        Ok(result.rows_affected() == 1)
    }
}
