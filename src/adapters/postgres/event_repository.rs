//! PostgreSQL events, attendee counter and member directory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{BusinessType, DomainError, ErrorCode, EventId, MemberId, Money};
use crate::domain::registration::{Event, Member};
use crate::ports::{CapacityController, EventRepository, MemberDirectory};

fn event_not_found(event_id: EventId) -> DomainError {
    DomainError::new(ErrorCode::EventNotFound, format!("Event {} not found", event_id))
        .with_detail("id", event_id.to_string())
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

/// Events table access. Counter changes are single conditional UPDATEs so
/// concurrent reservations serialize on the row.
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, event_id: EventId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("check event", e))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    name: String,
    fee_minor: i64,
    max_attendees: Option<i32>,
    current_attendees: i32,
}

impl TryFrom<EventRow> for Event {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let fee = Money::from_minor(row.fee_minor)
            .map_err(|e| DomainError::database(format!("Invalid event fee: {}", e)))?;
        Ok(Event {
            id: EventId::new(row.id),
            name: row.name,
            fee,
            max_attendees: row.max_attendees,
            current_attendees: row.current_attendees,
        })
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, DomainError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, fee_minor, max_attendees, current_attendees
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find event", e))?;

        row.map(Event::try_from).transpose()
    }
}

#[async_trait]
impl CapacityController for PostgresEventRepository {
    async fn try_reserve(&self, event_id: EventId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET current_attendees = current_attendees + 1
            WHERE id = $1
              AND (max_attendees IS NULL OR current_attendees < max_attendees)
            "#,
        )
        .bind(event_id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("reserve seat", e))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        if !self.exists(event_id).await? {
            return Err(event_not_found(event_id));
        }
        Ok(false)
    }

    async fn release(&self, event_id: EventId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET current_attendees = GREATEST(current_attendees - 1, 0)
            WHERE id = $1
            "#,
        )
        .bind(event_id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("release seat", e))?;

        if result.rows_affected() == 0 {
            tracing::warn!(event_id = %event_id, "Seat release for unknown event ignored");
        }
        Ok(())
    }

    async fn has_capacity(&self, event_id: EventId) -> Result<bool, DomainError> {
        let open: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT (max_attendees IS NULL OR current_attendees < max_attendees)
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("check capacity", e))?;

        open.ok_or_else(|| event_not_found(event_id))
    }
}

/// Members table access.
pub struct PostgresMemberDirectory {
    pool: PgPool,
}

impl PostgresMemberDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: i64,
    name: String,
    phone: String,
    business_type: Option<String>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        // Free-text categories that match nothing are shown without one.
        let business_type = row
            .business_type
            .as_deref()
            .and_then(|raw| raw.parse::<BusinessType>().ok());
        Member {
            id: MemberId::new(row.id),
            name: row.name,
            phone: row.phone,
            business_type,
        }
    }
}

#[async_trait]
impl MemberDirectory for PostgresMemberDirectory {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        let row: Option<MemberRow> = sqlx::query_as(
            "SELECT id, name, phone, business_type FROM members WHERE id = $1",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find member", e))?;

        Ok(row.map(Member::from))
    }
}
