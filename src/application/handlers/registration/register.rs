//! RegisterHandler - Command handler for registering a member for an event.

use std::sync::Arc;

use crate::application::delivery::NotificationDispatcher;
use crate::application::PaymentVerifier;
use crate::domain::foundation::{ErrorCode, EventId, MemberId};
use crate::domain::registration::{NewRegistration, Registration, RegistrationError};
use crate::ports::{
    CapacityController, EventRepository, MemberDirectory, Order, RegistrationRepository,
};

use super::concurrent_modification;

/// Command to register a member for an event.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub event_id: EventId,
    pub member_id: MemberId,
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub struct RegisterResult {
    pub registration: Registration,

    /// Order the member must pay. None for free events.
    pub order: Option<Order>,

    /// True if an existing pending registration was reused.
    pub reused: bool,
}

/// Handler for registration intake.
///
/// Paid events produce a pending registration with a fresh payment order.
/// Free events take a seat and settle immediately, which triggers pass
/// delivery.
pub struct RegisterHandler {
    registrations: Arc<dyn RegistrationRepository>,
    events: Arc<dyn EventRepository>,
    members: Arc<dyn MemberDirectory>,
    capacity: Arc<dyn CapacityController>,
    payments: Arc<PaymentVerifier>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl RegisterHandler {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        events: Arc<dyn EventRepository>,
        members: Arc<dyn MemberDirectory>,
        capacity: Arc<dyn CapacityController>,
        payments: Arc<PaymentVerifier>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            registrations,
            events,
            members,
            capacity,
            payments,
            dispatcher,
        }
    }

    pub async fn handle(&self, cmd: RegisterCommand) -> Result<RegisterResult, RegistrationError> {
        // 1. Resolve event and member
        let event = self
            .events
            .find_by_id(cmd.event_id)
            .await?
            .ok_or_else(|| RegistrationError::event_not_found(cmd.event_id))?;
        if self.members.find_by_id(cmd.member_id).await?.is_none() {
            return Err(RegistrationError::member_not_found(cmd.member_id));
        }

        // 2. Reject duplicates, reuse a pending record
        let existing = self
            .registrations
            .find_live_by_event_member(cmd.event_id, cmd.member_id)
            .await?;
        if let Some(reg) = &existing {
            if reg.payment_status.counts_toward_capacity() {
                return Err(RegistrationError::already_registered(
                    cmd.event_id,
                    cmd.member_id,
                ));
            }
        }

        // 3. Full events take no new intake
        if !self.capacity.has_capacity(cmd.event_id).await? {
            return Err(RegistrationError::capacity_exceeded(cmd.event_id));
        }

        if event.is_free() {
            return self.register_free(cmd, existing).await;
        }

        // 4. Paid event: create an order and park the registration as pending
        let reference = format!("evt{}-mem{}", cmd.event_id, cmd.member_id);
        let order = self
            .payments
            .create_order(event.fee.major_units(), &reference)
            .await?;

        let reused = existing.is_some();
        let registration = match existing {
            Some(mut reg) => {
                reg.reissue_order(order.id.clone(), event.fee)?;
                if !self.registrations.update_if_version(&reg).await? {
                    return Err(concurrent_modification(reg.id, "reissue an order for"));
                }
                reg.mark_committed();
                reg
            }
            None => {
                self.insert(
                    NewRegistration::pending(cmd.event_id, cmd.member_id, event.fee, order.id.clone()),
                    &cmd,
                )
                .await?
            }
        };

        tracing::info!(
            registration_id = %registration.id,
            event_id = %cmd.event_id,
            order_id = %order.id,
            reused,
            "Registration awaiting payment"
        );

        Ok(RegisterResult {
            registration,
            order: Some(order),
            reused,
        })
    }

    async fn register_free(
        &self,
        cmd: RegisterCommand,
        existing: Option<Registration>,
    ) -> Result<RegisterResult, RegistrationError> {
        if !self.capacity.try_reserve(cmd.event_id).await? {
            return Err(RegistrationError::capacity_exceeded(cmd.event_id));
        }

        let reused = existing.is_some();
        let stored = match existing {
            Some(mut reg) => match reg.settle_free() {
                Ok(()) => match self.registrations.update_if_version(&reg).await {
                    Ok(true) => {
                        reg.mark_committed();
                        Ok(reg)
                    }
                    Ok(false) => Err(concurrent_modification(reg.id, "settle")),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e.into()),
            },
            None => self.insert(NewRegistration::free(cmd.event_id, cmd.member_id), &cmd).await,
        };

        let registration = match stored {
            Ok(reg) => reg,
            Err(err) => {
                self.capacity.release(cmd.event_id).await?;
                return Err(err);
            }
        };

        tracing::info!(
            registration_id = %registration.id,
            event_id = %cmd.event_id,
            "Free registration settled"
        );
        self.dispatcher.spawn(registration.id);

        Ok(RegisterResult {
            registration,
            order: None,
            reused,
        })
    }

    async fn insert(
        &self,
        new: NewRegistration,
        cmd: &RegisterCommand,
    ) -> Result<Registration, RegistrationError> {
        self.registrations.insert(new).await.map_err(|e| {
            if e.code == ErrorCode::AlreadyRegistered {
                RegistrationError::already_registered(cmd.event_id, cmd.member_id)
            } else {
                e.into()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::domain::registration::PaymentStatus;

    #[tokio::test]
    async fn paid_event_creates_pending_registration_with_order() {
        let h = Harness::new();
        h.add_event(1, 500.0, Some(10));
        h.add_member(7, "9876543210");

        let result = h.register(1, 7).await.unwrap();
        assert_eq!(result.registration.payment_status, PaymentStatus::Pending);
        assert_eq!(result.registration.amount_due.minor_units(), 50_000);
        let order = result.order.unwrap();
        assert_eq!(result.registration.payment_order_id.as_deref(), Some(order.id.as_str()));
        assert!(!result.reused);
        assert_eq!(h.events.current_attendees(EventId::new(1)), 0);
    }

    #[tokio::test]
    async fn pending_registration_is_reused_with_fresh_order() {
        let h = Harness::new();
        h.add_event(1, 500.0, Some(10));
        h.add_member(7, "9876543210");

        let first = h.register(1, 7).await.unwrap();
        let second = h.register(1, 7).await.unwrap();

        assert!(second.reused);
        assert_eq!(second.registration.id, first.registration.id);
        assert_ne!(
            second.registration.payment_order_id,
            first.registration.payment_order_id
        );
        assert_eq!(second.registration.version, first.registration.version + 1);
    }

    #[tokio::test]
    async fn free_event_settles_and_counts_immediately() {
        let h = Harness::new();
        h.add_event(2, 0.0, Some(5));
        h.add_member(7, "9876543210");

        let result = h.register(2, 7).await.unwrap();
        assert_eq!(result.registration.payment_status, PaymentStatus::Free);
        assert!(result.order.is_none());
        assert_eq!(h.events.current_attendees(EventId::new(2)), 1);
        assert_eq!(h.payment_gateway.orders_created(), 0);
    }

    #[tokio::test]
    async fn settled_member_cannot_register_twice() {
        let h = Harness::new();
        h.add_event(2, 0.0, None);
        h.add_member(7, "9876543210");

        h.register(2, 7).await.unwrap();
        let err = h.register(2, 7).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyRegistered { .. }));
        assert_eq!(h.events.current_attendees(EventId::new(2)), 1);
    }

    #[tokio::test]
    async fn full_event_rejects_intake() {
        let h = Harness::new();
        h.add_event(2, 0.0, Some(1));
        h.add_member(7, "9876543210");
        h.add_member(8, "9876543211");

        h.register(2, 7).await.unwrap();
        let err = h.register(2, 8).await.unwrap_err();
        assert_eq!(err, RegistrationError::capacity_exceeded(EventId::new(2)));
    }

    #[tokio::test]
    async fn unknown_event_or_member_is_not_found() {
        let h = Harness::new();
        h.add_event(1, 500.0, None);
        h.add_member(7, "9876543210");

        assert!(matches!(
            h.register(99, 7).await.unwrap_err(),
            RegistrationError::NotFound { resource: "event", .. }
        ));
        assert!(matches!(
            h.register(1, 99).await.unwrap_err(),
            RegistrationError::NotFound { resource: "member", .. }
        ));
    }
}
