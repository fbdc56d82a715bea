//! In-memory payment gateway.
//!
//! Issues sequential order and refund ids and records every successful
//! call. Failures can be injected per operation.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    CreateOrderRequest, Order, PaymentError, PaymentGateway, Refund, RefundRequest,
};

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    refunds: Vec<(RefundRequest, Refund)>,
    order_failures: VecDeque<PaymentError>,
    refund_failures: VecDeque<PaymentError>,
}

/// Payment gateway fake for tests and local runs.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
#[derive(Default)]
pub struct InMemoryPaymentGateway {
    state: Mutex<State>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .expect("InMemoryPaymentGateway: state lock poisoned")
    }

    /// Makes the next `create_order` call fail with `error`.
    pub fn fail_next_order(&self, error: PaymentError) {
        self.state().order_failures.push_back(error);
    }

    /// Makes the next `refund` call fail with `error`.
    pub fn fail_next_refund(&self, error: PaymentError) {
        self.state().refund_failures.push_back(error);
    }

    pub fn orders_created(&self) -> usize {
        self.state().orders.len()
    }

    pub fn refunds_issued(&self) -> usize {
        self.state().refunds.len()
    }

    /// Successful refund requests, oldest first.
    pub fn refund_requests(&self) -> Vec<RefundRequest> {
        self.state().refunds.iter().map(|(req, _)| req.clone()).collect()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.order_failures.pop_front() {
            return Err(err);
        }
        let order = Order {
            id: format!("order_{:06}", state.orders.len() + 1),
            amount: request.amount,
            currency: request.currency,
            status: "created".to_string(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.refund_failures.pop_front() {
            return Err(err);
        }
        let refund = Refund {
            id: format!("rfnd_{:06}", state.refunds.len() + 1),
            amount: request.amount,
            status: "processed".to_string(),
        };
        state.refunds.push((request, refund.clone()));
        Ok(refund)
    }
}
