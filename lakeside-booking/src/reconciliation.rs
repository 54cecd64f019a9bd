use chrono::Utc;
use lakeside_core::events::BookingEventSink;
use lakeside_core::{
    Booking, BookingStatus, BookingWrite, GatewayOutcome, HoldPolicy, HotelRepository, Payment, PaymentMethod, PaymentStatus,
    PaymentWrite, StoreError, ValidationRule,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::events;
use crate::manager::{Requester, MAX_WRITE_ATTEMPTS};
use crate::status::{accepts_payments, next_status, BookingEvent, InvalidTransition};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordPayment {
    pub amount: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payer_phone: Option<String>,
}

/// Reply to the gateway. `accepted == false` asks it to redeliver.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallbackAck {
    pub accepted: bool,
    pub payment_id: Option<Uuid>,
}

impl CallbackAck {
    fn accepted(payment_id: Option<Uuid>) -> Self {
        Self { accepted: true, payment_id }
    }
}

// ============================================================================
// Payment Reconciler
// ============================================================================

/// Applies money movements to bookings.
pub struct PaymentReconciler {
    repo: Arc<dyn HotelRepository>,
    events: Arc<dyn BookingEventSink>,
    policy: HoldPolicy,
}

impl PaymentReconciler {
    pub fn new(repo: Arc<dyn HotelRepository>, events: Arc<dyn BookingEventSink>, policy: HoldPolicy) -> Self {
        Self { repo, events, policy }
    }

    /// Guests may only start a mobile money push; anything settled on the
    /// spot (cash, card, transfer, manual receipt) is recorded by staff.
    pub async fn record_payment(
        &self,
        booking_id: Uuid,
        request: RecordPayment,
        requester: &Requester,
    ) -> Result<Payment, BookingError> {
        let reference = request.reference.filter(|r| !r.trim().is_empty());
        let is_push = request.method == PaymentMethod::MobileMoney && reference.is_some();
        if !is_push && !requester.is_staff() {
            return Err(BookingError::StaffOnly("record a manual payment"));
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut booking = self.load(booking_id).await?;
            if !accepts_payments(booking.status) {
                return Err(InvalidTransition { from: booking.status, event: BookingEvent::FullyPaid }.into());
            }

            // 1. Amount must fit the open balance
            let remaining = booking.remaining_balance();
            if request.amount <= 0 || request.amount > remaining {
                return Err(BookingError::Overpayment { remaining, attempted: request.amount });
            }

            // 2. Pushes wait for the gateway callback
            if is_push {
                let mut pending = Payment::new(booking_id, request.amount, request.method, PaymentStatus::Pending)
                    .with_reference(reference.clone());
                pending.payer_phone = request.payer_phone.clone();
                let pending = self.repo.insert_payment(pending).await?;
                tracing::info!(
                    booking_number = %booking.booking_number,
                    amount = request.amount,
                    reference = ?pending.reference,
                    "Mobile money push initiated"
                );
                return Ok(pending);
            }

            // 3. Settled on the spot; credit and store in one write
            let mut payment = Payment::new(booking_id, request.amount, request.method, PaymentStatus::Completed)
                .with_reference(reference.clone());
            payment.payer_phone = request.payer_phone.clone();

            let from = booking.status;
            credit(&mut booking, request.amount)?;
            booking.payment_method = Some(request.method);

            let write = BookingWrite {
                booking,
                replace_rooms: false,
                payment: Some(PaymentWrite::Insert(payment.clone())),
            };
            match write_promotion(self.repo.as_ref(), write, from, self.policy).await {
                Ok(updated) => {
                    self.announce(&updated, &payment, from).await;
                    return Ok(payment);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(%booking_id, attempt, "Booking changed while recording payment, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict { room_id: None })
    }

    /// Settle an initiated push from the gateway's asynchronous result.
    ///
    /// Never fails: anomalies are logged and acknowledged; infrastructure
    /// failures answer `accepted: false` so the gateway redelivers.
    pub async fn apply_gateway_callback(&self, reference: &str, outcome: GatewayOutcome) -> CallbackAck {
        match self.settle(reference, outcome).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::error!(reference, error = %e, "Failed to apply gateway callback");
                CallbackAck { accepted: false, payment_id: None }
            }
        }
    }

    async fn settle(&self, reference: &str, outcome: GatewayOutcome) -> Result<CallbackAck, BookingError> {
        let Some(payment) = self.repo.find_payment_by_reference(reference).await? else {
            tracing::warn!(reference, "Gateway callback for unknown payment reference");
            return Ok(CallbackAck::accepted(None));
        };
        if payment.status != PaymentStatus::Pending {
            tracing::info!(reference, status = %payment.status, "Duplicate gateway callback ignored");
            return Ok(CallbackAck::accepted(Some(payment.id)));
        }

        match outcome {
            GatewayOutcome::Failure { reason } => {
                let mut failed = payment.clone();
                failed.status = PaymentStatus::Failed;
                failed.updated_at = Utc::now();
                if self.repo.transition_payment(failed, PaymentStatus::Pending).await? {
                    tracing::warn!(reference, %reason, "Mobile money payment failed");
                }
                Ok(CallbackAck::accepted(Some(payment.id)))
            }
            GatewayOutcome::Success { amount, receipt } => {
                let collected = amount.unwrap_or(payment.amount);
                for attempt in 1..=MAX_WRITE_ATTEMPTS {
                    let mut booking = self.load(payment.booking_id).await?;
                    let credited = collected.min(booking.remaining_balance()).max(0);

                    let mut settled = payment.clone();
                    settled.amount = collected;
                    settled.credited_amount = credited;
                    settled.gateway_receipt = receipt.clone();
                    settled.updated_at = Utc::now();
                    settled.status = if credited < collected {
                        tracing::warn!(
                            reference,
                            collected,
                            credited,
                            booking_number = %booking.booking_number,
                            "Gateway collected more than the balance; crediting the remainder only"
                        );
                        PaymentStatus::Partial
                    } else {
                        PaymentStatus::Completed
                    };

                    let from = booking.status;
                    if accepts_payments(from) {
                        credit(&mut booking, credited)?;
                    } else {
                        tracing::warn!(
                            reference,
                            booking_number = %booking.booking_number,
                            status = %from,
                            "Payment settled for a closed booking; refund required"
                        );
                        booking.paid_amount += credited;
                    }

                    let write = BookingWrite {
                        booking,
                        replace_rooms: false,
                        payment: Some(PaymentWrite::Transition {
                            payment: settled.clone(),
                            expected_status: PaymentStatus::Pending,
                        }),
                    };
                    match write_promotion(self.repo.as_ref(), write, from, self.policy).await {
                        Ok(updated) => {
                            self.announce(&updated, &settled, from).await;
                            return Ok(CallbackAck::accepted(Some(payment.id)));
                        }
                        Err(StoreError::PaymentStateChanged { .. }) => {
                            tracing::info!(reference, "Payment settled by a concurrent callback");
                            return Ok(CallbackAck::accepted(Some(payment.id)));
                        }
                        Err(StoreError::VersionConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                            tracing::debug!(reference, attempt, "Booking changed while settling, re-reading");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(BookingError::Conflict { room_id: None })
            }
        }
    }

    /// Staff refund of a settled payment. The booking status stays put.
    pub async fn refund_payment(&self, payment_id: Uuid) -> Result<Payment, BookingError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let payment = self
                .repo
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| BookingError::payment_not_found(payment_id))?;
            if !payment.status.is_credited() {
                return Err(ValidationRule::NotRefundable(payment_id).into());
            }

            let mut booking = self.load(payment.booking_id).await?;
            booking.paid_amount = (booking.paid_amount - payment.credited_amount).max(0);

            let mut refunded = payment.clone();
            refunded.status = PaymentStatus::Refunded;
            refunded.updated_at = Utc::now();

            let write = BookingWrite {
                booking,
                replace_rooms: false,
                payment: Some(PaymentWrite::Transition { payment: refunded.clone(), expected_status: payment.status }),
            };
            match self.repo.update_booking(write, self.policy).await {
                Ok(updated) => {
                    tracing::info!(
                        booking_number = %updated.booking_number,
                        %payment_id,
                        amount = payment.credited_amount,
                        paid = updated.paid_amount,
                        "Payment refunded"
                    );
                    return Ok(refunded);
                }
                Err(StoreError::VersionConflict { .. } | StoreError::PaymentStateChanged { .. })
                    if attempt < MAX_WRITE_ATTEMPTS =>
                {
                    tracing::debug!(%payment_id, attempt, "Refund raced another write, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict { room_id: None })
    }

    pub async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, BookingError> {
        self.load(booking_id).await?;
        Ok(self.repo.list_payments(booking_id).await?)
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))
    }

    async fn announce(&self, booking: &Booking, payment: &Payment, from: BookingStatus) {
        tracing::info!(
            booking_number = %booking.booking_number,
            amount = payment.credited_amount,
            paid = booking.paid_amount,
            total = booking.total_amount,
            status = %booking.status,
            "Payment applied"
        );
        events::publish(self.events.as_ref(), events::payment_completed(booking, payment)).await;
        if booking.status != from {
            events::publish(self.events.as_ref(), events::status_changed(booking, from)).await;
        }
    }
}

// ============================================================================
// Booking Writes
// ============================================================================

/// Store a write that may promote the booking.
///
/// Under `HoldPolicy::ConfirmedOnly` a PENDING booking can share rooms with
/// another one that got confirmed first. The promoted write then clashes;
/// it is stored again without the promotion so collected money is never
/// lost, and the booking is left for staff to resolve.
pub(crate) async fn write_promotion(
    repo: &dyn HotelRepository,
    write: BookingWrite,
    from: BookingStatus,
    policy: HoldPolicy,
) -> Result<Booking, StoreError> {
    if write.booking.status == from {
        return repo.update_booking(write, policy).await;
    }
    let mut unpromoted = write.clone();
    unpromoted.booking.status = from;

    match repo.update_booking(write, policy).await {
        Err(StoreError::RoomConflict { room_id }) => {
            tracing::warn!(
                booking_number = %unpromoted.booking.booking_number,
                %room_id,
                status = %from,
                paid = unpromoted.booking.paid_amount,
                "Room already held by another booking; left unconfirmed for staff"
            );
            repo.update_booking(unpromoted, policy).await
        }
        other => other,
    }
}

/// Add money to an open booking and promote it once fully paid.
fn credit(booking: &mut Booking, amount: i64) -> Result<(), BookingError> {
    booking.paid_amount += amount;
    if booking.is_fully_paid() {
        booking.status = next_status(booking.status, BookingEvent::FullyPaid)?;
    }
    Ok(())
}
