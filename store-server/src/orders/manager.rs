//! Order orchestrator
//!
//! Owns the order lifecycle end to end: checkout, payment events,
//! label creation, shipping events, retry, tracking. All mutations of
//! one order run under a per-order lock, so concurrent webhooks for
//! the same order serialize; different orders proceed in parallel.
//!
//! Transition rules:
//! - duplicates of an already-applied terminal event are no-ops
//! - regressions (an event ranked at or below the current state) are
//!   rejected as [`OrderError::StateConflict`] without mutating state
//! - side effects (label creation, notifications) run after the
//!   triggering transition is persisted and never roll it back

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use shared::models::order::{
    Buyer, LineItem, Order, OrderStatus, PaymentMethod, PaymentRecord, PaymentStatus,
    ShippingAddress, ShippingLabel, ShippingQuote, ShippingStatus, generate_order_id,
};
use shared::models::rate::RateQuote;
use shared::webhook::PaymentWebhook;
use shared::{Notification, money};
use tokio::sync::Mutex;

use crate::address::{AddressError, AddressLookup};
use crate::notify::NotificationStore;
use crate::orders::store::OrderStore;
use crate::orders::{OrderError, ShippingEvent};
use crate::payment::{CardInstrument, PaymentGateway};
use crate::rates::{RateError, RateEstimator};
use crate::shipping::{ShippingGateway, TrackingInfo};
use crate::utils::validation::normalize_postal_code;

/// Checkout request after transport-level validation
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub buyer: Buyer,
    pub items: Vec<LineItem>,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Preferred shipping service; None picks the cheapest quote
    pub shipping_service_id: Option<String>,
    pub card: Option<CardInstrument>,
}

/// Result of a checkout attempt
///
/// A declined or failed charge is still a successful checkout call:
/// the order exists in `payment_failed` and `payment_error` says why.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub redirect_url: Option<String>,
}

/// Shipping progress rank, mirroring [`OrderStatus::rank`]
///
/// `Failed` ranks at zero so a retry or a late `created` event can
/// move forward again; `Cancelled` and `Delivered` are terminal.
fn ship_rank(status: ShippingStatus) -> u8 {
    match status {
        ShippingStatus::Pending | ShippingStatus::Failed => 0,
        ShippingStatus::Created => 1,
        ShippingStatus::Paid => 2,
        ShippingStatus::Generated => 3,
        ShippingStatus::Dispatched => 4,
        ShippingStatus::Delivered | ShippingStatus::Cancelled => 5,
    }
}

pub struct OrderManager {
    store: Arc<dyn OrderStore>,
    notifications: Arc<dyn NotificationStore>,
    payment: Arc<dyn PaymentGateway>,
    shipping: Arc<dyn ShippingGateway>,
    rates: Arc<RateEstimator>,
    address: Arc<dyn AddressLookup>,
    default_item_weight_kg: f64,
    /// Per-order mutation locks; entries are dropped once the order
    /// reaches a terminal status
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifications: Arc<dyn NotificationStore>,
        payment: Arc<dyn PaymentGateway>,
        shipping: Arc<dyn ShippingGateway>,
        rates: Arc<RateEstimator>,
        address: Arc<dyn AddressLookup>,
        default_item_weight_kg: f64,
    ) -> Self {
        Self {
            store,
            notifications,
            payment,
            shipping,
            rates,
            address,
            default_item_weight_kg,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry for orders that can no longer transition
    ///
    /// Terminal orders reject every further mutation up front, so a
    /// fresh entry recreated by a late duplicate event is harmless and
    /// gets released again on its way out.
    fn release_lock_if_terminal(&self, order: &Order) {
        if order.status.is_terminal() {
            self.locks.remove(&order.id);
        }
    }

    /// Create an order from a validated cart and attempt the charge
    ///
    /// Validation failures leave no trace. Once the order is persisted
    /// in `pending_payment`, a charge failure transitions it to
    /// `payment_failed` and still returns `Ok` - the caller reports the
    /// outcome, not an error.
    pub async fn create_order(&self, input: CheckoutInput) -> Result<CheckoutOutcome, OrderError> {
        let mut address = input.address;
        validate_cart(&input.items)?;
        address.postal_code = normalize_postal_code(&address.postal_code)
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        self.enrich_address(&mut address).await?;

        let subtotal =
            money::line_subtotal(input.items.iter().map(|i| (i.unit_price, i.quantity)));
        let weight: f64 = input
            .items
            .iter()
            .map(|i| i.weight_kg.unwrap_or(self.default_item_weight_kg) * i.quantity as f64)
            .sum();

        let quotes = self
            .rates
            .quote(&address.postal_code, weight, subtotal)
            .await
            .map_err(|e| match e {
                RateError::Validation(msg) => OrderError::Validation(msg),
            })?;
        let shipping = pick_quote(quotes, input.shipping_service_id.as_deref())?;

        let surcharge = input
            .payment_method
            .surcharge(money::order_total(subtotal, shipping.price, 0.0));
        let total = money::order_total(subtotal, shipping.price, surcharge);

        let now = Utc::now();
        let mut order = Order {
            id: generate_order_id(),
            buyer: input.buyer,
            items: input.items,
            subtotal,
            shipping,
            surcharge,
            total,
            shipping_address: address,
            payment_method: input.payment_method,
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            shipping_status: ShippingStatus::Pending,
            payment: None,
            payment_error: None,
            label: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(order.clone()).await?;
        tracing::info!(order_id = %order.id, total = order.total, "Order created");

        let _guard = self.lock_for(&order.id);
        let _held = _guard.lock().await;

        match self.payment.create_charge(&order, input.card.as_ref()).await {
            Ok(receipt) => {
                order.payment = Some(PaymentRecord {
                    charge_id: receipt.charge_id,
                    redirect_url: receipt.redirect_url.clone(),
                    detail: receipt.detail,
                });
                order.payment_status = receipt.status;
                match receipt.status {
                    PaymentStatus::Approved => {
                        order.status = OrderStatus::PaymentApproved;
                        order.updated_at = Utc::now();
                        self.store.update(order.clone()).await?;
                        self.ensure_label(&mut order).await;
                    }
                    PaymentStatus::Rejected => {
                        order.status = OrderStatus::PaymentFailed;
                        order.payment_error = Some("payment rejected by provider".into());
                    }
                    PaymentStatus::Cancelled => {
                        order.status = OrderStatus::PaymentCancelled;
                    }
                    PaymentStatus::Pending => {}
                }
                order.updated_at = Utc::now();
                self.store.update(order.clone()).await?;
                self.release_lock_if_terminal(&order);
                Ok(CheckoutOutcome {
                    redirect_url: receipt.redirect_url,
                    order,
                })
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Charge creation failed");
                order.status = OrderStatus::PaymentFailed;
                order.payment_status = PaymentStatus::Rejected;
                order.payment_error = Some(e.to_string());
                order.updated_at = Utc::now();
                self.store.update(order.clone()).await?;
                self.release_lock_if_terminal(&order);
                Ok(CheckoutOutcome {
                    order,
                    redirect_url: None,
                })
            }
        }
    }

    /// Resolve street/district/city/state from the postal code
    ///
    /// Buyer-supplied fields win when present. An unknown postal code
    /// fails validation; lookup outages are logged and ignored.
    async fn enrich_address(&self, address: &mut ShippingAddress) -> Result<(), OrderError> {
        match self.address.resolve(&address.postal_code).await {
            Ok(resolved) => {
                if address.street.is_empty() {
                    address.street = resolved.street;
                }
                if address.district.is_empty() {
                    address.district = resolved.district;
                }
                if address.city.is_empty() {
                    address.city = resolved.city;
                }
                if address.state.is_empty() {
                    address.state = resolved.state;
                }
                Ok(())
            }
            Err(AddressError::NotFound(cep)) => Err(OrderError::Validation(format!(
                "postal code not found: {cep}"
            ))),
            Err(AddressError::Validation(msg)) => Err(OrderError::Validation(msg)),
            Err(AddressError::Transient(e)) => {
                tracing::warn!(error = %e, "Address lookup unavailable; keeping buyer-supplied address");
                Ok(())
            }
        }
    }

    /// Apply a normalized payment status to an order
    ///
    /// Idempotent: re-applying the current terminal status is a no-op.
    /// A terminal-to-different-terminal change (reject after approve)
    /// is a conflict and leaves the order untouched.
    pub async fn apply_payment_event(
        &self,
        order_id: &str,
        status: PaymentStatus,
        detail: Option<String>,
        amount: Option<f64>,
    ) -> Result<Order, OrderError> {
        let guard = self.lock_for(order_id);
        let _held = guard.lock().await;

        let mut order = self.store.get(order_id).await?;

        if let Some(amount) = amount
            && !money::money_eq(amount, order.total)
        {
            tracing::warn!(order_id = %order.id, expected = order.total, reported = amount,
                "Provider-reported amount differs from order total");
        }

        if order.payment_status == status {
            self.release_lock_if_terminal(&order);
            return Ok(order);
        }
        if order.payment_status.is_terminal() {
            self.release_lock_if_terminal(&order);
            return Err(OrderError::StateConflict {
                order_id: order.id,
                current: format!("{:?}", order.payment_status),
                attempted: format!("{status:?}"),
            });
        }

        order.payment_status = status;
        if let Some(record) = order.payment.as_mut() {
            record.detail = detail;
        }
        match status {
            PaymentStatus::Approved => {
                // Only move the order axis forward; a late approval
                // after shipping already started changes nothing there
                if OrderStatus::PaymentApproved.rank() > order.status.rank() {
                    order.status = OrderStatus::PaymentApproved;
                }
            }
            PaymentStatus::Rejected => order.status = OrderStatus::PaymentFailed,
            PaymentStatus::Cancelled => order.status = OrderStatus::PaymentCancelled,
            PaymentStatus::Pending => {}
        }
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        tracing::info!(order_id = %order.id, status = ?status, "Payment event applied");

        if status == PaymentStatus::Approved {
            self.ensure_label(&mut order).await;
        }
        self.release_lock_if_terminal(&order);
        Ok(order)
    }

    /// Create a shipping label for an approved order, once
    ///
    /// Failure marks the shipping axis failed but never touches the
    /// payment that triggered it.
    async fn ensure_label(&self, order: &mut Order) {
        if order.label.is_some() || order.shipping_status != ShippingStatus::Pending {
            return;
        }
        match self.shipping.create_label(order).await {
            Ok(label) => {
                tracing::info!(order_id = %order.id, tracking = %label.tracking_code,
                    simulated = label.simulated, "Shipping label created");
                order.label = Some(label);
                order.shipping_status = ShippingStatus::Created;
                if OrderStatus::ShippingCreated.rank() > order.status.rank() {
                    order.status = OrderStatus::ShippingCreated;
                }
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Label creation failed");
                order.shipping_status = ShippingStatus::Failed;
                order.status = OrderStatus::ShippingFailed;
            }
        }
        order.updated_at = Utc::now();
        if let Err(e) = self.store.update(order.clone()).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to persist label outcome");
        }
    }

    /// Route a payment webhook to the order it references
    ///
    /// The payload status is advisory; the charge is re-queried against
    /// the provider for the authoritative status and order reference.
    /// Non-payment notification kinds are ignored.
    pub async fn process_payment_webhook(
        &self,
        hook: &PaymentWebhook,
    ) -> Result<Option<Order>, OrderError> {
        if hook.kind != "payment" {
            tracing::debug!(kind = %hook.kind, "Ignoring non-payment webhook");
            return Ok(None);
        }

        match self.payment.charge_status(&hook.data.id).await {
            Ok(charge) => {
                let Some(order_id) = charge
                    .order_ref
                    .clone()
                    .or_else(|| hook.data.external_reference.clone())
                else {
                    tracing::warn!(charge_id = %hook.data.id,
                        "Payment webhook carries no order reference; dropping");
                    return Ok(None);
                };
                self.apply_payment_event(&order_id, charge.status, charge.detail, charge.amount)
                    .await
                    .map(Some)
            }
            Err(e) => {
                // Provider unreachable: fall back to the payload if it
                // names both an order and a status we can normalize
                tracing::warn!(charge_id = %hook.data.id, error = %e,
                    "Charge re-query failed; falling back to webhook payload");
                let (Some(order_id), Some(raw)) =
                    (hook.data.external_reference.clone(), hook.data.status.clone())
                else {
                    return Err(e.into());
                };
                let status = normalize_webhook_status(&raw);
                self.apply_payment_event(
                    &order_id,
                    status,
                    hook.data.status_detail.clone(),
                    hook.data.amount,
                )
                .await
                .map(Some)
            }
        }
    }

    /// Apply a carrier lifecycle event to an order
    pub async fn apply_shipping_event(
        &self,
        order_id: &str,
        event: ShippingEvent,
    ) -> Result<Order, OrderError> {
        let guard = self.lock_for(order_id);
        let _held = guard.lock().await;

        let mut order = self.store.get(order_id).await?;

        let target = match &event {
            ShippingEvent::Created { .. } => ShippingStatus::Created,
            ShippingEvent::Paid => ShippingStatus::Paid,
            ShippingEvent::Generated { .. } => ShippingStatus::Generated,
            ShippingEvent::Dispatched => ShippingStatus::Dispatched,
            ShippingEvent::Delivered { .. } => ShippingStatus::Delivered,
            ShippingEvent::Cancelled { .. } => ShippingStatus::Cancelled,
        };

        if order.shipping_status == target {
            self.release_lock_if_terminal(&order);
            return Ok(order);
        }
        if ship_rank(target) <= ship_rank(order.shipping_status) {
            self.release_lock_if_terminal(&order);
            return Err(OrderError::StateConflict {
                order_id: order.id,
                current: format!("{:?}", order.shipping_status),
                attempted: event.name().to_string(),
            });
        }

        let mut notification = None;
        match event {
            ShippingEvent::Created {
                protocol,
                tracking_code,
            } => {
                if let Some(label) = order.label.as_mut() {
                    if protocol.is_some() {
                        label.protocol = protocol;
                    }
                    if let Some(code) = tracking_code {
                        label.tracking_code = code;
                        label.simulated = false;
                    }
                    label.status = ShippingStatus::Created;
                } else {
                    order.label = Some(ShippingLabel {
                        label_id: protocol.clone().unwrap_or_else(|| order.id.clone()),
                        protocol,
                        tracking_code: tracking_code.unwrap_or_default(),
                        label_url: None,
                        status: ShippingStatus::Created,
                        simulated: false,
                        created_at: Utc::now(),
                    });
                }
                if OrderStatus::ShippingCreated.rank() > order.status.rank() {
                    order.status = OrderStatus::ShippingCreated;
                }
            }
            ShippingEvent::Paid => {}
            ShippingEvent::Generated { label_url } => {
                if let Some(label) = order.label.as_mut() {
                    if label_url.is_some() {
                        label.label_url = label_url;
                    }
                    label.status = ShippingStatus::Generated;
                }
            }
            ShippingEvent::Dispatched => {
                order.status = OrderStatus::Shipped;
                notification = Some("Your order has been dispatched and is on its way!");
            }
            ShippingEvent::Delivered { .. } => {
                order.status = OrderStatus::Delivered;
                notification = Some("Your order has been delivered!");
            }
            ShippingEvent::Cancelled { reason } => {
                tracing::warn!(order_id = %order.id, reason = ?reason, "Shipment cancelled by carrier");
                order.status = OrderStatus::ShippingCancelled;
                notification = Some("Your shipment was cancelled. Please contact support.");
            }
        }
        order.shipping_status = target;
        if let Some(label) = order.label.as_mut()
            && ship_rank(target) > ship_rank(label.status)
        {
            label.status = target;
        }
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        tracing::info!(order_id = %order.id, status = ?target, "Shipping event applied");

        if let Some(message) = notification {
            self.notifications
                .append(Notification::new(&order.id, &order.buyer.email, message))
                .await;
        }
        self.release_lock_if_terminal(&order);
        Ok(order)
    }

    /// Re-attempt label creation after a shipping failure
    ///
    /// Only valid for paid orders stuck in `shipping_failed` or
    /// `shipping_cancelled`; the payment axis is never revisited.
    pub async fn retry_shipping(&self, order_id: &str) -> Result<Order, OrderError> {
        let guard = self.lock_for(order_id);
        let _held = guard.lock().await;

        let mut order = self.store.get(order_id).await?;
        if order.payment_status != PaymentStatus::Approved {
            return Err(OrderError::Validation(format!(
                "order {} is not paid; cannot retry shipping",
                order.id
            )));
        }
        if !matches!(
            order.status,
            OrderStatus::ShippingFailed | OrderStatus::ShippingCancelled
        ) {
            return Err(OrderError::StateConflict {
                order_id: order.id,
                current: format!("{:?}", order.status),
                attempted: "shipping_retry".to_string(),
            });
        }

        order.label = None;
        order.shipping_status = ShippingStatus::Pending;
        match self.shipping.create_label(&order).await {
            Ok(label) => {
                tracing::info!(order_id = %order.id, tracking = %label.tracking_code,
                    "Shipping retry succeeded");
                order.label = Some(label);
                order.shipping_status = ShippingStatus::Created;
                order.status = OrderStatus::ShippingCreated;
                order.updated_at = Utc::now();
                self.store.update(order.clone()).await?;
                Ok(order)
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Shipping retry failed");
                order.shipping_status = ShippingStatus::Failed;
                order.status = OrderStatus::ShippingFailed;
                order.updated_at = Utc::now();
                self.store.update(order).await?;
                Err(e.into())
            }
        }
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.store.get(order_id).await
    }

    pub async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        self.store.list_by_user(user_id).await
    }

    /// Live tracking for an order's label
    pub async fn track_order(&self, order_id: &str) -> Result<TrackingInfo, OrderError> {
        let order = self.store.get(order_id).await?;
        let Some(label) = order.label else {
            return Err(OrderError::Validation(format!(
                "order {} has no shipping label yet",
                order.id
            )));
        };
        Ok(self.shipping.track(&label.tracking_code).await?)
    }

    pub async fn list_notifications(&self, order_id: &str) -> Vec<Notification> {
        self.notifications.list_for_order(order_id).await
    }
}

/// Map a raw provider webhook status onto the closed status set
///
/// Only used when the authoritative charge re-query is unavailable.
fn normalize_webhook_status(raw: &str) -> PaymentStatus {
    match raw.to_ascii_lowercase().as_str() {
        "approved" | "confirmed" | "received" | "received_in_cash" => PaymentStatus::Approved,
        "rejected" | "refused" => PaymentStatus::Rejected,
        "cancelled" | "canceled" | "refunded" | "charged_back" | "chargeback_requested" => {
            PaymentStatus::Cancelled
        }
        _ => PaymentStatus::Pending,
    }
}

fn validate_cart(items: &[LineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::Validation("cart is empty".into()));
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::Validation(format!(
                "invalid quantity for {}: {}",
                item.product_id, item.quantity
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price <= 0.0 {
            return Err(OrderError::Validation(format!(
                "invalid unit price for {}: {}",
                item.product_id, item.unit_price
            )));
        }
        if let Some(w) = item.weight_kg
            && (!w.is_finite() || w <= 0.0)
        {
            return Err(OrderError::Validation(format!(
                "invalid weight for {}: {w}",
                item.product_id
            )));
        }
    }
    Ok(())
}

/// Pick the quote the buyer asked for, or the cheapest one
fn pick_quote(
    quotes: Vec<RateQuote>,
    service_id: Option<&str>,
) -> Result<ShippingQuote, OrderError> {
    let chosen = match service_id {
        Some(id) => quotes.into_iter().find(|q| q.service_id == id),
        None => quotes
            .into_iter()
            .min_by(|a, b| a.price.total_cmp(&b.price)),
    };
    let quote = chosen.ok_or_else(|| {
        OrderError::Validation("requested shipping service is not available".into())
    })?;
    Ok(ShippingQuote {
        service_id: quote.service_id,
        service_name: quote.service_name,
        carrier: quote.carrier,
        price: quote.price,
        delivery: quote.delivery,
        declared_value: quote.declared_value,
        estimated: quote.estimated,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use shared::webhook::PaymentWebhookData;

    use super::*;
    use crate::address::ResolvedAddress;
    use crate::core::Config;
    use crate::notify::MemoryNotificationStore;
    use crate::orders::store::MemoryOrderStore;
    use crate::payment::{ChargeReceipt, ChargeStatus, PaymentError};
    use crate::shipping::{ShippingError, simulated_label, simulated_tracking};

    /// Scripted payment gateway: `create_charge` answers with
    /// `receipt_status` (or fails when `fail_create`), counting calls;
    /// `charge_status` replays whatever the test scripted
    struct ScriptedPayment {
        receipt_status: PaymentStatus,
        fail_create: bool,
        created: AtomicU32,
        status_response: std::sync::Mutex<Option<ChargeStatus>>,
    }

    impl ScriptedPayment {
        fn pending() -> Self {
            Self {
                receipt_status: PaymentStatus::Pending,
                fail_create: false,
                created: AtomicU32::new(0),
                status_response: std::sync::Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                fail_create: true,
                ..Self::pending()
            }
        }

    }

    #[async_trait]
    impl PaymentGateway for ScriptedPayment {
        async fn create_charge(
            &self,
            order: &Order,
            _card: Option<&CardInstrument>,
        ) -> Result<ChargeReceipt, PaymentError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(PaymentError::Rejected("card declined".into()));
            }
            Ok(ChargeReceipt {
                charge_id: format!("chg-{}", order.id),
                redirect_url: Some("https://pay.example/checkout".into()),
                status: self.receipt_status,
                detail: None,
            })
        }

        async fn charge_status(&self, _charge_id: &str) -> Result<ChargeStatus, PaymentError> {
            self.status_response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| PaymentError::Transient("no scripted status".into()))
        }
    }

    /// Shipping gateway that simulates labels, optionally failing
    struct ScriptedShipping {
        fail_times: AtomicU32,
        created: AtomicU32,
    }

    impl ScriptedShipping {
        fn ok() -> Self {
            Self {
                fail_times: AtomicU32::new(0),
                created: AtomicU32::new(0),
            }
        }

        fn failing_first(times: u32) -> Self {
            Self {
                fail_times: AtomicU32::new(times),
                created: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ShippingGateway for ScriptedShipping {
        async fn create_label(&self, order: &Order) -> Result<ShippingLabel, ShippingError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(ShippingError::Transient("carrier down".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(simulated_label(order))
        }

        async fn track(&self, _tracking_code: &str) -> Result<TrackingInfo, ShippingError> {
            Ok(simulated_tracking())
        }
    }

    struct FixedAddress;

    #[async_trait]
    impl AddressLookup for FixedAddress {
        async fn resolve(&self, postal_code: &str) -> Result<ResolvedAddress, AddressError> {
            Ok(ResolvedAddress {
                postal_code: postal_code.to_string(),
                street: "Av. Paulista".into(),
                district: "Bela Vista".into(),
                city: "São Paulo".into(),
                state: "SP".into(),
            })
        }
    }

    fn test_rates() -> Arc<RateEstimator> {
        let mut config = Config::from_env();
        config.super_frete_token = "SUA_API_KEY_AQUI".into();
        config.origin_postal_code = "59140000".into();
        Arc::new(RateEstimator::new(&config))
    }

    fn manager(
        payment: Arc<ScriptedPayment>,
        shipping: Arc<ScriptedShipping>,
    ) -> (Arc<OrderManager>, Arc<MemoryOrderStore>) {
        let store = Arc::new(MemoryOrderStore::new());
        let manager = Arc::new(OrderManager::new(
            store.clone(),
            Arc::new(MemoryNotificationStore::new()),
            payment,
            shipping,
            test_rates(),
            Arc::new(FixedAddress),
            0.3,
        ));
        (manager, store)
    }

    fn checkout_input() -> CheckoutInput {
        CheckoutInput {
            buyer: Buyer {
                id: "u1".into(),
                email: "buyer@example.com".into(),
                name: "Buyer".into(),
            },
            items: vec![LineItem {
                product_id: "p1".into(),
                name: "Coffee mug".into(),
                unit_price: 49.90,
                quantity: 2,
                weight_kg: Some(0.4),
            }],
            address: ShippingAddress {
                postal_code: "01310-100".into(),
                street: String::new(),
                number: "1000".into(),
                complement: None,
                district: String::new(),
                city: String::new(),
                state: String::new(),
                phone: None,
                document: None,
            },
            payment_method: PaymentMethod::Pix,
            shipping_service_id: None,
            card: None,
        }
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_persisting() {
        let payment = Arc::new(ScriptedPayment::pending());
        let (manager, _) = manager(payment.clone(), Arc::new(ScriptedShipping::ok()));
        let mut input = checkout_input();
        input.items.clear();

        let err = manager.create_order(input).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert_eq!(payment.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn checkout_creates_pending_order_with_consistent_totals() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let outcome = manager.create_order(checkout_input()).await.unwrap();
        let order = outcome.order;

        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.subtotal, 99.80);
        assert!(order.shipping.estimated);
        assert!(money::money_eq(
            order.total,
            money::order_total(order.subtotal, order.shipping.price, order.surcharge)
        ));
        assert_eq!(outcome.redirect_url.as_deref(), Some("https://pay.example/checkout"));
        // Address enriched from the resolver
        assert_eq!(order.shipping_address.city, "São Paulo");
    }

    #[tokio::test]
    async fn rejected_charge_yields_payment_failed_and_no_label() {
        let shipping = Arc::new(ScriptedShipping::ok());
        let (manager, _) = manager(Arc::new(ScriptedPayment::failing()), shipping.clone());
        let outcome = manager.create_order(checkout_input()).await.unwrap();

        assert_eq!(outcome.order.status, OrderStatus::PaymentFailed);
        assert!(outcome.order.payment_error.is_some());
        assert_eq!(shipping.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn approval_creates_label_and_is_idempotent() {
        let shipping = Arc::new(ScriptedShipping::ok());
        let (manager, _) = manager(Arc::new(ScriptedPayment::pending()), shipping.clone());
        let order = manager.create_order(checkout_input()).await.unwrap().order;

        let after = manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, Some(order.total))
            .await
            .unwrap();
        assert_eq!(after.status, OrderStatus::ShippingCreated);
        assert_eq!(after.payment_status, PaymentStatus::Approved);
        assert!(after.label.as_ref().unwrap().simulated);

        // Duplicate delivery changes nothing and creates no second label
        let again = manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();
        assert_eq!(again.updated_at, after.updated_at);
        assert_eq!(shipping.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_rejection_after_approval_is_a_conflict() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();

        let err = manager
            .apply_payment_event(&order.id, PaymentStatus::Rejected, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::StateConflict { .. }));
        let current = manager.get_order(&order.id).await.unwrap();
        assert_eq!(current.payment_status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn label_failure_keeps_payment_approved() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::failing_first(1)),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        let after = manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();

        assert_eq!(after.status, OrderStatus::ShippingFailed);
        assert_eq!(after.payment_status, PaymentStatus::Approved);
        assert!(after.label.is_none());
    }

    #[tokio::test]
    async fn retry_after_shipping_failure_recovers() {
        let shipping = Arc::new(ScriptedShipping::failing_first(1));
        let (manager, _) = manager(Arc::new(ScriptedPayment::pending()), shipping.clone());
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();

        let retried = manager.retry_shipping(&order.id).await.unwrap();
        assert_eq!(retried.status, OrderStatus::ShippingCreated);
        assert_eq!(retried.shipping_status, ShippingStatus::Created);
        assert!(retried.label.is_some());
    }

    #[tokio::test]
    async fn retry_on_unpaid_order_is_rejected() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::failing()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        assert!(matches!(
            manager.retry_shipping(&order.id).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn out_of_order_shipping_events_never_regress() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();

        manager
            .apply_shipping_event(&order.id, ShippingEvent::Delivered { at: None })
            .await
            .unwrap();
        // A duplicate dispatched arriving after delivery is dropped
        let err = manager
            .apply_shipping_event(&order.id, ShippingEvent::Dispatched)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::StateConflict { .. }));

        let current = manager.get_order(&order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Delivered);
        assert_eq!(current.shipping_status, ShippingStatus::Delivered);
    }

    #[tokio::test]
    async fn terminal_orders_release_their_locks() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        assert!(manager.locks.contains_key(&order.id));

        manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();
        manager
            .apply_shipping_event(&order.id, ShippingEvent::Delivered { at: None })
            .await
            .unwrap();
        assert!(!manager.locks.contains_key(&order.id));

        // A late duplicate recreates the entry transiently and releases
        // it again on exit
        manager
            .apply_shipping_event(&order.id, ShippingEvent::Delivered { at: None })
            .await
            .unwrap();
        assert!(!manager.locks.contains_key(&order.id));

    }

    #[tokio::test]
    async fn failed_charges_release_their_locks() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::failing()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        assert_eq!(order.status, OrderStatus::PaymentFailed);
        assert!(!manager.locks.contains_key(&order.id));
    }

    #[tokio::test]
    async fn dispatch_and_delivery_emit_notifications() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        manager
            .apply_payment_event(&order.id, PaymentStatus::Approved, None, None)
            .await
            .unwrap();
        manager
            .apply_shipping_event(&order.id, ShippingEvent::Dispatched)
            .await
            .unwrap();
        manager
            .apply_shipping_event(&order.id, ShippingEvent::Delivered { at: None })
            .await
            .unwrap();

        let notes = manager.list_notifications(&order.id).await;
        assert_eq!(notes.len(), 2);
        assert!(notes[0].message.contains("dispatched"));
        assert!(notes[1].message.contains("delivered"));
        assert_eq!(notes[0].recipient, "buyer@example.com");
    }

    #[tokio::test]
    async fn payment_webhook_requeries_the_provider() {
        let payment = Arc::new(ScriptedPayment::pending());
        let (manager, _) = manager(payment.clone(), Arc::new(ScriptedShipping::ok()));
        let order = manager.create_order(checkout_input()).await.unwrap().order;
        *payment.status_response.lock().unwrap() = Some(ChargeStatus {
            status: PaymentStatus::Approved,
            detail: Some("accredited".into()),
            amount: Some(order.total),
            order_ref: Some(order.id.clone()),
        });

        let hook = PaymentWebhook {
            kind: "payment".into(),
            data: PaymentWebhookData {
                id: format!("chg-{}", order.id),
                external_reference: None,
                status: Some("pending".into()),
                status_detail: None,
                amount: None,
            },
        };
        let applied = manager.process_payment_webhook(&hook).await.unwrap().unwrap();
        // Authoritative re-query wins over the stale payload status
        assert_eq!(applied.payment_status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn payment_webhook_falls_back_to_payload_when_provider_is_down() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let order = manager.create_order(checkout_input()).await.unwrap().order;

        let hook = PaymentWebhook {
            kind: "payment".into(),
            data: PaymentWebhookData {
                id: "chg-unknown".into(),
                external_reference: Some(order.id.clone()),
                status: Some("approved".into()),
                status_detail: Some("accredited".into()),
                amount: Some(order.total),
            },
        };
        let applied = manager.process_payment_webhook(&hook).await.unwrap().unwrap();
        assert_eq!(applied.payment_status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn non_payment_webhooks_are_ignored() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let hook = PaymentWebhook {
            kind: "merchant_order".into(),
            data: PaymentWebhookData {
                id: "mo-1".into(),
                external_reference: None,
                status: None,
                status_detail: None,
                amount: None,
            },
        };
        assert!(manager.process_payment_webhook(&hook).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn explicit_service_choice_is_honored() {
        let (manager, _) = manager(
            Arc::new(ScriptedPayment::pending()),
            Arc::new(ScriptedShipping::ok()),
        );
        let mut input = checkout_input();
        input.shipping_service_id = Some("sedex".into());
        let order = manager.create_order(input).await.unwrap().order;
        assert_eq!(order.shipping.service_id, "sedex");

        let mut bad = checkout_input();
        bad.shipping_service_id = Some("drone-express".into());
        assert!(matches!(
            manager.create_order(bad).await,
            Err(OrderError::Validation(_))
        ));
    }
}
