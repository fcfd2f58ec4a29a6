use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use dd_common::Money;
use dishdash_engine::{
    cart::{CartError, MAX_LINE_QUANTITY},
    db_types::{AvailabilityResponse, AvailabilityStatus, OrderStatusType, PaymentIntentStatus},
    events::{ChangeEvent, ChangeKind, EventHooks},
    order_objects::{DeliveryDetails, OrderQueryFilter},
    session::SessionError,
    test_utils::TestMarketplace,
    AvailabilityApiError,
    AvailabilityManagement,
    CartApiError,
    CheckoutError,
    OrderFlowError,
    OrderManagement,
    PaymentApiError,
    PaymentConfirmation,
    PaymentManagement,
};
use futures_util::FutureExt;

async fn order_count(market: &TestMarketplace) -> usize {
    market.db.search_orders(OrderQueryFilter::default()).await.expect("Error searching orders").len()
}

async fn row_count(market: &TestMarketplace, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(market.db.pool())
        .await
        .expect("Error counting rows")
}

#[tokio::test]
async fn vendor_response_reaches_customer() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let tikka = market.seeded.menu[0].id;
    market.add_to_cart(&customer, tikka, 1).await;
    let mut watcher = {
        let request = market.request_availability(&customer).await;
        assert_eq!(request.request.status, AvailabilityStatus::Pending);
        market.availability.watch_request(&customer, request.request.id).await.unwrap()
    };
    let request_id = watcher.current().as_ref().unwrap().request.id;
    market.availability.respond(&market.vendor(), request_id, Some("30 min".into()), true).await.unwrap();
    let updated = watcher.next_change().await.unwrap().unwrap().clone().unwrap();
    assert_eq!(
        updated.request.response(),
        Some(AvailabilityResponse { is_available: true, estimated_time: Some("30 min".into()) })
    );
    // A second answer is refused
    let err = market.availability.respond(&market.vendor(), request_id, None, false).await.unwrap_err();
    assert!(matches!(err, AvailabilityApiError::RequestAlreadyResolved(id) if id == request_id));
    market.tear_down().await;
}

#[tokio::test]
async fn only_the_restaurant_owner_may_respond() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    let intruder = market.seeded.other_vendor.as_user();
    let err = market.availability.respond(&intruder, request.request.id, Some("5 min".into()), true).await.unwrap_err();
    assert!(matches!(err, AvailabilityApiError::AccessDenied));
    // The customer cannot answer their own request either
    let err = market.availability.respond(&customer, request.request.id, None, true).await.unwrap_err();
    assert!(matches!(err, AvailabilityApiError::AccessDenied));
    market.tear_down().await;
}

#[tokio::test]
async fn order_total_comes_from_the_cart() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    // 10.00 × 2 + 5.00 × 1
    market.add_to_cart(&customer, market.seeded.menu[0].id, 2).await;
    market.add_to_cart(&customer, market.seeded.menu[1].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, Some("25 min".into()), true).await.unwrap();
    let order = market.pay_and_place(&customer).await.unwrap();
    assert_eq!(order.total, Money::from_major(25));
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.estimated_time.as_deref(), Some("25 min"));
    assert_eq!(order.customer_name, "Asha Rao");
    assert_eq!(order.restaurant_name, "Tandoor House");
    let items = market.db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let route = market.db.fetch_payment_route(order.id).await.unwrap().unwrap();
    assert_eq!(route.total_amount, Money::from_major(25));
    assert_eq!(route.admin_fee, Money::from(300));
    assert_eq!(route.gateway_fee, Money::from(50));
    assert_eq!(route.vendor_amount, Money::from(2200));
    market.tear_down().await;
}

#[tokio::test]
async fn no_order_without_a_response() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let session = market.session(&customer).await;
    // No request at all
    let err = market.checkout.start_checkout(&customer, &session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    // A pending request is not enough
    market.request_availability(&customer).await;
    let err = market.checkout.start_checkout(&customer, &session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    assert_eq!(order_count(&market).await, 0);
    assert_eq!(row_count(&market, "payment_intents").await, 0);
    assert_eq!(row_count(&market, "payment_routes").await, 0);
    assert_eq!(row_count(&market, "order_items").await, 0);
    market.tear_down().await;
}

#[tokio::test]
async fn rejected_requests_cannot_back_an_order() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    let rejected =
        market.availability.respond(&market.vendor(), request.request.id, Some("ignored".into()), false).await.unwrap();
    assert_eq!(rejected.status, AvailabilityStatus::Rejected);
    assert_eq!(rejected.estimated_time, None);
    let err = market.pay_and_place(&customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    assert_eq!(order_count(&market).await, 0);
    market.tear_down().await;
}

#[tokio::test]
async fn cart_edits_after_confirmation_invalidate_it() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let err = market.pay_and_place(&customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    market.tear_down().await;
}

#[tokio::test]
async fn placing_an_order_resets_the_session() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, Some("10 min".into()), true).await.unwrap();
    market.pay_and_place(&customer).await.unwrap();
    let session = market.session(&customer).await;
    let s = session.lock().await;
    assert!(s.cart().is_empty());
    assert_eq!(s.cart().restaurant_id(), None);
    assert_eq!(s.availability_request_id(), None);
    assert!(!s.is_placing_order());
    drop(s);
    // The same confirmation cannot be used twice
    let err = market.pay_and_place(&customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    assert_eq!(order_count(&market).await, 1);
    market.tear_down().await;
}

#[tokio::test]
async fn tampered_signature_fails_the_intent() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[1].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap();
    let session = market.session(&customer).await;
    let intent = market.checkout.start_checkout(&customer, &session).await.unwrap();
    let (payment_id, signature) = market.gateway.pay(&intent.intent_id);
    let mut tampered = signature.clone();
    tampered.replace_range(0..2, if tampered.starts_with("00") { "11" } else { "00" });
    let details = DeliveryDetails::new("1 Park Street", "+91 90000 00000");
    let bad = PaymentConfirmation {
        payment_id: payment_id.clone(),
        intent_id: intent.intent_id.clone(),
        signature: tampered,
    };
    let err = market.checkout.complete_checkout(&customer, &session, bad, details.clone()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(PaymentApiError::VerificationFailed)));
    let stored = market.db.fetch_payment_intent(&intent.intent_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentIntentStatus::Failed);
    // The genuine signature cannot revive the intent
    let good = PaymentConfirmation { payment_id, intent_id: intent.intent_id, signature };
    let err = market.checkout.complete_checkout(&customer, &session, good, details).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(PaymentApiError::IntentAlreadyUsed(_))));
    assert_eq!(order_count(&market).await, 0);
    assert!(!session.lock().await.is_placing_order());
    market.tear_down().await;
}

#[tokio::test]
async fn underpayment_is_refused() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap();
    let session = market.session(&customer).await;
    let intent = market.checkout.start_checkout(&customer, &session).await.unwrap();
    let (payment_id, signature) = market.gateway.pay_with(&intent.intent_id, Money::from_major(1), "captured");
    let confirmation = PaymentConfirmation { payment_id, intent_id: intent.intent_id, signature };
    let details = DeliveryDetails::new("1 Park Street", "+91 90000 00000");
    let err = market.checkout.complete_checkout(&customer, &session, confirmation, details).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(PaymentApiError::AmountMismatch { .. })));
    assert_eq!(order_count(&market).await, 0);
    market.tear_down().await;
}

#[tokio::test]
async fn missing_delivery_details_do_not_consume_the_payment() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap();
    let session = market.session(&customer).await;
    let intent = market.checkout.start_checkout(&customer, &session).await.unwrap();
    let (payment_id, signature) = market.gateway.pay(&intent.intent_id);
    let confirmation = PaymentConfirmation { payment_id, intent_id: intent.intent_id.clone(), signature };
    let err = market
        .checkout
        .complete_checkout(&customer, &session, confirmation.clone(), DeliveryDetails::new("", "+91 90000 00000"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::MissingDeliveryDetails)));
    let stored = market.db.fetch_payment_intent(&intent.intent_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentIntentStatus::Created);
    let receipt = market
        .checkout
        .complete_checkout(&customer, &session, confirmation, DeliveryDetails::new("7 Lake View", "+91 90000 00000"))
        .await
        .unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.splits.vendor_amount, Money::from(700));
    market.tear_down().await;
}

#[tokio::test]
async fn expired_requests_cannot_back_an_order() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    sqlx::query("UPDATE availability_requests SET created_at = datetime('now', '-2 hours') WHERE id = $1")
        .bind(request.request.id)
        .execute(market.db.pool())
        .await
        .unwrap();
    let expired = market.availability.expire_stale_requests(chrono::Duration::minutes(30)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].status, AvailabilityStatus::Expired);
    let err = market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap_err();
    assert!(matches!(err, AvailabilityApiError::RequestAlreadyResolved(_)));
    let err = market.pay_and_place(&customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    market.tear_down().await;
}

#[tokio::test]
async fn new_request_supersedes_the_pending_one() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let first = market.request_availability(&customer).await;
    market.add_to_cart(&customer, market.seeded.menu[1].id, 1).await;
    let second = market.request_availability(&customer).await;
    let queue = market.availability.vendor_queue(&market.vendor()).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].request.id, second.request.id);
    assert_eq!(queue[0].items.len(), 2);
    assert!(market.db.fetch_availability_request(first.request.id).await.unwrap().is_none());
    market.tear_down().await;
}

#[tokio::test]
async fn status_updates_follow_the_policy() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let vendor = market.vendor();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&vendor, request.request.id, None, true).await.unwrap();
    let order = market.pay_and_place(&customer).await.unwrap();
    let orders = market.orders();
    let updated = orders.update_status(&vendor, order.id, OrderStatusType::Cooking).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Cooking);
    let err = orders.update_status(&vendor, order.id, OrderStatusType::Confirmed).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidStatusTransition { .. }));
    let err = orders.update_status(&vendor, order.id, OrderStatusType::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidStatusTransition { .. }));
    let other = market.seeded.other_vendor.as_user();
    let err = orders.update_status(&other, order.id, OrderStatusType::Ready).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::AccessDenied));
    assert_eq!(orders.get_status(&customer, order.id).await.unwrap(), OrderStatusType::Cooking);
    let stranger = market.seeded.second_customer.as_user();
    assert!(matches!(orders.get_status(&stranger, order.id).await, Err(OrderFlowError::AccessDenied)));
    market.tear_down().await;
}

#[tokio::test]
async fn duplicate_events_do_not_duplicate_rows() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let vendor = market.vendor();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&vendor, request.request.id, None, true).await.unwrap();
    let mut watcher = market.orders().watch_vendor_orders(&vendor).await.unwrap();
    assert!(watcher.current().is_empty());
    let order = market.pay_and_place(&customer).await.unwrap();
    let event = ChangeEvent::order(ChangeKind::Inserted, &order);
    market.fabric.publish(event.clone());
    market.fabric.publish(event);
    let list = watcher.next_change().await.unwrap().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, order.id);
    let list = watcher.refetch().await.unwrap();
    assert_eq!(list.len(), 1);
    market.tear_down().await;
}

#[tokio::test]
async fn hooks_fire_for_placement_and_status_changes() {
    let placed = Arc::new(AtomicI32::new(0));
    let changed = Arc::new(AtomicI32::new(0));
    let mut hooks = EventHooks::default();
    let p = Arc::clone(&placed);
    hooks.on_order_placed(move |_ev| {
        let p = Arc::clone(&p);
        async move {
            p.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    });
    let c = Arc::clone(&changed);
    hooks.on_status_changed(move |ev| {
        let c = Arc::clone(&c);
        async move {
            if ev.new_status() == OrderStatusType::Confirmed {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }
        .boxed()
    });
    let market = TestMarketplace::with_hooks(hooks).await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&market.vendor(), request.request.id, None, true).await.unwrap();
    let order = market.pay_and_place(&customer).await.unwrap();
    market.orders().update_status(&market.vendor(), order.id, OrderStatusType::Confirmed).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(placed.load(Ordering::SeqCst), 1);
    assert_eq!(changed.load(Ordering::SeqCst), 1);
    market.tear_down().await;
}

#[tokio::test]
async fn oversized_quantities_are_refused() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let tikka = market.seeded.menu[0].id;
    market.add_to_cart(&customer, tikka, 1).await;
    let session = market.session(&customer).await;
    let mut s = session.lock().await;
    let err = market.carts.set_quantity(&customer, &mut s, tikka, i64::MAX).await.unwrap_err();
    assert!(matches!(err, CartApiError::Session(SessionError::Cart(CartError::QuantityTooLarge { .. }))));
    assert_eq!(s.cart().total(), Money::from_major(10));
    market.carts.set_quantity(&customer, &mut s, tikka, MAX_LINE_QUANTITY).await.unwrap();
    assert_eq!(s.cart().total(), Money::from_major(10 * MAX_LINE_QUANTITY));
    drop(s);
    market.tear_down().await;
}

#[tokio::test]
async fn switching_restaurant_withdraws_the_pending_request() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    assert_eq!(market.availability.vendor_queue(&market.vendor()).await.unwrap().len(), 1);
    market.add_to_cart(&customer, market.seeded.other_menu[0].id, 1).await;
    assert!(market.availability.vendor_queue(&market.vendor()).await.unwrap().is_empty());
    assert!(market.db.fetch_availability_request(request.request.id).await.unwrap().is_none());
    let session = market.session(&customer).await;
    assert_eq!(session.lock().await.availability_request_id(), None);
    market.tear_down().await;
}

#[tokio::test]
async fn emptying_the_cart_withdraws_the_pending_request() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let naan = market.seeded.menu[1].id;
    market.add_to_cart(&customer, naan, 1).await;
    let request = market.request_availability(&customer).await;
    let session = market.session(&customer).await;
    let mut s = session.lock().await;
    market.carts.set_quantity(&customer, &mut s, naan, 0).await.unwrap();
    assert_eq!(s.availability_request_id(), None);
    drop(s);
    assert!(market.availability.vendor_queue(&market.vendor()).await.unwrap().is_empty());
    assert!(market.db.fetch_availability_request(request.request.id).await.unwrap().is_none());
    market.tear_down().await;
}

#[tokio::test]
async fn intent_for_an_older_cart_is_not_consumed() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let vendor = market.vendor();
    market.add_to_cart(&customer, market.seeded.menu[0].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&vendor, request.request.id, None, true).await.unwrap();
    let session = market.session(&customer).await;
    let stale = market.checkout.start_checkout(&customer, &session).await.unwrap();
    assert_eq!(stale.amount, Money::from_major(10));

    // The cart grows and the restaurant confirms the new one
    market.add_to_cart(&customer, market.seeded.menu[1].id, 1).await;
    let request = market.request_availability(&customer).await;
    market.availability.respond(&vendor, request.request.id, None, true).await.unwrap();

    let (payment_id, signature) = market.gateway.pay(&stale.intent_id);
    let confirmation = PaymentConfirmation { payment_id, intent_id: stale.intent_id.clone(), signature };
    let details = DeliveryDetails::new("1 Park Street", "+91 90000 00000");
    let err = market.checkout.complete_checkout(&customer, &session, confirmation, details).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderFlowError::CannotPlaceOrder(_))));
    let stored = market.db.fetch_payment_intent(&stale.intent_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentIntentStatus::Created);
    assert!(!session.lock().await.is_placing_order());
    assert_eq!(order_count(&market).await, 0);

    // A fresh intent for the current total goes through
    let order = market.pay_and_place(&customer).await.unwrap();
    assert_eq!(order.total, Money::from_major(15));
    market.tear_down().await;
}

#[tokio::test]
async fn intents_must_cover_the_platform_fee() {
    let market = TestMarketplace::new().await;
    let customer = market.customer();
    let err = market.checkout.payments().create_intent(&customer, Money::from(250), "INR", None).await.unwrap_err();
    assert!(matches!(err, PaymentApiError::BelowPlatformFee { .. }));
    assert_eq!(row_count(&market, "payment_intents").await, 0);
    let intent = market.checkout.payments().create_intent(&customer, Money::from(300), "INR", None).await.unwrap();
    assert_eq!(intent.amount, Money::from(300));
    market.tear_down().await;
}
