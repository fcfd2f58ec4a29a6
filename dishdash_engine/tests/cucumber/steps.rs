use std::str::FromStr;

use cucumber::{given, then, when};
use dd_common::Money;
use dishdash_engine::{
    db_types::{AvailabilityStatus, OrderStatusType},
    AvailabilityManagement,
};

use crate::cucumber::MarketWorld;

#[given(expr = "{word} adds {int} {string} to the cart")]
async fn add_to_cart(world: &mut MarketWorld, who: String, quantity: usize, item: String) {
    let user = world.user(&who);
    let item = world.menu_item(&item);
    world.market().add_to_cart(&user, item.id, quantity).await;
}

#[given(expr = "{word} asks the restaurant to confirm the cart")]
async fn request_availability(world: &mut MarketWorld, who: String) {
    let user = world.user(&who);
    world.market().request_availability(&user).await;
}

async fn current_request_id(world: &MarketWorld, who: &str) -> i64 {
    let user = world.user(who);
    let session = world.market().session(&user).await;
    let id = session.lock().await.availability_request_id();
    id.expect("No availability request in the session")
}

#[given(expr = "{string} confirms the request from {word} with an estimate of {string}")]
async fn confirm_request(world: &mut MarketWorld, vendor: String, who: String, estimate: String) {
    let vendor = world.user(&vendor);
    let id = current_request_id(world, &who).await;
    let result = world.market().availability.respond(&vendor, id, Some(estimate), true).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "{string} declines the request from {word}")]
async fn decline_request(world: &mut MarketWorld, vendor: String, who: String) {
    let vendor = world.user(&vendor);
    let id = current_request_id(world, &who).await;
    let result = world.market().availability.respond(&vendor, id, None, false).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[then(expr = "the request from {word} is {word}")]
async fn request_status(world: &mut MarketWorld, who: String, status: String) {
    let id = current_request_id(world, &who).await;
    let request = world.market().db.fetch_availability_request(id).await.unwrap().expect("Request has gone");
    let expected = AvailabilityStatus::from_str(&status).expect("Not a valid availability status");
    assert_eq!(request.request.status, expected);
}

#[when(expr = "{word} pays and checks out")]
async fn checkout(world: &mut MarketWorld, who: String) {
    let user = world.user(&who);
    match world.market().pay_and_place(&user).await {
        Ok(order) => {
            world.last_order = Some(order);
            world.last_error = None;
        },
        Err(e) => {
            world.last_order = None;
            world.last_error = Some(e.to_string());
        },
    }
}

#[then(expr = "an order for {int}.{int} is placed")]
async fn order_placed(world: &mut MarketWorld, major: i64, minor: i64) {
    let order = world.last_order.as_ref().expect("No order was placed");
    assert_eq!(order.total, Money::from(major * 100 + minor));
}

#[then(expr = "the checkout fails with {string}")]
async fn checkout_fails(world: &mut MarketWorld, message: String) {
    assert!(world.last_order.is_none(), "An order was placed");
    let err = world.last_error.as_ref().expect("No error was recorded");
    assert!(err.contains(&message), "Expected '{message}' in '{err}'");
}

#[then(expr = "the cart of {word} is empty")]
async fn cart_is_empty(world: &mut MarketWorld, who: String) {
    let user = world.user(&who);
    let session = world.market().session(&user).await;
    let s = session.lock().await;
    assert!(s.cart().is_empty());
    assert_eq!(s.availability_request_id(), None);
}

#[when(expr = "{string} moves the order to {word}")]
async fn move_order(world: &mut MarketWorld, vendor: String, status: String) {
    let vendor = world.user(&vendor);
    let order = world.last_order.clone().expect("No order was placed");
    let status = OrderStatusType::from_str(&status).expect("Not a valid order status");
    match world.market().orders().update_status(&vendor, order.id, status).await {
        Ok(o) => {
            world.last_order = Some(o);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "{word} sees the order as {string}")]
async fn customer_sees(world: &mut MarketWorld, who: String, label: String) {
    let user = world.user(&who);
    let order = world.last_order.as_ref().expect("No order was placed");
    let status = world.market().orders().get_status(&user, order.id).await.expect("Could not fetch status");
    assert_eq!(status.display_status().label(), label);
}

#[then(expr = "the update fails with {string}")]
async fn update_fails(world: &mut MarketWorld, message: String) {
    let err = world.last_error.as_ref().expect("No error was recorded");
    assert!(err.contains(&message), "Expected '{message}' in '{err}'");
}
