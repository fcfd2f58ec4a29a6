use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    App,
};
use serde_json::{json, Value};

use super::helpers::*;

/// Fills the customer's cart with two Paneer Tikka and gets the restaurant to confirm it.
async fn confirmed_cart<S, B>(h: &EndpointHarness, app: &S)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let customer = h.customer_token();
    let tikka = h.market.seeded.menu[0].id;
    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/api/cart/items")
            .insert_header(bearer(&customer))
            .set_json(json!({ "menu_item_id": tikka }))
            .to_request();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK, "was: {body}");
    }
    let req = TestRequest::post().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let request_id = serde_json::from_str::<Value>(&body).unwrap()["request"]["id"].as_i64().unwrap();
    let req = TestRequest::post()
        .uri(&format!("/api/vendor/availability/{request_id}/respond"))
        .insert_header(bearer(&h.vendor_token()))
        .set_json(json!({ "is_available": true, "estimated_time": "30 mins" }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
}

async fn create_intent<S, B>(h: &EndpointHarness, app: &S) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = TestRequest::post().uri("/api/checkout/intent").insert_header(bearer(&h.customer_token())).to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    serde_json::from_str(&body).unwrap()
}

fn verify_request(token: &str, intent_id: &str, payment_id: &str, signature: &str) -> actix_http::Request {
    TestRequest::post()
        .uri("/api/checkout/verify")
        .insert_header(bearer(token))
        .set_json(json!({
            "razorpay_payment_id": payment_id,
            "razorpay_order_id": intent_id,
            "razorpay_signature": signature,
            "address": "221B Residency Road",
            "phone": "+91 98765 43210"
        }))
        .to_request()
}

#[actix_web::test]
async fn checkout_needs_a_confirmed_cart() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let customer = h.customer_token();
    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&customer))
        .set_json(json!({ "menu_item_id": h.market.seeded.menu[0].id }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::post().uri("/api/checkout/intent").insert_header(bearer(&customer)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT, "was: {body}");
    h.tear_down().await;
}

#[actix_web::test]
async fn checkout_places_order_and_vendor_fulfils_it() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let customer = h.customer_token();
    let vendor = h.vendor_token();
    confirmed_cart(&h, &app).await;

    let intent = create_intent(&h, &app).await;
    assert_eq!(intent["amount"], 2000);
    assert_eq!(intent["currency"], "INR");
    assert_eq!(intent["key_id"], TEST_KEY_ID);
    let intent_id = intent["intent_id"].as_str().unwrap().to_string();
    let (payment_id, signature) = h.gateway().pay(&intent_id);

    let (status, body) = send(&app, verify_request(&customer, &intent_id, &payment_id, &signature)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let receipt: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["splits"]["admin_fee"], 300);
    assert_eq!(receipt["splits"]["vendor_amount"], 1700);
    assert_eq!(receipt["splits"]["razorpay_fee"], 40);
    assert_eq!(receipt["order"]["status"], "new");
    assert_eq!(receipt["order"]["estimated_time"], "30 mins");
    let order_id = receipt["order"]["id"].as_i64().unwrap();

    // The intent cannot be spent twice
    let (status, _) = send(&app, verify_request(&customer, &intent_id, &payment_id, &signature)).await;
    assert!(status.is_client_error(), "was: {status}");

    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&customer)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let req = TestRequest::get().uri("/api/vendor/orders").insert_header(bearer(&vendor)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("221B Residency Road"), "was: {body}");

    let set_status = |token: &str, status: &str| {
        TestRequest::patch()
            .uri(&format!("/api/vendor/orders/{order_id}/status"))
            .insert_header(bearer(token))
            .set_json(json!({ "status": status }))
            .to_request()
    };
    let (status, body) = send(&app, set_status(&vendor, "confirmed")).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let (status, body) = send(&app, set_status(&vendor, "cooking")).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let (status, _) = send(&app, set_status(&vendor, "new")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, set_status(&vendor, "simmering")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let other_vendor = h.token_for(&h.market.seeded.other_vendor);
    let (status, _) = send(&app, set_status(&other_vendor, "ready")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, set_status(&customer, "ready")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req =
        TestRequest::get().uri(&format!("/api/orders/{order_id}/status")).insert_header(bearer(&customer)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["status"], "cooking");
    assert_eq!(view["order_id"], order_id);

    let stranger = h.token_for(&h.market.seeded.second_customer);
    let req =
        TestRequest::get().uri(&format!("/api/orders/{order_id}/status")).insert_header(bearer(&stranger)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    h.tear_down().await;
}

#[actix_web::test]
async fn forged_signature_is_refused() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    confirmed_cart(&h, &app).await;
    let intent = create_intent(&h, &app).await;
    let intent_id = intent["intent_id"].as_str().unwrap().to_string();
    let (payment_id, _) = h.gateway().pay(&intent_id);
    let forged = "0".repeat(64);
    let (status, body) = send(&app, verify_request(&h.customer_token(), &intent_id, &payment_id, &forged)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "was: {body}");

    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&h.customer_token())).to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body, "[]");
    h.tear_down().await;
}
