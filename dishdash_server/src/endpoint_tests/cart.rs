use actix_web::{http::StatusCode, test, test::TestRequest, App};
use serde_json::{json, Value};

use super::helpers::*;

#[actix_web::test]
async fn cart_follows_edits() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let token = h.customer_token();
    let tikka = h.market.seeded.menu[0].id;
    let naan = h.market.seeded.menu[1].id;

    for item in [tikka, tikka, naan] {
        let req = TestRequest::post()
            .uri("/api/cart/items")
            .insert_header(bearer(&token))
            .set_json(json!({ "menu_item_id": item }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK, "was: {body}");
    }
    let req = TestRequest::get().uri("/api/cart").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["total"], 2500);
    assert_eq!(cart["restaurant_id"], h.market.seeded.restaurant.id);

    let req = TestRequest::put()
        .uri(&format!("/api/cart/items/{naan}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "quantity": 0 }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["total"], 2000);

    let req = TestRequest::delete().uri(&format!("/api/cart/items/{naan}")).insert_header(bearer(&token)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::put()
        .uri(&format!("/api/cart/items/{tikka}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "quantity": i64::MAX }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "was: {body}");
    let req = TestRequest::get().uri("/api/cart").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["total"], 2000);

    let req = TestRequest::delete().uri("/api/cart").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["item_count"], 0);
    assert!(cart["restaurant_id"].is_null());
    h.tear_down().await;
}

#[actix_web::test]
async fn unavailable_and_unknown_items() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let token = h.customer_token();
    let kulfi = h.market.seeded.menu[2].id;

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&token))
        .set_json(json!({ "menu_item_id": kulfi }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT, "was: {body}");

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&token))
        .set_json(json!({ "menu_item_id": 9999 }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    h.tear_down().await;
}

#[actix_web::test]
async fn vendors_have_no_cart() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let req = TestRequest::get().uri("/api/cart").insert_header(bearer(&h.vendor_token())).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("not available to vendor accounts"), "was: {body}");
    h.tear_down().await;
}

#[actix_web::test]
async fn availability_negotiation() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let customer = h.customer_token();
    let vendor = h.vendor_token();
    let other_vendor = h.token_for(&h.market.seeded.other_vendor);

    // Nothing in the cart yet
    let req = TestRequest::post().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::get().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&customer))
        .set_json(json!({ "menu_item_id": h.market.seeded.menu[0].id }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::post()
        .uri("/api/availability")
        .insert_header(bearer(&customer))
        .set_json(json!({ "query_text": "Can you make it mild?" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let sent: Value = serde_json::from_str(&body).unwrap();
    let request_id = sent["request"]["id"].as_i64().unwrap();
    assert_eq!(sent["request"]["status"], "pending");
    assert!(sent["response"].is_null());

    let req = TestRequest::get().uri("/api/vendor/availability").insert_header(bearer(&vendor)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Can you make it mild?"), "was: {body}");

    let respond = |token: &str| {
        TestRequest::post()
            .uri(&format!("/api/vendor/availability/{request_id}/respond"))
            .insert_header(bearer(token))
            .set_json(json!({ "is_available": true, "estimated_time": "25 mins" }))
            .to_request()
    };
    let (status, _) = send(&app, respond(&other_vendor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, respond(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "was: {body}");
    let (status, body) = send(&app, respond(&vendor)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let (status, _) = send(&app, respond(&vendor)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::get().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let current: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(current["response"]["is_available"], true);
    assert_eq!(current["response"]["estimated_time"], "25 mins");
    h.tear_down().await;
}

#[actix_web::test]
async fn availability_stream_carries_the_answer() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let customer = h.customer_token();

    let req = TestRequest::get().uri("/api/availability/stream").insert_header(bearer(&customer)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&customer))
        .set_json(json!({ "menu_item_id": h.market.seeded.menu[0].id }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::post().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let request_id = serde_json::from_str::<Value>(&body).unwrap()["request"]["id"].as_i64().unwrap();
    let req = TestRequest::post()
        .uri(&format!("/api/vendor/availability/{request_id}/respond"))
        .insert_header(bearer(&h.vendor_token()))
        .set_json(json!({ "is_available": true, "estimated_time": "30 min" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get().uri("/api/availability/stream").insert_header(bearer(&customer)).to_request();
    let (status, frame) = first_chunk(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(frame.starts_with("event: availability\ndata: "), "was: {frame}");
    assert!(frame.contains(r#""response":{"is_available":true,"estimated_time":"30 min"}"#), "was: {frame}");
    h.tear_down().await;
}

#[actix_web::test]
async fn switching_restaurant_clears_the_vendor_queue() {
    let h = EndpointHarness::new().await;
    let app = test::init_service(App::new().configure(h.configure())).await;
    let customer = h.customer_token();
    let vendor = h.vendor_token();
    let add = |item: i64| {
        TestRequest::post()
            .uri("/api/cart/items")
            .insert_header(bearer(&customer))
            .set_json(json!({ "menu_item_id": item }))
            .to_request()
    };
    let (status, _) = send(&app, add(h.market.seeded.menu[0].id)).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::post().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, add(h.market.seeded.other_menu[0].id)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["restaurant_id"], h.market.seeded.other_restaurant.id);

    let req = TestRequest::get().uri("/api/vendor/availability").insert_header(bearer(&vendor)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    let req = TestRequest::get().uri("/api/availability").insert_header(bearer(&customer)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    h.tear_down().await;
}
