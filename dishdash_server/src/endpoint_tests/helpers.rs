use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header::AUTHORIZATION, StatusCode},
    test,
    web,
};
use chrono::{Duration, Utc};
use dd_common::Secret;
use dishdash_engine::{
    db_types::{Profile, Role},
    events::EventProducers,
    helpers::FeeSchedule,
    test_utils::{FakeGateway, TestMarketplace, TEST_CURRENCY, TEST_KEY_SECRET},
    AuthApi,
    AvailabilityApi,
    CartApi,
    CheckoutApi,
    OrderFlowApi,
    PaymentApi,
    SessionRegistry,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    config::{AuthConfig, ServerOptions},
    server::{configure_routes, json_config},
};

// Only ever used to sign tokens in these tests.
pub const TEST_JWT_SECRET: &str = "dishdash-endpoint-tests-0123456789abcdef";
pub const TEST_KEY_ID: &str = "rzp_test_endpoint";

pub fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig::new(TEST_JWT_SECRET, Duration::hours(1)))
}

pub fn profile(id: i64, role: Role, password_hash: &str) -> Profile {
    Profile {
        id,
        email: format!("user{id}@example.com"),
        password_hash: password_hash.to_string(),
        role,
        full_name: format!("User {id}"),
        phone: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

/// Calls the service and returns the status and body. Errors raised by middleware are rendered the way the HTTP layer
/// would render them.
pub async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, String)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

/// Calls a streaming endpoint and returns the status and the first chunk of the body, which for an event stream is its
/// first frame.
pub async fn first_chunk<S, B>(app: &S, req: actix_http::Request) -> (StatusCode, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req).await;
    let status = res.status();
    let mut body = Box::pin(res.into_body());
    let chunk = futures::future::poll_fn(|cx| body.as_mut().poll_next(cx)).await;
    let text = match chunk {
        Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    };
    (status, text)
}

/// A seeded SQLite marketplace with the full route table in front of it and an in-memory gateway behind it.
pub struct EndpointHarness {
    pub market: TestMarketplace,
    pub issuer: TokenIssuer,
    pub sessions: web::Data<SessionRegistry>,
}

impl EndpointHarness {
    pub async fn new() -> Self {
        let market = TestMarketplace::new().await;
        Self { market, issuer: token_issuer(), sessions: web::Data::new(SessionRegistry::new()) }
    }

    pub fn token_for(&self, profile: &Profile) -> String {
        self.issuer.issue_token(profile).expect("Could not issue test token")
    }

    pub fn customer_token(&self) -> String {
        self.token_for(&self.market.seeded.customer)
    }

    pub fn vendor_token(&self) -> String {
        self.token_for(&self.market.seeded.vendor)
    }

    pub fn gateway(&self) -> &FakeGateway {
        &self.market.gateway
    }

    pub fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let db = self.market.db.clone();
        let fabric = self.market.fabric.clone();
        let gateway = self.market.gateway.clone();
        let issuer = self.issuer.clone();
        let sessions = self.sessions.clone();
        move |cfg| {
            let key_secret = Secret::new(TEST_KEY_SECRET.to_string());
            let payments = PaymentApi::new(db.clone(), gateway, key_secret, FeeSchedule::default());
            let checkout_orders = OrderFlowApi::new(db.clone(), fabric.clone(), EventProducers::default());
            let checkout = CheckoutApi::new(payments, checkout_orders, TEST_CURRENCY);
            cfg.app_data(json_config())
                .app_data(sessions)
                .app_data(web::Data::new(AuthApi::new(db.clone())))
                .app_data(web::Data::new(CartApi::new(db.clone(), fabric.clone())))
                .app_data(web::Data::new(AvailabilityApi::new(db.clone(), fabric.clone())))
                .app_data(web::Data::new(OrderFlowApi::new(db.clone(), fabric, EventProducers::default())))
                .app_data(web::Data::new(checkout))
                .app_data(web::Data::new(issuer.clone()))
                .app_data(web::Data::new(ServerOptions { gateway_key_id: TEST_KEY_ID.to_string() }));
            configure_routes::<SqliteDatabase, FakeGateway>(cfg, issuer);
        }
    }

    pub async fn tear_down(self) {
        self.market.tear_down().await;
    }
}
