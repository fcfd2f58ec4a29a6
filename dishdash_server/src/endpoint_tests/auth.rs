use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use dishdash_engine::{db_types::Role, helpers::hash_password, traits::AuthApiError, AuthApi};
use serde_json::json;

use super::{helpers::*, mocks::MockAuthManager};
use crate::{
    auth::TokenIssuer,
    data_objects::TokenResponse,
    middleware::JwtMiddlewareFactory,
    routes::{MyProfileRoute, SignInRoute, SignOutRoute, SignUpRoute},
    server::json_config,
};

const PASSWORD: &str = "saffron and cardamom";

fn configure_app(manager: MockAuthManager, issuer: TokenIssuer) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(issuer.clone()))
            .service(SignOutRoute::new())
            .service(MyProfileRoute::<MockAuthManager>::new());
        cfg.app_data(json_config())
            .app_data(web::Data::new(AuthApi::new(manager)))
            .app_data(web::Data::new(issuer))
            .service(SignUpRoute::<MockAuthManager>::new())
            .service(SignInRoute::<MockAuthManager>::new())
            .service(scope);
    }
}

fn manager_with_customer() -> MockAuthManager {
    let hash = hash_password(PASSWORD).unwrap();
    let customer = profile(7, Role::Customer, &hash);
    let mut manager = MockAuthManager::new();
    let c = customer.clone();
    manager.expect_fetch_profile_by_email().returning(move |email| {
        if email == c.email {
            Ok(Some(c.clone()))
        } else {
            Ok(None)
        }
    });
    manager.expect_fetch_profile().returning(move |id| Ok((id == customer.id).then(|| customer.clone())));
    manager
}

#[actix_web::test]
async fn sign_in_issues_a_usable_token() {
    let _ = env_logger::try_init().ok();
    let issuer = token_issuer();
    let app = test::init_service(App::new().configure(configure_app(manager_with_customer(), issuer.clone()))).await;
    let req = TestRequest::post()
        .uri("/auth/signin")
        .set_json(json!({"email": "User7@example.com ", "password": PASSWORD}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let response: TokenResponse = serde_json::from_str(&body).unwrap();
    assert!(!body.contains("password_hash"));
    let claims = issuer.validate(&response.token).unwrap();
    assert_eq!(claims.sub, 7);
    assert_eq!(claims.role, Role::Customer);

    let req = TestRequest::get().uri("/api/me").insert_header(bearer(&response.token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert!(body.contains("user7@example.com"));
}

#[actix_web::test]
async fn sign_in_with_wrong_password() {
    let app = test::init_service(App::new().configure(configure_app(manager_with_customer(), token_issuer()))).await;
    let req = TestRequest::post()
        .uri("/auth/signin")
        .set_json(json!({"email": "user7@example.com", "password": "not the password"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. Invalid email or password."}"#);
}

#[actix_web::test]
async fn unknown_email_looks_like_a_wrong_password() {
    let app = test::init_service(App::new().configure(configure_app(manager_with_customer(), token_issuer()))).await;
    let req = TestRequest::post()
        .uri("/auth/signin")
        .set_json(json!({"email": "nobody@example.com", "password": PASSWORD}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. Invalid email or password."}"#);
}

#[actix_web::test]
async fn sign_up_creates_account_and_signs_in() {
    let mut manager = MockAuthManager::new();
    manager.expect_insert_profile().times(1).returning(|p| {
        assert_eq!(p.email, "meera@example.com");
        assert_ne!(p.password_hash, PASSWORD);
        let mut created = profile(12, p.role, &p.password_hash);
        created.email = p.email;
        Ok(created)
    });
    let issuer = token_issuer();
    let app = test::init_service(App::new().configure(configure_app(manager, issuer.clone()))).await;
    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "email": "Meera@Example.com",
            "password": PASSWORD,
            "role": "vendor",
            "full_name": "Meera Kapoor"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let response: TokenResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.profile.role, Role::Vendor);
    assert_eq!(issuer.validate(&response.token).unwrap().sub, 12);
}

#[actix_web::test]
async fn sign_up_refuses_admin_accounts() {
    let mut manager = MockAuthManager::new();
    manager.expect_insert_profile().never();
    let app = test::init_service(App::new().configure(configure_app(manager, token_issuer()))).await;
    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({"email": "root@example.com", "password": PASSWORD, "role": "admin", "full_name": "Root"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("admin accounts cannot be created"), "was: {body}");
}

#[actix_web::test]
async fn duplicate_email_is_a_conflict() {
    let mut manager = MockAuthManager::new();
    manager.expect_insert_profile().returning(|_| Err(AuthApiError::DuplicateEmail));
    let app = test::init_service(App::new().configure(configure_app(manager, token_issuer()))).await;
    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({"email": "asha@example.com", "password": PASSWORD, "role": "customer", "full_name": "Asha"}))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn malformed_body_is_a_bad_request() {
    let app = test::init_service(App::new().configure(configure_app(MockAuthManager::new(), token_issuer()))).await;
    let req = TestRequest::post()
        .uri("/auth/signin")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"email\": ")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Could not read request body"#), "was: {body}");
}

#[actix_web::test]
async fn missing_token() {
    let app = test::init_service(App::new().configure(configure_app(MockAuthManager::new(), token_issuer()))).await;
    let req = TestRequest::get().uri("/api/me").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No access token was provided."}"#);
}

#[actix_web::test]
async fn token_signed_with_another_secret() {
    let app = test::init_service(App::new().configure(configure_app(MockAuthManager::new(), token_issuer()))).await;
    let other = TokenIssuer::new(&crate::config::AuthConfig::new(
        "some-other-secret-that-is-long-enough-000",
        chrono::Duration::hours(1),
    ));
    let token = other.issue_token(&profile(7, Role::Customer, "")).unwrap();
    let req = TestRequest::get().uri("/api/me").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn sign_out_revokes_earlier_tokens() {
    let issuer = token_issuer();
    let app = test::init_service(App::new().configure(configure_app(manager_with_customer(), issuer.clone()))).await;
    let customer = profile(7, Role::Customer, "");
    let token = issuer.issue_token(&customer).unwrap();

    let req = TestRequest::post().uri("/api/signout").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");

    let req = TestRequest::get().uri("/api/me").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("revoked"), "was: {body}");

    let fresh = issuer.issue_token(&customer).unwrap();
    let req = TestRequest::get().uri("/api/me").insert_header(bearer(&fresh)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}
