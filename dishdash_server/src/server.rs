use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dishdash_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderPlacedEvent, OrderStatusChangedEvent},
    AuthApi,
    AvailabilityApi,
    CartApi,
    CheckoutApi,
    MarketplaceDatabase,
    NotificationFabric,
    OrderFlowApi,
    PaymentApi,
    PaymentProvider,
    SessionRegistry,
    SqliteDatabase,
};
use futures::FutureExt;
use log::*;

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::razorpay::RazorpayProvider,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        AddCartItemRoute,
        AvailabilityStreamRoute,
        ClearCartRoute,
        CreateCheckoutIntentRoute,
        CurrentAvailabilityRoute,
        GetCartRoute,
        MyOrdersRoute,
        MyOrdersStreamRoute,
        MyProfileRoute,
        OrderStatusRoute,
        RemoveCartItemRoute,
        RespondToAvailabilityRoute,
        SendAvailabilityRequestRoute,
        SetCartItemQuantityRoute,
        SignInRoute,
        SignOutRoute,
        SignUpRoute,
        UpdateOrderStatusRoute,
        VendorAvailabilityQueueRoute,
        VendorAvailabilityStreamRoute,
        VendorOrdersRoute,
        VendorOrdersStreamRoute,
        VerifyCheckoutRoute,
    },
};

const HOOK_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let fabric = NotificationFabric::default();
    let handlers = EventHandlers::new(HOOK_BUFFER_SIZE, audit_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let _expiry_worker = start_expiry_worker(
        db.clone(),
        fabric.clone(),
        config.availability_timeout,
        config.expiry_sweep_interval,
    );
    let gateway = RazorpayProvider::new(config.razorpay.clone())?;
    let srv = create_server_instance(config, db, gateway, fabric, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Writes every placed order and status change to the log, under the `dd::audit` target.
fn audit_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev: OrderPlacedEvent| {
            async move {
                info!(
                    target: "dd::audit",
                    "📦️ Order #{} placed by customer #{} with restaurant #{} for {} (payment {})",
                    ev.order.id, ev.order.customer_id, ev.order.restaurant_id, ev.order.total, ev.gateway_payment_id
                );
            }
            .boxed()
        })
        .on_status_changed(|ev: OrderStatusChangedEvent| {
            async move {
                info!(
                    target: "dd::audit",
                    "📦️ Order #{} moved from {} to {}",
                    ev.order.id,
                    ev.old_status,
                    ev.new_status()
                );
            }
            .boxed()
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayProvider,
    fabric: NotificationFabric,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    // Shared by every worker: cart sessions and sign-outs must be visible whichever worker takes the request
    let sessions = web::Data::new(SessionRegistry::new());
    let issuer = TokenIssuer::new(&config.auth);
    let options = ServerOptions::from_config(&config);
    info!("💻️ Payment gateway: {gateway:?}");
    let srv = HttpServer::new(move || {
        let auth_api = AuthApi::new(db.clone());
        let cart_api = CartApi::new(db.clone(), fabric.clone());
        let availability_api = AvailabilityApi::new(db.clone(), fabric.clone());
        let orders_api = OrderFlowApi::new(db.clone(), fabric.clone(), producers.clone());
        let payment_api = PaymentApi::new(db.clone(), gateway.clone(), config.razorpay.key_secret.clone(), config.fees);
        let checkout_orders = OrderFlowApi::new(db.clone(), fabric.clone(), producers.clone());
        let checkout_api = CheckoutApi::new(payment_api, checkout_orders, &config.currency);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dd::access_log"))
            .app_data(json_config())
            .app_data(sessions.clone())
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(availability_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(issuer.clone()))
            .app_data(web::Data::new(options.clone()))
            .configure(|cfg| configure_routes::<SqliteDatabase, RazorpayProvider>(cfg, issuer.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies are answered in the same `{"error": ..}` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

/// Registers every route. Everything except the health check and the sign-up/sign-in routes sits under `/api`, behind
/// the bearer token middleware.
pub fn configure_routes<B, G>(cfg: &mut web::ServiceConfig, issuer: TokenIssuer)
where
    B: MarketplaceDatabase + 'static,
    G: PaymentProvider + 'static,
{
    let auth_scope = web::scope("/api")
        .wrap(JwtMiddlewareFactory::new(issuer))
        .service(SignOutRoute::new())
        .service(MyProfileRoute::<B>::new())
        .service(GetCartRoute::new())
        .service(ClearCartRoute::<B>::new())
        .service(AddCartItemRoute::<B>::new())
        .service(SetCartItemQuantityRoute::<B>::new())
        .service(RemoveCartItemRoute::<B>::new())
        .service(AvailabilityStreamRoute::<B>::new())
        .service(SendAvailabilityRequestRoute::<B>::new())
        .service(CurrentAvailabilityRoute::<B>::new())
        .service(VendorAvailabilityStreamRoute::<B>::new())
        .service(VendorAvailabilityQueueRoute::<B>::new())
        .service(RespondToAvailabilityRoute::<B>::new())
        .service(CreateCheckoutIntentRoute::<B, G>::new())
        .service(VerifyCheckoutRoute::<B, G>::new())
        .service(MyOrdersStreamRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(OrderStatusRoute::<B>::new())
        .service(VendorOrdersStreamRoute::<B>::new())
        .service(VendorOrdersRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new());
    cfg.service(health).service(SignUpRoute::<B>::new()).service(SignInRoute::<B>::new()).service(auth_scope);
}
