//! Request handler definitions
//!
//! Define each route and its handler here. Anything longer than a few lines belongs in the engine, not here.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database call and gateway call is therefore async, and the
//! live-view streams only wake up when the notification fabric tells them something changed.
//!
//! Routes under `/api` sit behind the [`crate::middleware::JwtMiddlewareFactory`], so the [`JwtClaims`] extractor always
//! succeeds there. Routes declared with `requires [...]` additionally pass through the
//! [`crate::middleware::AclMiddlewareFactory`].
use std::str::FromStr;

use actix_web::{get, web, HttpResponse, Responder};
use dishdash_engine::{
    db_types::{OrderStatusType, Role},
    order_objects::OrderStatusView,
    traits::{AuthManagement, MarketplaceDatabase, PaymentProvider},
    AuthApi,
    AvailabilityApi,
    CartApi,
    CheckoutApi,
    NewAccount,
    OrderFlowApi,
    SessionRegistry,
};
use log::*;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::ServerOptions,
    data_objects::{
        AddItemRequest,
        AvailabilityRequestBody,
        AvailabilityView,
        CartView,
        CheckoutResponse,
        CheckoutVerifyRequest,
        IntentResponse,
        JsonResponse,
        RespondRequest,
        SetQuantityRequest,
        SignInRequest,
        SignUpRequest,
        StatusUpdateRequest,
        TokenResponse,
    },
    errors::ServerError,
    helpers::{sse_frame, sse_response, sse_response_with},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Identity  ----------------------------------------------------
route!(sign_up => Post "/auth/signup" impl AuthManagement);
/// Creates a customer or vendor account and signs the new user in.
pub async fn sign_up<A: AuthManagement>(
    body: web::Json<SignUpRequest>,
    api: web::Data<AuthApi<A>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    debug!("💻️ Received sign-up request: {req:?}");
    let account = NewAccount {
        email: req.email,
        password: req.password,
        role: req.role,
        full_name: req.full_name,
        phone: req.phone,
    };
    let profile = api.sign_up(account).await?;
    let token = signer.issue_token(&profile)?;
    Ok(HttpResponse::Created().json(TokenResponse { token, profile }))
}

route!(sign_in => Post "/auth/signin" impl AuthManagement);
/// Checks the user's email and password and issues an access token.
///
/// The token is an HS256 JWT and must be sent as `Authorization: Bearer <token>` on every `/api` call. It is valid for
/// `DD_JWT_EXPIRY_HOURS` and does NOT refresh.
pub async fn sign_in<A: AuthManagement>(
    body: web::Json<SignInRequest>,
    api: web::Data<AuthApi<A>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    trace!("💻️ Received sign-in request: {req:?}");
    let profile = api.sign_in(&req.email, &req.password).await?;
    let token = signer.issue_token(&profile)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token, profile }))
}

route!(sign_out => Post "/signout" requires [Role::Customer, Role::Vendor, Role::Admin]);
pub async fn sign_out(claims: JwtClaims, signer: web::Data<TokenIssuer>) -> Result<HttpResponse, ServerError> {
    signer.revoke_all(claims.sub);
    Ok(HttpResponse::Ok().json(JsonResponse::success("Signed out")))
}

route!(my_profile => Get "/me" impl AuthManagement);
pub async fn my_profile<A: AuthManagement>(
    claims: JwtClaims,
    api: web::Data<AuthApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let profile = api
        .profile(claims.sub)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No profile for user #{}", claims.sub)))?;
    Ok(HttpResponse::Ok().json(profile))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(get_cart => Get "/cart" requires [Role::Customer]);
pub async fn get_cart(claims: JwtClaims, sessions: web::Data<SessionRegistry>) -> Result<HttpResponse, ServerError> {
    let session = sessions.session(claims.sub).await;
    let session = session.lock().await;
    let view = CartView::new(session.cart(), session.availability_request_id(), session.is_placing_order());
    Ok(HttpResponse::Ok().json(view))
}

route!(clear_cart => Delete "/cart" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn clear_cart<B: MarketplaceDatabase>(
    claims: JwtClaims,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session = sessions.session(claims.sub).await;
    let mut session = session.lock().await;
    api.clear_cart(&claims.user(), &mut session).await?;
    Ok(HttpResponse::Ok().json(CartView::new(session.cart(), None, session.is_placing_order())))
}

route!(add_cart_item => Post "/cart/items" impl MarketplaceDatabase where requires [Role::Customer]);
/// Adds one unit of a menu item. Adding an item from another restaurant replaces the whole cart.
pub async fn add_cart_item<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<AddItemRequest>,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session = sessions.session(claims.sub).await;
    let mut session = session.lock().await;
    let (change, item) = api.add_item(&claims.user(), &mut session, body.menu_item_id).await?;
    debug!("💻️ Customer #{} added {} to their cart: {change:?}", claims.sub, item.name);
    let view = CartView::new(session.cart(), session.availability_request_id(), session.is_placing_order());
    Ok(HttpResponse::Ok().json(view))
}

route!(set_cart_item_quantity => Put "/cart/items/{item_id}" impl MarketplaceDatabase where requires [Role::Customer]);
/// Sets the quantity of a cart line. A quantity of zero or less removes the line.
pub async fn set_cart_item_quantity<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<SetQuantityRequest>,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    let session = sessions.session(claims.sub).await;
    let mut session = session.lock().await;
    api.set_quantity(&claims.user(), &mut session, item_id, body.quantity).await?;
    let view = CartView::new(session.cart(), session.availability_request_id(), session.is_placing_order());
    Ok(HttpResponse::Ok().json(view))
}

route!(remove_cart_item => Delete "/cart/items/{item_id}" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn remove_cart_item<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    let session = sessions.session(claims.sub).await;
    let mut session = session.lock().await;
    api.remove_item(&claims.user(), &mut session, item_id).await?;
    let view = CartView::new(session.cart(), session.availability_request_id(), session.is_placing_order());
    Ok(HttpResponse::Ok().json(view))
}

//----------------------------------------------   Availability  ----------------------------------------------------
route!(send_availability_request => Post "/availability" impl MarketplaceDatabase where requires [Role::Customer]);
/// Asks the cart's restaurant to confirm it can make the order. Any earlier pending request is withdrawn.
pub async fn send_availability_request<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: Option<web::Json<AvailabilityRequestBody>>,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query_text = body.map(|b| b.into_inner().query_text).unwrap_or_default();
    let session = sessions.session(claims.sub).await;
    let mut session = session.lock().await;
    let request = api.send_request(&claims.user(), &mut session, &query_text).await?;
    Ok(HttpResponse::Created().json(AvailabilityView::from(request)))
}

route!(current_availability => Get "/availability" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn current_availability<B: MarketplaceDatabase>(
    claims: JwtClaims,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session = sessions.session(claims.sub).await;
    let session = session.lock().await;
    let request = api
        .current_request(&claims.user(), &session)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("No availability request has been sent for this cart".into()))?;
    Ok(HttpResponse::Ok().json(AvailabilityView::from(request)))
}

route!(availability_stream => Get "/availability/stream" impl MarketplaceDatabase where requires [Role::Customer]);
/// Server-sent events for the session's current availability request. A new frame is sent whenever the vendor answers
/// or the request expires or is withdrawn. Frames carry the same shape as `GET /api/availability`, or `null` once the
/// request is gone.
pub async fn availability_stream<B: MarketplaceDatabase + 'static>(
    claims: JwtClaims,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = {
        let session = sessions.session(claims.sub).await;
        let session = session.lock().await;
        session.availability_request_id()
    };
    let request_id = request_id
        .ok_or_else(|| ServerError::NoRecordFound("No availability request has been sent for this cart".into()))?;
    let view = api.watch_request(&claims.user(), request_id).await?;
    debug!("💻️ Customer #{} is watching availability request #{request_id}", claims.sub);
    Ok(sse_response_with("availability", view, |event, request| {
        sse_frame(event, &request.clone().map(AvailabilityView::from))
    }))
}

route!(vendor_availability_queue => Get "/vendor/availability" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn vendor_availability_queue<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let queue = api.vendor_queue(&claims.user()).await?;
    Ok(HttpResponse::Ok().json(queue))
}

route!(vendor_availability_stream => Get "/vendor/availability/stream" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn vendor_availability_stream<B: MarketplaceDatabase + 'static>(
    claims: JwtClaims,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.watch_vendor_queue(&claims.user()).await?;
    Ok(sse_response("availability_queue", view))
}

route!(respond_to_availability => Post "/vendor/availability/{request_id}/respond" impl MarketplaceDatabase where requires [Role::Vendor]);
/// The vendor's one and only answer to an availability request.
pub async fn respond_to_availability<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<RespondRequest>,
    api: web::Data<AvailabilityApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = path.into_inner();
    let RespondRequest { is_available, estimated_time } = body.into_inner();
    let request = api.respond(&claims.user(), request_id, estimated_time, is_available).await?;
    Ok(HttpResponse::Ok().json(request))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_checkout_intent => Post "/checkout/intent" impl MarketplaceDatabase, PaymentProvider where requires [Role::Customer]);
/// Creates a gateway payment intent for the cart total. The cart must have been confirmed by the restaurant.
pub async fn create_checkout_intent<B: MarketplaceDatabase, G: PaymentProvider>(
    claims: JwtClaims,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CheckoutApi<B, G>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let session = sessions.session(claims.sub).await;
    let intent = api.start_checkout(&claims.user(), &session).await?;
    let response = IntentResponse {
        intent_id: intent.intent_id,
        amount: intent.amount,
        currency: intent.currency,
        key_id: options.gateway_key_id.clone(),
    };
    Ok(HttpResponse::Created().json(response))
}

route!(verify_checkout => Post "/checkout/verify" impl MarketplaceDatabase, PaymentProvider where requires [Role::Customer]);
/// Verifies the gateway's payment confirmation and places the order in the same request.
///
/// There is no separate "place order" endpoint: an order only exists once its payment has been verified here.
pub async fn verify_checkout<B: MarketplaceDatabase, G: PaymentProvider>(
    claims: JwtClaims,
    body: web::Json<CheckoutVerifyRequest>,
    sessions: web::Data<SessionRegistry>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let (confirmation, details) = body.into_inner().into_parts();
    info!("💻️ Customer #{} submitted payment {} for verification", claims.sub, confirmation.payment_id);
    let session = sessions.session(claims.sub).await;
    let receipt = api.complete_checkout(&claims.user(), &session, confirmation, details).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(receipt)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn my_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_customer(&claims.user()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_orders_stream => Get "/orders/stream" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn my_orders_stream<B: MarketplaceDatabase + 'static>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.watch_customer_orders(&claims.user()).await?;
    Ok(sse_response("orders", view))
}

route!(order_status => Get "/orders/{order_id}/status" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor, Role::Admin]);
pub async fn order_status<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = api.get_status(&claims.user(), order_id).await?;
    Ok(HttpResponse::Ok().json(OrderStatusView::new(order_id, status)))
}

route!(vendor_orders => Get "/vendor/orders" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn vendor_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_vendor(&claims.user()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(vendor_orders_stream => Get "/vendor/orders/stream" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn vendor_orders_stream<B: MarketplaceDatabase + 'static>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.watch_vendor_orders(&claims.user()).await?;
    Ok(sse_response("orders", view))
}

route!(update_order_status => Patch "/vendor/orders/{order_id}/status" impl MarketplaceDatabase where requires [Role::Vendor]);
/// Moves an order along the fulfilment track. Backward moves, and anything after `delivered` or `cancelled`, are
/// refused with 409 Conflict.
pub async fn update_order_status<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = OrderStatusType::from_str(body.status.trim())
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let order = api.update_status(&claims.user(), order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}
