//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use storefront_engine::{bus::MessageBus, db_types::OrderId, CommerceDatabase, OrderFlowApi};

use crate::{errors::ServerError, helpers::request_context};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
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
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(checkout => Post "/cart/checkout" impl CommerceDatabase, MessageBus);
/// Route handler for the checkout endpoint.
///
/// Converts the caller's cart into a pending order and notifies the payment service. Responds 201 with the
/// order on success, 422 when the cart is empty, and 402 Payment Required when the caller already has an
/// order awaiting payment (the response details name the blocking order).
pub async fn checkout<B, M>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let ctx = request_context(&req)?;
    debug!("💻️ POST checkout for user {}", ctx.user_id);
    let order = api.checkout(&ctx).await?;
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl CommerceDatabase, MessageBus);
/// Fetches one of the caller's orders by id. Orders belonging to anyone else read as 404.
pub async fn order_by_id<B, M>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let ctx = request_context(&req)?;
    let order_id = path.into_inner();
    debug!("💻️ GET order [{order_id}] for user {}", ctx.user_id);
    let order = api.order_for_user(&ctx, &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl CommerceDatabase, MessageBus);
/// Cancels one of the caller's pending orders. Anything past pending responds 400 with a refund hint.
pub async fn cancel_order<B, M>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let ctx = request_context(&req)?;
    let order_id = path.into_inner();
    debug!("💻️ POST cancel order [{order_id}] for user {}", ctx.user_id);
    let order = api.cancel_order(&ctx, &order_id).await?;
    info!("💻️ Order [{}] cancelled at the request of user {}", order.id, order.user_id);
    Ok(HttpResponse::Ok().json(order))
}
