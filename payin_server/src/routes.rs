//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine, which does its database and
//! cache work asynchronously, so workers are never blocked.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use payin_engine::{
    traits::{AuxDataSource, PayinDatabase},
    InvoiceFlowApi,
    NewInvoiceRequest,
};

use crate::{
    data_objects::{CreateInvoiceRequest, CreateInvoiceResponse, CreateInvoiceResponseData},
    errors::ServerError,
};

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

//----------------------------------------------   Invoices  ----------------------------------------------------
route!(create_invoice => Post "/invoice-in" impl PayinDatabase, AuxDataSource);
/// Creates a pay-in invoice.
///
/// The body is a [`CreateInvoiceRequest`]. On success the response carries the invoice together with the payment
/// details (card, phone or wallet number, recipient and bank) the payer must use. On failure the envelope holds a
/// short, stable message and no data.
pub async fn create_invoice<B, A>(
    body: web::Json<CreateInvoiceRequest>,
    api: web::Data<InvoiceFlowApi<B, A>>,
) -> Result<HttpResponse, ServerError>
where
    B: PayinDatabase,
    A: AuxDataSource,
{
    let request = body.into_inner();
    debug!(
        "💻️ Invoice request from merchant {} for {} {} ({})",
        request.merchant_id, request.amount, request.requisite_type, request.internal_request_id
    );
    request.validate()?;
    let issued = api.create_invoice(NewInvoiceRequest::from(request)).await.map_err(|e| {
        debug!("💻️ Invoice request failed. {e}");
        e
    })?;
    info!(
        "💻️ Invoice {} issued on requisite {} for {}",
        issued.invoice.id, issued.invoice.requisite_id, issued.invoice.amount
    );
    let data = CreateInvoiceResponseData::from(issued);
    Ok(HttpResponse::Ok().json(CreateInvoiceResponse::success(data)))
}
