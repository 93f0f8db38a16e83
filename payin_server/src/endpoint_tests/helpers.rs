use actix_web::{http::StatusCode, test, test::TestRequest, App};
use chrono::Utc;
use log::debug;
use payin_engine::{
    cache::{AuxCache, MemoryCache},
    db_types::{Merchant, RequisiteType},
    sqlite::db::{aux_data, merchants, seed},
    test_utils::prepare_env::new_test_database,
    InvoiceFlowApi,
    SqliteDatabase,
};
use rust_decimal_macros::dec;

use crate::server::configure_routes;

pub type TestApi = InvoiceFlowApi<SqliteDatabase, AuxCache<SqliteDatabase, MemoryCache>>;

/// A database with bank `sber`, merchant `M1` (minimum 50 for every type) and one permissive CARD requisite `C1`.
pub async fn seeded_database(with_exchange_rate: bool) -> SqliteDatabase {
    let db = new_test_database().await;
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    seed::insert_bank("sber", "Sberbank", &mut conn).await.expect("Error creating bank");
    let merchant =
        Merchant { id: "M1".into(), in_limit_card: dec!(50), in_limit_wallet: dec!(50), in_limit_sbp: dec!(50) };
    merchants::upsert_merchant(&merchant, &mut conn).await.expect("Error creating merchant");
    seed::insert_channel("C1", RequisiteType::Card, "sber", None, "M1", &mut conn)
        .await
        .expect("Error creating requisite");
    if with_exchange_rate {
        aux_data::set_exchange_rate(dec!(92.5), Utc::now(), &mut conn).await.expect("Error setting exchange rate");
    }
    db
}

pub fn api_for(db: SqliteDatabase) -> TestApi {
    let aux = AuxCache::new(db.clone(), MemoryCache::default());
    InvoiceFlowApi::new(db, aux)
}

pub async fn get_request(path: &str, api: TestApi) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), api).await
}

pub async fn post_request(path: &str, body: &str, api: TestApi) -> (StatusCode, String) {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    send(req, api).await
}

async fn send(req: TestRequest, api: TestApi) -> (StatusCode, String) {
    let app = App::new().configure(|cfg| configure_routes(cfg, api));
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}
