use std::collections::HashMap;

use cucumber::World;
use log::*;
use payin_engine::{
    cache::{AuxCache, MemoryCache},
    db_types::{IssuedInvoice, RequisiteType},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    InvoiceFlowApi,
    InvoiceFlowError,
    SqliteDatabase,
};

pub type FlowApi = InvoiceFlowApi<SqliteDatabase, AuxCache<SqliteDatabase, MemoryCache>>;

#[derive(Default, Debug, World)]
pub struct PayinWorld {
    pub system: Option<PayinSystem>,
    pub last_outcome: Option<Result<IssuedInvoice, InvoiceFlowError>>,
    pub issued: Vec<IssuedInvoice>,
}

#[derive(Debug)]
pub struct PayinSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: FlowApi,
    /// The type of every requisite created so far, so that steps can refer to requisites by id alone.
    pub requisite_types: HashMap<String, RequisiteType>,
}

impl PayinWorld {
    pub fn system(&mut self) -> &mut PayinSystem {
        self.system.as_mut().expect("Payin system not initialised")
    }

    pub fn api(&self) -> &FlowApi {
        &self.system.as_ref().expect("Payin system not initialised").api
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system.as_ref().expect("Payin system not initialised").db
    }

    pub fn last_invoice(&self) -> &IssuedInvoice {
        match self.last_outcome.as_ref().expect("No invoice has been requested") {
            Ok(invoice) => invoice,
            Err(e) => panic!("The last request failed: {e}"),
        }
    }
}

impl PayinSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let aux = AuxCache::new(db.clone(), MemoryCache::default());
        let api = InvoiceFlowApi::new(db.clone(), aux);
        Self { db_path: url, db, api, requisite_types: HashMap::new() }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
