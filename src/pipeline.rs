//! Pipeline assembly
//!
//! Five consumer groups, each with its own broker list, group id, topic set
//! and router. Routers are built from repository and service handles so the
//! same wiring runs against Postgres in production and in-memory doubles in
//! tests.

use std::sync::Arc;

use crate::config::KafkaConfig;
use crate::db::repository::{EntityRepository, MerchantRepository, TableRow};
use crate::db::{DbPool, PgMerchantRepository, PgTableRepository};
use crate::handlers::{
    CdcHandler, DolphinHandler, GwsMerchantBankHandler, GwsMerchantHandler, WorkerHandler,
};
use crate::kafka::{MessageHandler, Publisher, TopicRouter};
use crate::models::restructure::CdcEntity;
use crate::models::shark::*;
use crate::services::{ActivityService, DolphinService, TokenGenerator, WorkerUsecases};
use crate::topics::{CdcTopics, DolphinTopics, GwsTopics, SharkTopics, TopicRegistry, WorkerTopics};

pub const SHARK: &str = "shark";
pub const CDC: &str = "cdc";
pub const GWS: &str = "gws";
pub const WORKER: &str = "worker";
pub const DOLPHIN: &str = "dolphin";

/// Source of per-table repositories
pub trait RepositoryProvider {
    fn entity<R: TableRow>(&self) -> Arc<dyn EntityRepository<R>>;

    fn merchants(&self) -> Arc<dyn MerchantRepository>;
}

/// Postgres-backed repositories sharing one pool
#[derive(Clone)]
pub struct PgRepositories {
    pool: DbPool,
}

impl PgRepositories {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RepositoryProvider for PgRepositories {
    fn entity<R: TableRow>(&self) -> Arc<dyn EntityRepository<R>> {
        Arc::new(PgTableRepository::<R>::new(self.pool.clone()))
    }

    fn merchants(&self) -> Arc<dyn MerchantRepository> {
        Arc::new(PgMerchantRepository::new(self.pool.clone()))
    }
}

/// Outbound collaborators shared by the handlers
#[derive(Clone)]
pub struct Services {
    pub publisher: Arc<dyn Publisher>,
    pub activity: Arc<dyn ActivityService>,
    pub dolphin: Arc<dyn DolphinService>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub usecases: Arc<dyn WorkerUsecases>,
}

/// Everything needed to start one consumer group
pub struct Pipeline {
    pub name: &'static str,
    pub brokers: String,
    pub group_id: String,
    pub topics: Vec<String>,
    pub router: Arc<TopicRouter>,
}

fn cdc<E, P>(repos: &P) -> Arc<dyn MessageHandler>
where
    E: CdcEntity,
    E::Row: TableRow,
    P: RepositoryProvider,
{
    Arc::new(CdcHandler::<E>::new(repos.entity::<E::Row>()))
}

pub fn shark_router<P: RepositoryProvider>(topics: &SharkTopics, repos: &P) -> TopicRouter {
    TopicRouter::new()
        .route(&topics.account, cdc::<SharkAccount, _>(repos))
        .route(&topics.account_contact, cdc::<SharkAccountContact, _>(repos))
        .route(&topics.account_temporary, cdc::<SharkAccountTemporary, _>(repos))
        .route(&topics.contact, cdc::<SharkContact, _>(repos))
        .route(&topics.address, cdc::<SharkAddress, _>(repos))
        .route(&topics.phone, cdc::<SharkPhone, _>(repos))
        .route(&topics.document, cdc::<SharkDocument, _>(repos))
        .route(&topics.contact_npwp, cdc::<SharkContactNpwp, _>(repos))
        .route(&topics.contact_address, cdc::<SharkContactAddress, _>(repos))
        .route(&topics.contact_temp, cdc::<SharkContactTemp, _>(repos))
        .route(&topics.leads, cdc::<SharkLeads, _>(repos))
}

pub fn cdc_router<P: RepositoryProvider>(topics: &CdcTopics, repos: &P) -> TopicRouter {
    TopicRouter::new()
        .route(&topics.merchant, cdc::<SharkMerchant, _>(repos))
        .route(&topics.merchant_document, cdc::<SharkMerchantDocument, _>(repos))
        .route(&topics.merchant_bank, cdc::<SharkMerchantBank, _>(repos))
        .route(&topics.shipping_address, cdc::<SharkShippingAddress, _>(repos))
        .route(&topics.contact_document, cdc::<SharkContactDocument, _>(repos))
}

/// The merchant route only exists when GWS merchant sync is enabled.
pub fn gws_router<P: RepositoryProvider>(topics: &GwsTopics, repos: &P, services: &Services) -> TopicRouter {
    let mut router = TopicRouter::new().route(
        &topics.merchant_bank,
        Arc::new(GwsMerchantBankHandler::new(repos.entity())),
    );

    if topics.sync_merchant {
        router = router.route(
            &topics.merchant,
            Arc::new(GwsMerchantHandler::new(
                repos.merchants(),
                Arc::clone(&services.publisher),
                &topics.merchant_republish,
                Arc::clone(&services.activity),
                Arc::clone(&services.tokens),
            )),
        );
    }

    router
}

pub fn worker_router(topics: &WorkerTopics, services: &Services) -> TopicRouter {
    TopicRouter::new().route(
        &topics.worker,
        Arc::new(WorkerHandler::new(Arc::clone(&services.usecases))),
    )
}

pub fn dolphin_router<P: RepositoryProvider>(topics: &DolphinTopics, repos: &P, services: &Services) -> TopicRouter {
    TopicRouter::new().route(
        &topics.member,
        Arc::new(DolphinHandler::new(Arc::clone(&services.dolphin), repos.entity())),
    )
}

/// All pipelines that should run under this configuration. The dolphin
/// pipeline is skipped unless enabled.
pub fn build_pipelines<P: RepositoryProvider>(
    kafka: &KafkaConfig,
    topics: &TopicRegistry,
    repos: &P,
    services: &Services,
) -> Vec<Pipeline> {
    let brokers = kafka.brokers();

    let mut pipelines = vec![
        Pipeline {
            name: SHARK,
            brokers: brokers.clone(),
            group_id: kafka.group_shark.clone(),
            topics: topics.shark.subscriptions(),
            router: Arc::new(shark_router(&topics.shark, repos)),
        },
        Pipeline {
            name: CDC,
            brokers: kafka.cdc_broker.clone(),
            group_id: kafka.group_cdc.clone(),
            topics: topics.cdc.subscriptions(),
            router: Arc::new(cdc_router(&topics.cdc, repos)),
        },
        Pipeline {
            name: GWS,
            brokers: brokers.clone(),
            group_id: kafka.group_gws.clone(),
            topics: topics.gws.subscriptions(),
            router: Arc::new(gws_router(&topics.gws, repos, services)),
        },
        Pipeline {
            name: WORKER,
            brokers: brokers.clone(),
            group_id: kafka.group_worker.clone(),
            topics: topics.worker.subscriptions(),
            router: Arc::new(worker_router(&topics.worker, services)),
        },
    ];

    if topics.dolphin.enabled {
        pipelines.push(Pipeline {
            name: DOLPHIN,
            brokers,
            group_id: kafka.group_dolphin.clone(),
            topics: topics.dolphin.subscriptions(),
            router: Arc::new(dolphin_router(&topics.dolphin, repos, services)),
        });
    }

    pipelines
}
