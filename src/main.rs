//! user-sync - Kafka ingestion pipelines for the user-service
//!
//! Consumes Shark and merchant CDC streams, GWS merchant events, worker jobs
//! and member events, and writes them into the user-service Postgres tables.

use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use user_sync::db::{self, DbPool};
use user_sync::kafka::config::{consumer_config, producer_config};
use user_sync::kafka::{
    ConsumerGroupRunner, DeadLetterSink, KafkaDeadLetterSink, KafkaPartitionSource, KafkaPublisher,
};
use user_sync::logging;
use user_sync::pipeline::{build_pipelines, PgRepositories, RepositoryProvider, Services};
use user_sync::services::{
    self, HttpActivityService, HttpDolphinService, RepositoryWorkerUsecases, RsaTokenGenerator,
};
use user_sync::{Config, Error};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = format!("{:#}", e), error_kind = error_kind(&e), "user-sync failed");
        eprintln!("user-sync failed: {:#}", e);
        std::process::exit(1);
    }
}

/// `Error::kind()` of the underlying failure, looking through any context
fn error_kind(error: &anyhow::Error) -> &'static str {
    error.downcast_ref::<Error>().map(Error::kind).unwrap_or("internal_error")
}

async fn run() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration from environment")?;

    // Validate configuration
    config.validate().context("Invalid configuration")?;

    // Initialize logging/tracing
    logging::init_tracing(&config.service)?;

    // Log configuration (with sensitive data masked)
    config.log_config();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting user-sync");

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db::health_check(&pool).await.context("Postgres health check failed")?;
    if config.database.run_migrations {
        migrate(&pool).await?;
    }

    let tokens = Arc::new(RsaTokenGenerator::from_file(
        &config.services.private_key_path,
        &config.services.token_issuer,
        config.services.token_ttl_secs,
    )
    .with_context(|| format!("Failed to load signing key {}", config.services.private_key_path))?);
    let http = services::http_client(config.services.http_timeout())?;
    let publisher = KafkaPublisher::new(producer_config(&config.kafka.brokers()))
        .context("Failed to create Kafka producer")?;

    let repos = PgRepositories::new(pool);
    let dolphin = Arc::new(HttpDolphinService::new(
        http.clone(),
        &config.services.dolphin_url,
        &config.services.dolphin_api_key,
    ));
    let usecases = Arc::new(RepositoryWorkerUsecases::new(
        repos.merchants(),
        dolphin.clone(),
        repos.entity(),
    ));
    let services = Services {
        publisher: Arc::new(publisher.clone()),
        activity: Arc::new(HttpActivityService::new(http, &config.services.activity_url)),
        dolphin,
        tokens,
        usecases,
    };

    let dead_letter: Option<Arc<dyn DeadLetterSink>> = config.kafka.dead_letter_topic().map(|topic| {
        info!(topic = topic, "Dead-letter topic enabled");
        Arc::new(KafkaDeadLetterSink::new(publisher.clone(), topic)) as Arc<dyn DeadLetterSink>
    });

    let mut runners = JoinSet::new();
    for pipeline in build_pipelines(&config.kafka, &config.topics, &repos, &services) {
        let source = KafkaPartitionSource::new(
            pipeline.name,
            consumer_config(&config.kafka, &pipeline.brokers, &pipeline.group_id),
            &pipeline.topics,
            config.kafka.partition_buffer,
        )
        .with_context(|| format!("Failed to start {} pipeline", pipeline.name))?;

        info!(
            pipeline = pipeline.name,
            group_id = %pipeline.group_id,
            routes = ?pipeline.router.topics(),
            "Pipeline started"
        );
        let runner = ConsumerGroupRunner::new(pipeline.name, source, pipeline.router, dead_letter.clone());
        runners.spawn(runner.run());
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, exiting");
            publisher.flush();
            std::process::exit(1);
        },
        _ = drain(&mut runners) => {
            info!("All pipelines stopped");
        },
    }

    publisher.flush();
    info!("user-sync shutdown complete");
    Ok(())
}

async fn migrate(pool: &DbPool) -> anyhow::Result<()> {
    db::run_migrations(pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations applied");
    Ok(())
}

async fn drain(runners: &mut JoinSet<user_sync::RunnerState>) {
    while let Some(result) = runners.join_next().await {
        match result {
            Ok(state) => info!(state = ?state, "Pipeline runner finished"),
            Err(e) => error!(error = %e, "Pipeline runner panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_survives_context() {
        let error = anyhow::Error::from(Error::config("KAFKA_BHINNEKA_BROKER_1 missing"))
            .context("Failed to load configuration from environment");
        assert_eq!(error_kind(&error), "configuration_error");
        assert!(format!("{:#}", error).contains("KAFKA_BHINNEKA_BROKER_1 missing"));

        let other = anyhow::anyhow!("signal handler failed");
        assert_eq!(error_kind(&other), "internal_error");
    }
}
