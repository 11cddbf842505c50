use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use narvik::application::ports::{JobRepository, ObjectStoreGateway, TranscriptRepository};
use narvik::application::services::{
    AsrHandler, PipelineWorker, TranscodeHandler, UploadOrchestrator, WorkerConfig,
};
use narvik::infrastructure::asr::AsrProviderFactory;
use narvik::infrastructure::media::FfmpegExtractor;
use narvik::infrastructure::observability::{TracingConfig, init_tracing};
use narvik::infrastructure::persistence::{PgJobRepository, PgTranscriptRepository, create_pool};
use narvik::infrastructure::storage::{S3Gateway, S3GatewayConfig};
use narvik::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let settings = Settings::load(environment)?;

    init_tracing(
        TracingConfig::new(
            environment.as_str(),
            settings.logging.enable_json,
            settings.logging.level.clone(),
        ),
        settings.server.port,
    );

    let pool = create_pool(&settings.database.url, settings.database.max_connections).await?;
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database migrations applied");

    let job_repository: Arc<dyn JobRepository> = Arc::new(PgJobRepository::new(pool.clone()));
    let transcript_repository: Arc<dyn TranscriptRepository> =
        Arc::new(PgTranscriptRepository::new(pool));

    let gateway: Arc<dyn ObjectStoreGateway> = Arc::new(S3Gateway::new(S3GatewayConfig {
        bucket: settings.storage.bucket.clone(),
        region: settings.storage.region.clone(),
        access_key: settings.storage.access_key.clone(),
        secret_key: settings.storage.secret_key.clone(),
        endpoint_url: settings.storage.endpoint_url.clone(),
    }));

    let provider = AsrProviderFactory::create(&settings.asr)?;
    let extractor = Arc::new(FfmpegExtractor::new(None));

    let orchestrator = Arc::new(UploadOrchestrator::new(
        Arc::clone(&gateway),
        Arc::clone(&job_repository),
        settings.storage.part_size(),
        settings.storage.part_url_ttl(),
    ));

    let worker_config = WorkerConfig {
        poll_interval: Duration::from_secs(settings.pipeline.poll_interval_secs),
        max_retries: settings.pipeline.max_retries,
        stale_after: Duration::from_secs(settings.pipeline.stale_after_secs),
        claim_batch: settings.pipeline.claim_batch,
    };
    for n in 0..settings.pipeline.workers {
        let worker = PipelineWorker::new(
            Arc::clone(&job_repository),
            TranscodeHandler::new(Arc::clone(&gateway), extractor.clone()),
            AsrHandler::new(
                Arc::clone(&gateway),
                Arc::clone(&provider),
                Arc::clone(&transcript_repository),
                settings.asr.timeout(),
            ),
            worker_config.clone(),
        );
        tracing::info!(worker = n, "Spawning pipeline worker");
        tokio::spawn(worker.run());
    }

    let state = AppState {
        orchestrator,
        job_repository,
        gateway,
        settings: settings.clone(),
    };
    let router = create_router(state);

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
