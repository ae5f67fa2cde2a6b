use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAlertPublisher, InMemoryAssessmentRepository};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rcsa::config::AppConfig;
use rcsa::error::AppError;
use rcsa::telemetry;
use rcsa::workflows::assessment::AssessmentService;
use rcsa::workflows::library::ControlLibrary;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let library = match args.control_library.take() {
        Some(path) => {
            let library = ControlLibrary::from_path(&path)?;
            info!(path = %path.display(), controls = library.entries().len(), "control library loaded");
            library
        }
        None => ControlLibrary::standard(),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let assessment_service = Arc::new(AssessmentService::with_library(
        repository,
        alerts,
        config.appetite.risk_appetite(),
        library,
    ));

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        appetite_threshold = config.appetite.threshold,
        "rcsa workbench ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
