//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        tts::parse_voice, OpenAiArtifactAdapter, OpenAiExplanationAdapter, OpenAiQuizAdapter,
        OpenAiRoleplayAdapter, OpenAiSstAdapter, OpenAiTtsAdapter, OpenAiVerificationAdapter,
    },
    config::{Config, ConfigError},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use std::sync::Arc;
use study_assistant_core::{AssistantConfig, StudyAssistant, StudyServices};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(config.require_openai_key()?);
    let openai_client = Client::with_config(openai_config);

    let sst_adapter = Arc::new(OpenAiSstAdapter::new(
        openai_client.clone(),
        config.sst_model.clone(),
    ));

    let tts_voice = parse_voice(&config.tts_voice).ok_or_else(|| {
        ConfigError::InvalidValue(
            "TTS_VOICE".to_string(),
            format!("'{}' is not a known voice", config.tts_voice),
        )
    })?;
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        openai_client.clone(),
        SpeechModel::Tts1,
        tts_voice,
    ));

    let services = StudyServices {
        explainer: Arc::new(OpenAiExplanationAdapter::new(
            openai_client.clone(),
            config.explain_model.clone(),
        )),
        artifacts: Arc::new(OpenAiArtifactAdapter::new(
            openai_client.clone(),
            config.artifact_model.clone(),
        )),
        verifier: Arc::new(OpenAiVerificationAdapter::new(
            openai_client.clone(),
            config.verify_model.clone(),
        )),
        quizzes: Arc::new(OpenAiQuizAdapter::new(
            openai_client.clone(),
            config.quiz_model.clone(),
        )),
        roleplay: Arc::new(OpenAiRoleplayAdapter::new(
            openai_client.clone(),
            config.roleplay_model.clone(),
            sst_adapter,
        )),
    };

    // --- 3. Build the Shared AppState ---
    let assistant = Arc::new(StudyAssistant::new(
        services,
        AssistantConfig {
            auto_verify_on_query: config.auto_verify_on_query,
        },
    ));
    let app_state = Arc::new(AppState {
        assistant,
        tts_adapter,
    });

    // --- 4. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
