use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Router};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use santa_core::{AssignmentDocument, GiftLimit};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub mod config;
pub mod error;
pub mod mail;
pub mod store;
pub mod views;

use config::Config;
use error::AppError;
use mail::{notifier_from_config, notify_best_effort, Notification, Notifier};
use store::{DocumentStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            notifier,
        }
    }

    pub async fn from_config(config: Config) -> Result<Self, StoreError> {
        let store = store::connect(&config).await?;
        if let Err(err) = store
            .initialize(&config.participants, GiftLimit::default())
            .await
        {
            error!("failed to initialize assignment document: {err}");
        }

        let notifier = notifier_from_config(config.mail.as_ref());
        Ok(Self::new(config, store, notifier))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/", get(home))
        .route("/result", post(reveal))
        .route("/admin", get(admin_form).post(update_assignments))
        .route("/healthz", get(healthz))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let document = state.store.load().await;
    Html(views::index(
        &state.config.participants,
        &document.gift_limit,
        &state.config.currency,
    ))
}

// Missing fields fall through to the plain-text errors below.
#[derive(Deserialize)]
struct RevealForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

async fn reveal(
    State(state): State<AppState>,
    Form(form): Form<RevealForm>,
) -> Result<Html<String>, AppError> {
    let name = form.name.trim();
    let document = state.store.load().await;
    let Some(receiver) = document.receiver_of(name) else {
        info!(participant = %name, "no assignment for requested name");
        return Err(AppError::UnknownParticipant);
    };

    let email = form.email.trim();
    if email.is_empty() {
        debug!(participant = %name, "no email given, skipping notification");
    } else {
        let notification = Notification {
            to: email.to_string(),
            giver: name.to_string(),
            receiver: receiver.to_string(),
            gift_limit: document.gift_limit.clone(),
            currency: state.config.currency.clone(),
        };
        // Outcome is logged inside; the page renders regardless.
        notify_best_effort(
            state.notifier.as_ref(),
            &notification,
            state.config.mail_timeout,
        )
        .await;
    }

    Ok(Html(views::result(
        name,
        receiver,
        &document.gift_limit,
        &state.config.currency,
    )))
}

async fn admin_form() -> Html<String> {
    Html(views::admin())
}

#[derive(Deserialize)]
struct AdminForm {
    #[serde(default)]
    pass: String,
    #[serde(default)]
    limit: String,
    #[serde(default)]
    seed: String,
}

fn parse_seed(raw: &str) -> Result<Option<u64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| AppError::InvalidSeed)
}

async fn update_assignments(
    State(state): State<AppState>,
    Form(form): Form<AdminForm>,
) -> Result<Html<String>, AppError> {
    if form.pass != state.config.admin_password {
        warn!("admin update rejected: wrong password");
        return Err(AppError::WrongPassword);
    }

    let limit = form.limit.trim();
    if limit.is_empty() {
        return Err(AppError::MissingLimit);
    }

    let mut rng = parse_seed(&form.seed)?
        .map(ChaCha8Rng::seed_from_u64)
        .unwrap_or_else(ChaCha8Rng::from_entropy);
    let document =
        AssignmentDocument::generate(&state.config.participants, GiftLimit::from(limit), &mut rng)?;

    state.store.save(&document).await?;
    info!(limit = %limit, "assignments redrawn");

    Ok(Html(views::admin_updated()))
}
