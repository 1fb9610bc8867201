use std::{process, sync::Arc};

use lightfield::{
    application::{
        auth::{AuthError, AuthService, NewStaffUser, SessionPolicy},
        bookings::BookingPolicy,
    },
    config::{self, LoadError, Settings},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiPolicies, ApiRateLimiter, ApiState},
        payments::{GatewaySettings, HttpPaymentGateway},
        telemetry,
    },
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("could not create staff account: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid setting `{key}`: {reason}")]
    Setting { key: &'static str, reason: String },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &RunError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), RunError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        None | Some(config::Command::Serve(_)) => run_serve(settings).await,
        Some(config::Command::CreateAdmin(args)) => run_create_admin(settings, args).await,
    }
}

async fn connect(settings: &Settings) -> Result<Arc<PostgresRepositories>, RunError> {
    let url = settings.database.url.as_deref().ok_or(RunError::Setting {
        key: "database.url",
        reason: "a database URL is required".into(),
    })?;
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn session_policy(settings: &Settings) -> Result<SessionPolicy, RunError> {
    let convert = |key: &'static str, value: std::time::Duration| {
        time::Duration::try_from(value).map_err(|err| RunError::Setting {
            key,
            reason: err.to_string(),
        })
    };
    Ok(SessionPolicy {
        access_ttl: convert("auth.access_ttl_seconds", settings.auth.access_ttl)?,
        refresh_ttl: convert("auth.refresh_ttl_seconds", settings.auth.refresh_ttl)?,
    })
}

async fn run_serve(settings: Settings) -> Result<(), RunError> {
    let repositories = connect(&settings).await?;

    let gateway = HttpPaymentGateway::new(GatewaySettings {
        base_url: settings.payments.base_url.clone(),
        secret_key: settings.payments.secret_key.clone(),
        callback_url: settings.payments.callback_url.clone(),
        timeout: settings.payments.timeout,
    })?;
    if settings.payments.callback_url.is_none() {
        warn!(
            target = "lightfield::startup",
            "payments.callback_url is not set; checkout will not redirect back"
        );
    }

    let rate_limiter = ApiRateLimiter::new(
        std::time::Duration::from_secs(u64::from(settings.api_rate_limit.window_seconds.get())),
        settings.api_rate_limit.max_requests.get(),
    )
    .trusting_forwarded_for(settings.api_rate_limit.trust_forwarded_for);
    let state = ApiState::assemble(
        repositories,
        Arc::new(gateway),
        ApiPolicies {
            session: session_policy(&settings)?,
            booking: BookingPolicy {
                default_fee: settings.bookings.default_fee,
            },
        },
        rate_limiter,
    );

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "lightfield::startup",
        addr = %settings.server.addr,
        "HTTP API listening"
    );

    http::serve(
        listener,
        http::build_router(state),
        settings.server.graceful_shutdown,
    )
    .await
    .map_err(InfraError::from)?;

    info!(target = "lightfield::startup", "Server stopped");
    Ok(())
}

async fn run_create_admin(
    settings: Settings,
    args: config::CreateAdminArgs,
) -> Result<(), RunError> {
    let repositories = connect(&settings).await?;
    let auth = AuthService::new(
        repositories.clone(),
        repositories,
        session_policy(&settings)?,
    );
    let user = auth
        .create_staff_user(NewStaffUser {
            username: args.username,
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            password: args.password,
            is_superuser: args.superuser,
        })
        .await?;

    info!(
        target = "lightfield::startup",
        username = %user.username,
        superuser = user.is_superuser,
        "Staff account created"
    );
    Ok(())
}
