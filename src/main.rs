use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use quire::{
    application::{
        error::AppError,
        groups::{CreateGroupCommand, GroupService},
    },
    config::{self, GroupCommand, GroupCreateArgs},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpOptions, HttpState},
        memory::MemoryRepositories,
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
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

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Group(args) => match args.command {
            GroupCommand::Create(create) => run_group_create(settings, create).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let uploads = UploadStorage::new(settings.uploads.directory.clone()).map_err(InfraError::from)?;
    let uploads = Arc::new(uploads);
    let options = HttpOptions::from_settings(&settings);

    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repos = Arc::new(init_repositories(url, &settings).await?);
            HttpState::new(repos.clone(), uploads, options).with_database(repos)
        }
        None => {
            warn!(
                target = "quire::serve",
                "no database url configured; serving from in-memory storage"
            );
            HttpState::new(Arc::new(MemoryRepositories::new()), uploads, options)
        }
    };

    serve_http(&settings, http::build_router(state)).await
}

async fn init_repositories(
    database_url: &str,
    settings: &config::Settings,
) -> Result<PostgresRepositories, AppError> {
    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PostgresRepositories::new(pool))
}

async fn run_group_create(
    settings: config::Settings,
    args: GroupCreateArgs,
) -> Result<(), AppError> {
    let database_url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::validation(
            "database url is required (provide --database-url or set QUIRE__DATABASE__URL)",
        )
    })?;
    let repos = Arc::new(init_repositories(database_url, &settings).await?);

    let service = GroupService::new(repos);
    let group = service
        .create_group(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    println!("created group `{}` (/group/{}/)", group.title, group.slug);
    Ok(())
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "quire::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        },
    );
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return server_result(joined),
        _ = signalled_rx => {}
    }

    let grace: Duration = settings.server.graceful_shutdown;
    info!(
        target = "quire::serve",
        grace_seconds = grace.as_secs(),
        "shutting down, draining connections"
    );
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "quire::serve",
                "graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(InfraError::server(err.to_string()).into()),
        Err(err) => Err(InfraError::server(format!("server task failed: {err}")).into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "quire::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "quire::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
