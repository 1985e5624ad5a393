//! Binary entry: arguments, configuration, logging, wiring and shutdown

use crate::app::cli::{Args, Command, ServiceConfig};
use crate::app::grace_timer::GraceTimer;
use crate::app::server::{QueueServer, ServerContext, ServerError};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version;
use crate::notifications::api::{shared_broadcaster, EventDispatcher};
use crate::queue::api::QueueCoordinator;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::sync::mpsc;

/// Initialize application startup
pub fn startup() -> ExitCode {
    let args = Args::parse_from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(args))
}

async fn run(args: Args) -> ExitCode {
    // Config is read before logging starts so the [logging] table applies;
    // a load failure is reported once the logger is up.
    let (mut config, config_path, load_error) =
        match ServiceConfig::load(args.config_file.as_deref()).await {
            Ok((config, path)) => (config, path, None),
            Err(e) => (ServiceConfig::default(), None, Some(e)),
        };
    config.apply_args(&args);

    let log_file = config
        .logging
        .file
        .as_ref()
        .map(|p| p.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        config.logging.level.as_deref(),
        config.logging.format.as_deref(),
        log_file.as_deref(),
        args.use_color(),
    ) {
        eprintln!("Error: cannot initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Some(e) = load_error {
        log_error_with_context(&e, "Loading configuration");
        return ExitCode::FAILURE;
    }
    if let Err(e) = config.validate() {
        log_error_with_context(&e, "Validating configuration");
        return ExitCode::FAILURE;
    }
    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            log_error_with_context(&e, "Resolving bind address");
            return ExitCode::FAILURE;
        }
    };

    match &args.command {
        Command::CheckConfig(_) => print_config(&config, config_path.as_deref()),
        Command::Serve(_) => {
            log::info!(
                "waitline {} (protocol {}, {} {})",
                version::package_version(),
                version::protocol_version(),
                version::git_hash(),
                version::build_time()
            );
            if let Some(path) = &config_path {
                log::info!("Using configuration {}", path.display());
            }

            match serve(config, addr).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log_error_with_context(&e, "Running server");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn print_config(config: &ServiceConfig, path: Option<&std::path::Path>) -> ExitCode {
    use colored::Colorize;

    match config.to_toml_string() {
        Ok(rendered) => {
            let source = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            println!("{}", format!("# Effective configuration ({source})").dimmed());
            print!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_error_with_context(&e, "Rendering configuration");
            ExitCode::FAILURE
        }
    }
}

/// Wire the core to the transport and run until shutdown
async fn serve(config: ServiceConfig, addr: SocketAddr) -> Result<(), ServerError> {
    ShutdownCoordinator::guard_with_coordinator(|shutdown, _shutdown_rx| async move {
        let (coordinator, events) = QueueCoordinator::create(config.queue_settings());
        let broadcaster = shared_broadcaster();

        let (grace_tx, grace_rx) = mpsc::unbounded_channel();
        let dispatcher = EventDispatcher::new(broadcaster.clone())
            .with_tap(grace_tx)
            .spawn(events, shutdown.subscribe());
        let grace_timer = GraceTimer::new(coordinator.clone(), config.grace_period())
            .spawn(grace_rx, shutdown.subscribe());

        let context = ServerContext {
            coordinator,
            broadcaster,
        };
        let result = match QueueServer::bind(addr, context, shutdown.clone()).await {
            Ok(server) => {
                log::info!(
                    "Grace period {}s, max party {}, {} min per party",
                    config.grace_period_secs,
                    config.max_party_size,
                    config.minutes_per_party
                );
                server.run().await
            }
            Err(e) => Err(e),
        };

        // Stop the background tasks even if the server failed
        shutdown.trigger_shutdown();
        for (name, task) in [("dispatcher", dispatcher), ("grace timer", grace_timer)] {
            if let Err(e) = task.await {
                log::warn!("{name} task ended abnormally: {e}");
            }
        }

        log::info!("Shutdown complete");
        result
    })
    .await
}
