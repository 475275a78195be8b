//! siphon: binario del cliente ETL.
//!
//! `siphon run` ejecuta todos los protocolos configurados y mapea el
//! desenlace a códigos de salida: 0 éxito completo, 1 error de
//! configuración, 2 fallo parcial (al menos un workflow falló), 130
//! cancelación cooperativa.

mod bootstrap;
mod cli;

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use siphon_adapters::demo_protocol_factory;
use siphon_core::constants::{EXIT_CANCELLED, EXIT_CONFIG_ERROR, EXIT_PARTIAL_FAILURE};
use siphon_core::{run_configured_protocols, AppContext, CoreError, InMemorySignalHub, SignalHub,
                  StaticProtocolRegistry};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    // Variables de entorno locales (.env) antes de leer la configuración.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run => run(&cli).await,
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> i32 {
    let settings = match bootstrap::load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("siphon: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    bootstrap::init_tracing(cli.verbose, &settings.logging);
    bootstrap::warn_unknown_keys(&settings);

    let settings = match bootstrap::initialize(settings) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "configuración inválida");
            return EXIT_CONFIG_ERROR;
        }
    };

    let signals: Arc<dyn SignalHub> = Arc::new(InMemorySignalHub::new());
    let ctx = match AppContext::new(settings, signals) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "configuración inválida");
            return EXIT_CONFIG_ERROR;
        }
    };

    let mut registry = StaticProtocolRegistry::new();
    registry.register("demo", demo_protocol_factory());

    // Cancelación cooperativa: ctrl-c dispara el token; los workflows dejan
    // de extraer chunks nuevos y liberan sus recursos.
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancelación solicitada (ctrl-c)");
            cancel_on_signal.cancel();
        }
    });

    match run_configured_protocols(&ctx, &registry, cancel.clone()).await {
        Ok(summary) => {
            for report in &summary.reports {
                tracing::info!(protocol_id = %report.protocol_id,
                               completed = report.completed_count(),
                               failed = report.failed_count(),
                               errors = report.errors.len(),
                               "resumen de protocolo");
            }
            if cancel.is_cancelled() {
                EXIT_CANCELLED
            } else {
                summary.exit_code()
            }
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "el run no pudo ejecutarse");
            match e {
                CoreError::ImproperlyConfigured(_) => EXIT_CONFIG_ERROR,
                _ => EXIT_PARTIAL_FAILURE,
            }
        }
    }
}
