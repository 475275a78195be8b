//! Superficie de línea de comandos del cliente.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "siphon", version, about = "Cliente ETL: descubre trabajo, extrae, transforma y drena")]
pub struct Cli {
    /// Ruta del archivo de configuración TOML.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Aumenta la verbosidad (-v = debug, -vv = trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ejecuta todos los protocolos configurados.
    Run,
}
