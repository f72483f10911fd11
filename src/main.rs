#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cache;
mod cli;
mod coordinator;
mod device;
mod entity;
mod modbus;
mod prelude;
mod sunspec;
mod tables;

use clap::{Parser, crate_version};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Poll(args) => args.run().await,
        Command::Models(args) => args.run().await,
        Command::Info(args) => args.run().await,
    }
}
