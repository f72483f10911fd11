mod connection;
mod info;
mod models;
mod poll;

use clap::{Parser, Subcommand};

pub use self::{connection::ConnectionArgs, info::InfoArgs, models::ModelsArgs, poll::PollArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: poll the device and render its sensors after every cycle.
    #[clap(name = "poll")]
    Poll(Box<PollArgs>),

    /// List the models advertised by the device.
    #[clap(name = "models")]
    Models(Box<ModelsArgs>),

    /// Show the device identification.
    #[clap(name = "info")]
    Info(Box<InfoArgs>),
}
