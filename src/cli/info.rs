use clap::Parser;

use crate::{cli::connection::ConnectionArgs, prelude::*, tables::build_device_table};

#[derive(Parser)]
pub struct InfoArgs {
    #[clap(flatten)]
    connection: ConnectionArgs,
}

impl InfoArgs {
    pub async fn run(self) -> Result {
        let client = self.connection.client()?;
        let info = client.read_device_info().await.context("failed to read the device info")?;
        client.close().await;
        println!("{}", build_device_table(&info));
        Ok(())
    }
}
