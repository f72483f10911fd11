use std::sync::Arc;

use clap::Parser;

use crate::{
    cli::connection::{ConnectionArgs, EnabledModelsArgs},
    prelude::*,
    tables::build_models_table,
};

#[derive(Parser)]
pub struct ModelsArgs {
    #[clap(flatten)]
    connection: ConnectionArgs,

    #[clap(flatten)]
    enabled_models: EnabledModelsArgs,
}

impl ModelsArgs {
    pub async fn run(self) -> Result {
        let catalog = Arc::new(self.connection.catalog()?);
        let client = self.connection.client_with(catalog.clone())?;
        let advertised = client.list_models().await.context("failed to list the models")?;
        client.close().await;
        info!(n_models = advertised.len(), "fetched");
        println!(
            "{}",
            build_models_table(&advertised, &self.enabled_models.enabled_models(), &catalog),
        );
        Ok(())
    }
}
