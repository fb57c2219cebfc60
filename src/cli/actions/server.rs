use crate::api;
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, globals } => {
            // Reject malformed DSNs before the pool ever dials out
            let dsn = Url::parse(&dsn).context("Invalid database DSN")?;

            api::new(port, dsn.to_string(), &globals).await?;
        }
    }

    Ok(())
}
