use cart_api::migrator::{run_migration, Migrator};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Applies (default) or rolls back the schema.
///
/// Usage: `migration [up|down|status]`. The database URL comes from
/// `DATABASE_URL`, falling back to the loaded application config.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cart_api::config::init_tracing("info", false);

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => cart_api::config::load_config()?.database_url,
    };
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    match command.as_str() {
        "up" => run_migration(&database_url).await?,
        "down" => {
            let db = Database::connect(database_url.as_str()).await?;
            info!("Rolling back the most recent migration");
            Migrator::down(&db, Some(1)).await?;
        }
        "status" => {
            let db = Database::connect(database_url.as_str()).await?;
            Migrator::status(&db).await?;
        }
        other => anyhow::bail!("unknown command '{other}', expected up, down or status"),
    }

    Ok(())
}
