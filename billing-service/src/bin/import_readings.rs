use anyhow::{bail, Result};
use billing_service::{
    auth::{Principal, Role, RoleSet},
    config::AppConfig,
    import::{csv_rows, import_readings},
    observability, store,
};
use std::{env, path::PathBuf};

/// Submit readings from a CSV file through the normal validation path.
///
/// Usage:
///   import_readings <csv_file_path>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_readings <csv_file_path>");
    }
    let file_path = PathBuf::from(&args[1]);

    // BILLING_CONFIG can point at an import-specific file.
    let cfg = AppConfig::load()?;
    let store = store::open_store(&cfg.store).await?;

    let caller = Principal {
        name: "import_readings".to_string(),
        roles: RoleSet::of(&[Role::User]),
    };

    let summary = import_readings(store.as_ref(), &caller, csv_rows(file_path)).await?;

    println!(
        "accepted={} rejected={} malformed={}",
        summary.accepted, summary.rejected, summary.malformed
    );

    Ok(())
}
