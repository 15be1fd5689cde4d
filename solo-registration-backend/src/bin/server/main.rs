mod telemetry;

use solo_registration_backend::error::AppError;
use solo_registration_backend::{run_server, MyState};
use solo_registration_config::get_config;
use solo_registration_database::memory::MemoryGateway;
use solo_registration_database::postgres::PgGateway;
use tracing::{info, warn};

use crate::telemetry::setup_telemetry;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_telemetry();

    let config = get_config()?;
    info!("starting with {config:?}");

    match config.database_url() {
        Some(database_url) => {
            let gateway = PgGateway::connect(database_url)?;
            run_server(MyState::new(gateway, &config), config.listen)
                .await?
                .await
        }
        None => {
            warn!("no database_url configured, serving read-only demo data");
            let gateway = MemoryGateway::demo(config.default_max_slots);
            run_server(MyState::new(gateway, &config), config.listen)
                .await?
                .await
        }
    }
}
