mod cli;
mod infra;
mod routes;
mod scheduler;
mod server;
mod sweep;

use shelter_bot::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
