use dao_server::{print_banner, Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    if config.is_production() {
        dao_server::init_logger_with_file(None, Some(&format!("{}/logs", config.work_dir)));
    } else {
        dao_server::init_logger();
    }

    print_banner();
    tracing::info!(port = config.http_port, "DAO server starting...");

    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
