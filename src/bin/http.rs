#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use shop_scheduler::{QueueStore, SchedulerConfig, http_api, load_scheduler, logging};

    logging::init();

    let addr: SocketAddr = std::env::var("SHOP_SCHEDULER_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let config = SchedulerConfig::from_env()?;

    #[cfg(feature = "sqlite")]
    let store: Arc<dyn QueueStore> = {
        let db_path = std::env::var("SHOP_SCHEDULER_DB")
            .unwrap_or_else(|_| "shop_scheduler.db".to_string());
        Arc::new(shop_scheduler::SqliteQueueStore::new(db_path)?)
    };
    #[cfg(not(feature = "sqlite"))]
    let store: Arc<dyn QueueStore> = {
        let json_path = std::env::var("SHOP_SCHEDULER_JSON")
            .unwrap_or_else(|_| "shop_scheduler.json".to_string());
        Arc::new(shop_scheduler::JsonQueueStore::new(json_path))
    };

    let scheduler = load_scheduler(config, store.as_ref(), None)?;
    println!("shop-scheduler HTTP API listening on http://{addr}");
    http_api::serve(addr, scheduler, store).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
