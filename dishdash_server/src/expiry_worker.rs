use chrono::Duration;
use dishdash_engine::{db_types::AvailabilityRequest, AvailabilityApi, NotificationFabric, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the availability expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    fabric: NotificationFabric,
    timeout: Duration,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = AvailabilityApi::new(db, fabric);
        info!("🕰️ Availability expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running availability expiry job");
            match api.expire_stale_requests(timeout).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} availability requests expired", expired.len());
                    debug!("🕰️ Expired requests: {}", request_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running availability expiry job: {e}");
                },
            }
        }
    })
}

fn request_list(requests: &[AvailabilityRequest]) -> String {
    requests
        .iter()
        .map(|r| format!("[{}] customer: {} restaurant: {}", r.id, r.customer_id, r.restaurant_id))
        .collect::<Vec<String>>()
        .join(", ")
}
