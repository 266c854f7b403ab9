//! Background scheduled tasks for the application.
//!
//! The only recurring job is the reservation sweeper: abandoned
//! `reserved`/`waiting_payment` gifts past the configured deadline go back
//! on sale. Call `spawn_all` once during startup to launch it.

use crate::services::GiftService;

/// Spawn all background tasks.
///
/// Notes
/// - The sweeper update is status-conditioned and therefore idempotent; a
///   payment confirmation racing the sweeper resolves at the store.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(gift_service: GiftService, reservation_ttl_minutes: i64) {
    // 每分钟释放超时未支付的预订
    {
        let svc = gift_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.release_stale(reservation_ttl_minutes).await {
                    Ok(n) if n > 0 => log::info!("Released {n} stale gift reservations"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to release stale reservations: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }
}
