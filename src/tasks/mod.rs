//! 后台定时任务
//!
//! 启动时调用一次 `spawn_all`。

use crate::services::ShipmentService;

/// 启动所有后台任务，不阻塞
pub fn spawn_all(shipment_service: ShipmentService, shipment_retry_interval_secs: u64) {
    // 补发物流单：付款成功但下单失败的订单
    {
        let svc = shipment_service.clone();
        let interval = std::time::Duration::from_secs(shipment_retry_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match svc.retry_pending_shipments().await {
                    Ok(n) if n > 0 => log::info!("Shipments booked on retry: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to retry pending shipments: {e:?}"),
                }
            }
        });
    }
}
