use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    models::{AnalyticsEvent, Medium},
    services::gateway::SearchGateway,
};

/// Records a click without blocking the caller; failures are only logged
pub fn spawn_click(
    gateway: Arc<dyn SearchGateway>,
    medium: Medium,
    user_id: &str,
    doc_id: &str,
) -> JoinHandle<()> {
    spawn_event(gateway, AnalyticsEvent::click(medium, user_id, doc_id))
}

pub fn spawn_event(gateway: Arc<dyn SearchGateway>, event: AnalyticsEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = event.name.clone();
        let doc_id = event.data.doc_id.clone();

        if let Err(e) = gateway.create_event(event).await {
            tracing::warn!(
                error = %e,
                event = %name,
                doc_id = %doc_id,
                "Failed to record analytics event"
            );
        }
    })
}
