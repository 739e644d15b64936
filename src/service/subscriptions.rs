// service/subscriptions.rs
use std::sync::Arc;
use std::time::Duration;

use crate::db::db::DBClient;
use crate::db::membershipdb::MembershipExt;

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Background sweep that expires memberships whose subscription window has
/// lapsed. Runs once at startup and then daily. The status flip only moves
/// `active` rows to `expired`; suspended or cancelled memberships are not
/// touched.
pub fn start_membership_expiry_sweep(db_client: Arc<DBClient>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            match db_client.expire_lapsed_memberships().await {
                Ok(0) => {
                    tracing::debug!("Membership expiry sweep: nothing to expire");
                }
                Ok(count) => {
                    tracing::info!("Membership expiry sweep expired {} membership(s)", count);
                }
                Err(e) => {
                    tracing::error!("Membership expiry sweep failed: {}", e);
                }
            }
        }
    });
}
