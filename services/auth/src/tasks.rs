//! Background loops started by the binary.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::state::AppState;
use crate::usecase::outbox::OutboxRelay;
use crate::usecase::verification::SweepExpiredCodesUseCase;

/// Periodically move overdue PENDING codes to EXPIRED.
pub fn spawn_code_sweeper(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let usecase = SweepExpiredCodesUseCase {
            codes: state.verification_code_repo(),
        };
        loop {
            ticker.tick().await;
            if let Err(e) = usecase.execute(Utc::now()).await {
                tracing::error!(error = ?e, "verification code sweep failed");
            }
        }
    })
}

/// Periodically hand undelivered outbox events to the mailer.
pub fn spawn_outbox_relay(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let relay = OutboxRelay {
            outbox: state.outbox_repo(),
            mailer: state.mailer(),
        };
        loop {
            ticker.tick().await;
            match relay.run_once().await {
                Ok(report) if report.delivered + report.failed > 0 => {
                    tracing::info!(delivered = report.delivered, failed = report.failed, "outbox relay pass");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "outbox relay pass failed"),
            }
        }
    })
}
