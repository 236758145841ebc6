//! Discovery and filtering of live sessions.
//!
//! A refresh lists every session id the ledger knows, resolves each to a
//! summary concurrently, and keeps them in discovery order. One session
//! failing to resolve is skipped for that refresh; it never blanks the
//! rest of the catalog.

use crate::gateway::{
    GatewayResult,
    LedgerGateway,
};
use crate::types::{
    Address,
    SessionId,
    SessionStatus,
    SessionSummary,
};
use futures::future::join_all;
use itertools::Itertools;
use tracing::{
    debug,
    warn,
};

/// A session is visible to an actor iff anyone may still join it, or the
/// actor is playing in it. Finished sessions are never shown.
pub fn is_visible(summary: &SessionSummary, actor: Address) -> bool {
    match summary.status {
        SessionStatus::Waiting => true,
        SessionStatus::InProgress => summary.is_participant(actor),
        SessionStatus::Finished => false,
    }
}

pub struct SessionCatalog<G> {
    gateway: G,
    entries: Vec<SessionSummary>,
}

impl<G: LedgerGateway> SessionCatalog<G> {
    pub fn new(gateway: G) -> Self {
        SessionCatalog {
            gateway,
            entries: Vec::new(),
        }
    }

    /// All summaries from the last successful refresh, discovery order.
    pub fn entries(&self) -> &[SessionSummary] {
        &self.entries
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionSummary> {
        self.entries.iter().find(|s| s.id == id)
    }

    /// The catalog as one actor sees it.
    pub fn visible_for(&self, actor: Address) -> Vec<&SessionSummary> {
        self.entries
            .iter()
            .filter(|s| is_visible(s, actor))
            .collect()
    }

    /// Re-fetch the roster. Fails only if the id listing itself fails, in
    /// which case the previous entries are retained; individual summary
    /// failures drop just that session from this refresh.
    pub async fn refresh(&mut self) -> GatewayResult<()> {
        let ids = self.gateway.list_sessions().await?;

        let unique: Vec<SessionId> = ids.into_iter().unique().collect();

        let summaries = join_all(
            unique
                .iter()
                .map(|id| self.gateway.session_summary(*id)),
        )
        .await;

        let mut entries = Vec::with_capacity(unique.len());
        for (id, result) in unique.iter().zip(summaries) {
            match result {
                Ok(summary) => entries.push(summary),
                Err(err) => {
                    warn!(session = %id, error = %err, "skipping unresolvable session");
                }
            }
        }
        debug!(total = entries.len(), "catalog refreshed");
        self.entries = entries;
        Ok(())
    }
}
