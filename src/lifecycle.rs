//! Creating and joining sessions.
//!
//! Both operations are fire-and-forget with respect to confirmation: the
//! returned [`ViewTransition`] is a navigation hint the interaction layer
//! may act on immediately, and the authoritative result arrives later
//! through the catalog and the session mirror.

use crate::gateway::{
    GatewayError,
    LedgerGateway,
};
use crate::types::{
    Address,
    SessionId,
    StakeError,
    parse_stake,
};
use thiserror::Error;
use tracing::info;

/// What the interaction layer should do next. Purely optimistic: acting on
/// it does not imply the submission confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    /// Creation was submitted; dismiss the stake-entry affordance. The new
    /// session surfaces through catalog discovery once confirmed.
    CloseCreateForm,
    /// Join was submitted; show this session's board.
    OpenBoard(SessionId),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Stake(#[from] StakeError),
    #[error("cannot join a session you created")]
    SelfJoin,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct SessionLifecycleController<G> {
    gateway: G,
}

impl<G: LedgerGateway> SessionLifecycleController<G> {
    pub fn new(gateway: G) -> Self {
        SessionLifecycleController { gateway }
    }

    /// Validate the stake string and submit a new session. Does not wait
    /// for confirmation and does not learn the new session's id; that is
    /// the catalog's job on its next refresh.
    pub async fn create(
        &self,
        stake: &str,
        actor: Address,
    ) -> Result<ViewTransition, LifecycleError> {
        let value = parse_stake(stake)?;
        let receipt = self.gateway.submit_create(actor, value).await?;
        info!(%actor, stake = %stake, %receipt, "session creation submitted");
        Ok(ViewTransition::CloseCreateForm)
    }

    /// Validate and submit a join for an existing session. Rejects joining
    /// a session the actor created before any gateway write is issued.
    pub async fn join(
        &self,
        id: SessionId,
        stake: &str,
        actor: Address,
    ) -> Result<ViewTransition, LifecycleError> {
        let value = parse_stake(stake)?;
        let summary = self.gateway.session_summary(id).await?;
        if summary.player1 == actor {
            return Err(LifecycleError::SelfJoin);
        }
        let receipt = self.gateway.submit_join(id, actor, value).await?;
        info!(session = %id, %actor, stake = %stake, %receipt, "join submitted");
        Ok(ViewTransition::OpenBoard(id))
    }
}
