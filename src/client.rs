use crate::ui;
use color_eyre::eyre::Result;
use gridstake::catalog::SessionCatalog;
use gridstake::ledger::MemoryLedger;
use gridstake::lifecycle::{
    SessionLifecycleController,
    ViewTransition,
};
use gridstake::moves::{
    MoveOutcome,
    OptimisticMoveController,
    ReconcilePolicy,
};
use gridstake::types::{
    Address,
    Board,
    Cell,
    Outcome,
    SessionId,
    SessionStatus,
    format_stake,
};
use std::time::Duration;
use tokio::time;
use tracing::error;

/// The two local demo identities, toggled from the keyboard the way the
/// original switched wallet accounts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ActorKind {
    Alice,
    Bob,
}

impl ActorKind {
    pub fn address(self) -> Address {
        match self {
            ActorKind::Alice => Address([0x11; 20]),
            ActorKind::Bob => Address([0x22; 20]),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActorKind::Alice => "Alice",
            ActorKind::Bob => "Bob",
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct AppConfig {
    pub starting_actor: ActorKind,
    pub tick: Duration,
    pub reconcile: ReconcilePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            starting_actor: ActorKind::Alice,
            tick: Duration::from_millis(1000),
            reconcile: ReconcilePolicy::default(),
        }
    }
}

/// One catalog line as the active actor sees it.
#[derive(Clone, Debug)]
pub struct CatalogRow {
    pub id: SessionId,
    pub stake: String,
    pub status: SessionStatus,
    pub joinable: bool,
    pub yours: bool,
}

#[derive(Clone, Debug)]
pub struct BoardSnapshot {
    pub session: SessionId,
    /// Mirror with the speculative overlay already applied.
    pub board: Board,
    pub local_mark: Option<Cell>,
    pub your_turn: bool,
    pub pending: bool,
    pub game_over: bool,
    pub headline: String,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub actor: ActorKind,
    pub actor_address: Address,
    pub sessions: Vec<CatalogRow>,
    pub board: Option<BoardSnapshot>,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController {
    gateway: MemoryLedger,
    catalog: SessionCatalog<MemoryLedger>,
    lifecycle: SessionLifecycleController<MemoryLedger>,
    game: Option<OptimisticMoveController<MemoryLedger>>,
    actor: ActorKind,
    tick: Duration,
    reconcile: ReconcilePolicy,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    /// Controller backed by the in-process ledger, both demo identities in
    /// one process.
    pub fn new_local(config: AppConfig) -> Self {
        let gateway = MemoryLedger::new();
        AppController {
            catalog: SessionCatalog::new(gateway.clone()),
            lifecycle: SessionLifecycleController::new(gateway.clone()),
            gateway,
            game: None,
            actor: config.starting_actor,
            tick: config.tick,
            reconcile: config.reconcile,
            status: String::from("Ready"),
            errors: Vec::new(),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub async fn snapshot(&mut self) -> Result<AppSnapshot> {
        if let Err(err) = self.catalog.refresh().await {
            self.push_error(format!("catalog refresh failed: {err}"));
        }
        if let Some(game) = &mut self.game {
            if let Err(err) = game.refresh().await {
                let message =
                    format!("refresh of {} failed: {err}", game.session());
                self.push_error(message);
            }
        }

        let actor_address = self.actor.address();
        let sessions = self
            .catalog
            .visible_for(actor_address)
            .into_iter()
            .map(|s| CatalogRow {
                id: s.id,
                stake: format_stake(s.stake),
                status: s.status,
                joinable: s.status == SessionStatus::Waiting
                    && s.player1 != actor_address,
                yours: s.is_participant(actor_address),
            })
            .collect();

        let board = self.game.as_ref().and_then(board_snapshot);

        Ok(AppSnapshot {
            actor: self.actor,
            actor_address,
            sessions,
            board,
            status: self.status.clone(),
            errors: self.errors.iter().rev().take(5).cloned().collect(),
        })
    }

    pub async fn create_session(&mut self, stake: &str) {
        match self.lifecycle.create(stake, self.actor.address()).await {
            Ok(ViewTransition::CloseCreateForm) => {
                self.status = format!("Created session with stake {stake}");
            }
            Ok(other) => {
                self.status = format!("Unexpected transition {other:?}");
            }
            Err(err) => {
                self.status = format!("Create failed: {err}");
                self.push_error(format!("create: {err}"));
            }
        }
    }

    pub async fn join_session(&mut self, id: SessionId) {
        let Some(stake) = self.catalog.get(id).map(|s| format_stake(s.stake)) else {
            self.status = format!("Session {id} is no longer listed");
            return;
        };
        match self.lifecycle.join(id, &stake, self.actor.address()).await {
            Ok(ViewTransition::OpenBoard(id)) => {
                self.status = format!("Joined session {id}");
                self.open_board(id).await;
            }
            Ok(other) => {
                self.status = format!("Unexpected transition {other:?}");
            }
            Err(err) => {
                self.status = format!("Join failed: {err}");
                self.push_error(format!("join {id}: {err}"));
            }
        }
    }

    /// Attach the mirror/move machinery to one session and switch to the
    /// board view.
    pub async fn open_board(&mut self, id: SessionId) {
        let mut game = OptimisticMoveController::new(
            self.gateway.clone(),
            id,
            self.actor.address(),
            self.reconcile,
        );
        if let Err(err) = game.refresh().await {
            self.push_error(format!("initial refresh of {id} failed: {err}"));
        }
        self.game = Some(game);
    }

    /// Back to the catalog. Abandons any pending-move wait; the submission
    /// itself is already irrevocable either way.
    pub fn close_board(&mut self) {
        self.game = None;
    }

    pub async fn request_move(&mut self, row: usize, col: usize) {
        let Some(game) = &mut self.game else {
            return;
        };
        match game.request_move(row, col).await {
            MoveOutcome::Ignored => {}
            MoveOutcome::Reconciled => {
                self.status = format!("Move ({row}, {col}) confirmed");
            }
            MoveOutcome::Reverted(reason) => {
                self.status = format!("Move failed: {reason}");
                self.push_error(format!("move ({row}, {col}): {reason}"));
            }
            MoveOutcome::Unknown => {
                self.status =
                    String::from("Move submitted; confirmation still pending");
            }
        }
    }

    pub async fn set_actor(&mut self, actor: ActorKind) {
        if actor == self.actor {
            return;
        }
        self.actor = actor;
        if let Some(game) = &mut self.game {
            game.set_actor(actor.address());
            // Identity changes force a fresh mirror before any new move.
            if let Err(err) = game.refresh().await {
                let message = format!("refresh after actor switch: {err}");
                self.push_error(message);
            }
        }
        self.status = format!("Acting as {}", actor.label());
    }

    fn push_error(&mut self, message: String) {
        error!("{message}");
        self.errors.push(message);
        if self.errors.len() > 50 {
            let drain = self.errors.len() - 50;
            self.errors.drain(0..drain);
        }
    }
}

fn board_snapshot(
    game: &OptimisticMoveController<MemoryLedger>,
) -> Option<BoardSnapshot> {
    let view = game.view()?;
    let board = game.display_board()?;
    let actor = game.actor();
    let your_turn = view.turn.is_local_turn();
    let headline = match view.outcome {
        Outcome::Winner(w) if w == actor => String::from("You won!"),
        Outcome::Winner(_) => String::from("Opponent won!"),
        Outcome::Draw => String::from("It's a draw!"),
        Outcome::Undetermined => {
            if game.pending().is_some() {
                String::from("Waiting for confirmation...")
            } else if view.player2.is_none() {
                String::from("Waiting for an opponent to join")
            } else if your_turn {
                String::from("Your turn")
            } else {
                String::from("Opponent's turn")
            }
        }
    };
    Some(BoardSnapshot {
        session: game.session(),
        board,
        local_mark: view.mark_of(actor),
        your_turn,
        pending: game.pending().is_some(),
        game_over: view.game_over(),
        headline,
    })
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let mut controller = AppController::new_local(config);
    let mut ui_state = ui::UiState::default();

    // UI bootstrap
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut ticker = time::interval(controller.tick());
    let mut last_snapshot = controller.snapshot().await?;
    ui::draw(ui_state, &last_snapshot)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = ticker.tick() => {
                last_snapshot = controller.snapshot().await?;
                ui::draw(ui_state, &last_snapshot)?;
            }
            ev = ui::next_event(ui_state) => {
                match ev? {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::SwitchActor(kind) => controller.set_actor(kind).await,
                    ui::UserEvent::ConfirmCreate(stake) => controller.create_session(&stake).await,
                    ui::UserEvent::JoinSession(id) => controller.join_session(id).await,
                    ui::UserEvent::OpenBoard(id) => controller.open_board(id).await,
                    ui::UserEvent::PlaceMark { row, col } => controller.request_move(row, col).await,
                    ui::UserEvent::CloseBoard => controller.close_board(),
                    ui::UserEvent::Redraw => {
                        // UI-only update; redraw without touching the ledger
                        ui::draw(ui_state, &last_snapshot)?;
                        continue;
                    }
                }
                last_snapshot = controller.snapshot().await?;
                ui::draw(ui_state, &last_snapshot)?;
            }
        }
    }
    Ok(())
}
