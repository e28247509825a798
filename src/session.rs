//! Client side of a blackjack session.
//!
//! [`GameSession`] owns everything the player sees: the last table the
//! backend confirmed, the cards drawn for it, balances, notifications and
//! the error banner. Actions go through [`GameSession::prepare`], which checks
//! preconditions and signs the request, and [`GameSession::complete`], which
//! folds the backend's answer back in. Drivers that keep several requests in
//! flight call the two halves themselves; sequential callers use
//! [`GameSession::perform`].

use crate::{
    backend::{
        Action,
        ActionRequest,
        GameBackend,
    },
    balances::BalanceRefresh,
    card::{
        Card,
        CardError,
        convert_to_card,
    },
    error::{
        ApiError,
        ApiErrorKind,
        ErrorCode,
        format_error_message,
    },
    indexer_client::{
        IndexerApi,
        current_table,
    },
    notifications::NotificationQueue,
    table::{
        BalanceMerge,
        GameResponse,
        GameState,
        TableState,
        Token,
        TokenBalances,
    },
    wallet::{
        SESSION_KEY_TTL_DAYS,
        SESSION_KEY_WHITELIST,
        WalletError,
        WalletProvider,
    },
};
use chrono::Utc;
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    collections::BTreeSet,
    time::{
        Duration,
        Instant,
    },
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

mod view;
pub use view::{
    CardView,
    HandView,
    NotificationView,
    SessionView,
};

#[cfg(test)]
mod tests;

pub const MIN_BET: u64 = 10;
pub const EFFECT_DURATION: Duration = Duration::from_millis(4000);

const SESSION_KEY_FALLBACK: &str = "Failed to create new session key.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundPhase {
    Betting,
    InRound,
    RoundOver,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    NoWallet,
    WalletConnectedNoSession,
    SessionReady(RoundPhase),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectKind {
    Win,
    Lose,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct VisualEffect {
    kind: EffectKind,
    until: Instant,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("No session key found")]
    NoSessionKey,
    #[error("No active round. Deal a new game first")]
    NoActiveRound,
    #[error("This round is over. Deal a new game to keep playing")]
    RoundOver,
    #[error("Minimum bet is {}", MIN_BET)]
    BetTooSmall,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("Insufficient {token} balance. You have {available} but requested {requested}")]
    ExceedsBalance {
        token: Token,
        available: u64,
        requested: u64,
    },
    #[error("{}", format_error_message(.0))]
    Wallet(String),
    #[error("{}", format_error_message(&.0.message))]
    Rejected(ApiError),
    #[error("{fallback}")]
    Unreachable {
        fallback: &'static str,
        #[source]
        cause: ApiError,
    },
}

impl ActionError {
    fn from_api(action: &Action, err: ApiError) -> Self {
        match err.kind {
            ApiErrorKind::Backend { .. } => ActionError::Rejected(err),
            ApiErrorKind::Network | ApiErrorKind::Decode => ActionError::Unreachable {
                fallback: action.fallback_error(),
                cause: err,
            },
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ActionError::Rejected(err) => err.code(),
            _ => None,
        }
    }
}

impl From<WalletError> for ActionError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotConnected => ActionError::WalletNotConnected,
            WalletError::NoSessionKey => ActionError::NoSessionKey,
            other => ActionError::Wallet(other.to_string()),
        }
    }
}

/// A signed action waiting for its backend response.
#[derive(Clone, Debug)]
pub struct ActionTicket {
    seq: u64,
    request: ActionRequest,
}

impl ActionTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn action(&self) -> Action {
        self.request.action
    }

    pub fn request(&self) -> &ActionRequest {
        &self.request
    }
}

pub struct GameSession<W> {
    wallet: W,
    table: Option<GameState>,
    dealer_cards: Vec<Card>,
    player_cards: Vec<Card>,
    balances: Option<TokenBalances>,
    bet: u64,
    error: Option<ActionError>,
    deposit_prompt: bool,
    offer_new_deal: bool,
    effect: Option<VisualEffect>,
    notifications: NotificationQueue,
    refresh: BalanceRefresh,
    in_flight: BTreeSet<u64>,
    registering: bool,
    next_seq: u64,
    applied_seq: u64,
    rng: StdRng,
}

impl<W: WalletProvider> GameSession<W> {
    pub fn new(wallet: W) -> Self {
        Self::with_rng(wallet, StdRng::from_os_rng())
    }

    pub fn with_rng(wallet: W, rng: StdRng) -> Self {
        Self {
            wallet,
            table: None,
            dealer_cards: Vec::new(),
            player_cards: Vec::new(),
            balances: None,
            bet: MIN_BET,
            error: None,
            deposit_prompt: false,
            offer_new_deal: false,
            effect: None,
            notifications: NotificationQueue::new(),
            refresh: BalanceRefresh::default(),
            in_flight: BTreeSet::new(),
            registering: false,
            next_seq: 1,
            applied_seq: 0,
            rng,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn identity(&self) -> Option<&str> {
        self.wallet.address()
    }

    pub fn table(&self) -> Option<&GameState> {
        self.table.as_ref()
    }

    pub fn balances(&self) -> Option<TokenBalances> {
        self.balances
    }

    pub fn bet(&self) -> u64 {
        self.bet
    }

    pub fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_action_pending() || self.registering
    }

    fn is_action_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationQueue {
        &mut self.notifications
    }

    pub fn phase(&self) -> Phase {
        if self.wallet.address().is_none() {
            return Phase::NoWallet;
        }
        if self.wallet.session_key().is_none() {
            return Phase::WalletConnectedNoSession;
        }
        let round = match self.table.as_ref().map(|t| t.state) {
            None => RoundPhase::Betting,
            Some(TableState::Ongoing) => RoundPhase::InRound,
            Some(TableState::Won | TableState::Lost) => RoundPhase::RoundOver,
        };
        Phase::SessionReady(round)
    }

    pub fn set_bet(&mut self, amount: u64) -> Result<(), ActionError> {
        if amount < MIN_BET {
            return Err(self.fail(ActionError::BetTooSmall));
        }
        self.bet = amount;
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        self.deposit_prompt = false;
        self.offer_new_deal = false;
    }

    /// Checks preconditions and signs `action`. On failure the error banner
    /// is set and nothing should be sent.
    pub fn prepare(&mut self, action: Action) -> Result<ActionTicket, ActionError> {
        match self.try_prepare(action) {
            Ok(ticket) => {
                self.in_flight.insert(ticket.seq);
                debug!(seq = ticket.seq, %action, "action prepared");
                Ok(ticket)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn try_prepare(&mut self, action: Action) -> Result<ActionTicket, ActionError> {
        let identity = self
            .wallet
            .address()
            .ok_or(ActionError::WalletNotConnected)?
            .to_string();
        self.wallet.clean_expired_session_key(Utc::now());
        if self.wallet.session_key().is_none() {
            return Err(ActionError::NoSessionKey);
        }
        self.check_bounds(&action)?;
        let wallet_blobs = self.wallet.create_identity_blobs()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(ActionTicket {
            seq,
            request: ActionRequest {
                identity,
                action,
                wallet_blobs,
            },
        })
    }

    fn check_bounds(&self, action: &Action) -> Result<(), ActionError> {
        if action.needs_open_round() {
            match self.table.as_ref().map(|t| t.state) {
                None => return Err(ActionError::NoActiveRound),
                Some(state) if state.is_final() => return Err(ActionError::RoundOver),
                Some(_) => {}
            }
        }
        match *action {
            Action::Start { bet } if bet < MIN_BET => Err(ActionError::BetTooSmall),
            Action::Deposit { amount } | Action::Withdraw { amount, .. } if amount == 0 => {
                Err(ActionError::ZeroAmount)
            }
            Action::Deposit { amount } => {
                self.check_available(Token::Oranj, amount, |b| b.oranj_balance)
            }
            Action::Withdraw {
                amount,
                token: Token::Oranj,
            } => self.check_available(Token::Oranj, amount, |b| b.oranj_deposited),
            Action::Withdraw {
                amount,
                token: Token::Vitamin,
            } => self.check_available(Token::Vitamin, amount, |b| b.vit_earned),
            _ => Ok(()),
        }
    }

    /// Balances not resolved yet leave the decision to the backend.
    fn check_available(
        &self,
        token: Token,
        requested: u64,
        field: impl Fn(&TokenBalances) -> Option<u64>,
    ) -> Result<(), ActionError> {
        match self.balances.as_ref().and_then(field) {
            Some(available) if requested > available => Err(ActionError::ExceedsBalance {
                token,
                available,
                requested,
            }),
            _ => Ok(()),
        }
    }

    /// Folds the backend's answer for `ticket` into the session.
    pub fn complete(
        &mut self,
        ticket: ActionTicket,
        result: Result<GameResponse, ApiError>,
        now: Instant,
    ) -> Result<(), ActionError> {
        let ActionTicket { seq, request } = ticket;
        let action = request.action;
        if !self.in_flight.remove(&seq) {
            debug!(seq, %action, "ignoring response for abandoned request");
            return Ok(());
        }

        let response = match result.and_then(|response| {
            response
                .table
                .validate()
                .map_err(|err: CardError| ApiError::decode(err.to_string()))?;
            Ok(response)
        }) {
            Ok(response) => response,
            Err(err) => {
                let err = ActionError::from_api(&action, err);
                if seq < self.applied_seq {
                    warn!(%err, seq, applied = self.applied_seq, "superseded action failed");
                    return Err(err);
                }
                error!(%err, seq, %action, "action failed");
                match err.code() {
                    Some(ErrorCode::InsufficientBalance) => self.deposit_prompt = true,
                    Some(ErrorCode::FinishedGame | ErrorCode::NoTable) => {
                        self.offer_new_deal = true
                    }
                    _ => {}
                }
                self.error = Some(err.clone());
                return Err(err);
            }
        };

        info!(seq, %action, tx_hash = %response.tx_hash, "action settled");
        self.notifications.add(response.tx_hash, now);
        if !matches!(action, Action::Start { .. }) {
            self.refresh.schedule(now);
        }
        if seq < self.applied_seq {
            debug!(seq, applied = self.applied_seq, "dropping table from stale response");
            return Ok(());
        }
        self.applied_seq = seq;
        self.error = None;
        self.deposit_prompt = false;
        self.offer_new_deal = false;

        let policy = if action.moves_funds() {
            BalanceMerge::Adopt
        } else {
            BalanceMerge::Preserve
        };
        self.apply_table(response.table, policy);

        if !action.moves_funds()
            && let Some(state) = self.table.as_ref().map(|t| t.state)
        {
            let kind = match state {
                TableState::Won => Some(EffectKind::Win),
                TableState::Lost => Some(EffectKind::Lose),
                TableState::Ongoing => None,
            };
            self.effect = kind.map(|kind| VisualEffect {
                kind,
                until: now + EFFECT_DURATION,
            });
        }
        Ok(())
    }

    /// Prepares, sends and completes `action` in one go.
    pub async fn perform<B: GameBackend>(
        &mut self,
        backend: &B,
        action: Action,
    ) -> Result<(), ActionError> {
        let ticket = self.prepare(action)?;
        let result = backend.submit(ticket.request()).await;
        self.complete(ticket, result, Instant::now())
    }

    pub async fn start_game<B: GameBackend>(
        &mut self,
        backend: &B,
        bet: u64,
    ) -> Result<(), ActionError> {
        self.perform(backend, Action::Start { bet }).await
    }

    pub async fn hit<B: GameBackend>(&mut self, backend: &B) -> Result<(), ActionError> {
        self.perform(backend, Action::Hit).await
    }

    pub async fn stand<B: GameBackend>(&mut self, backend: &B) -> Result<(), ActionError> {
        self.perform(backend, Action::Stand).await
    }

    pub async fn double_down<B: GameBackend>(&mut self, backend: &B) -> Result<(), ActionError> {
        self.perform(backend, Action::DoubleDown).await
    }

    pub async fn deposit<B: GameBackend>(
        &mut self,
        backend: &B,
        amount: u64,
    ) -> Result<(), ActionError> {
        self.perform(backend, Action::Deposit { amount }).await
    }

    pub async fn withdraw<B: GameBackend>(
        &mut self,
        backend: &B,
        amount: u64,
        token: Token,
    ) -> Result<(), ActionError> {
        self.perform(backend, Action::Withdraw { amount, token })
            .await
    }

    /// Shows loading until the next [`GameSession::create_session_key`]
    /// returns. Lets a driver render that state before the key derivation
    /// blocks it.
    pub fn begin_session_key_registration(&mut self) {
        self.registering = true;
    }

    /// Registers a fresh session key, then deals with the current bet.
    pub async fn create_session_key<B: GameBackend>(
        &mut self,
        backend: &B,
        password: &str,
    ) -> Result<(), ActionError> {
        if self.wallet.address().is_none() {
            self.registering = false;
            return Err(self.fail(ActionError::WalletNotConnected));
        }
        self.registering = true;
        let expiration = Utc::now() + chrono::Duration::days(SESSION_KEY_TTL_DAYS);
        let registered = self
            .wallet
            .register_session_key(password, expiration, &SESSION_KEY_WHITELIST)
            .await;
        self.registering = false;
        if let Err(err) = registered {
            error!(?err, "session key registration failed");
            let message = match err.to_string() {
                message if message.is_empty() => SESSION_KEY_FALLBACK.to_string(),
                message => message,
            };
            return Err(self.fail(ActionError::Wallet(message)));
        }
        self.dismiss_error();
        self.start_game(backend, self.bet).await
    }

    /// Picks up the round the indexer has on record for this wallet.
    ///
    /// The indexer trails the backend, so its table is only adopted while no
    /// action is in flight.
    pub async fn resume<I: IndexerApi>(
        &mut self,
        indexer: &I,
        contract: &str,
    ) -> Result<(), ActionError> {
        let identity = self
            .wallet
            .address()
            .ok_or(ActionError::WalletNotConnected)?
            .to_string();
        match current_table(indexer, contract, &identity).await {
            Ok(Some(_)) if self.is_action_pending() => {
                debug!(
                    in_flight = self.in_flight.len(),
                    "skipping indexed table behind pending actions"
                );
                Ok(())
            }
            Ok(Some(table)) => {
                info!(%identity, state = ?table.state, "resumed table from indexer");
                self.apply_table(table, BalanceMerge::Adopt);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                warn!(?err, %identity, "failed to load current table");
                Err(ActionError::Unreachable {
                    fallback: "Failed to load the current game.",
                    cause: err,
                })
            }
        }
    }

    pub fn apply_balances(&mut self, balances: TokenBalances) {
        self.balances = Some(balances);
        if let Some(table) = self.table.as_mut()
            && let Some(deposited) = balances.oranj_deposited
        {
            table.balance = Some(deposited);
        }
    }

    pub fn disconnect(&mut self) {
        info!("disconnecting wallet");
        self.wallet.logout();
        self.table = None;
        self.dealer_cards.clear();
        self.player_cards.clear();
        self.balances = None;
        self.dismiss_error();
        self.effect = None;
        self.refresh.cancel();
        self.notifications.clear();
        self.in_flight.clear();
        self.registering = false;
    }

    /// Advances timers. Returns `true` when balances should be refetched.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.notifications.expire(now);
        if self.effect.is_some_and(|effect| now >= effect.until) {
            self.effect = None;
        }
        self.wallet.clean_expired_session_key(Utc::now());
        self.refresh.take_due(now)
    }

    pub fn effect(&self, now: Instant) -> Option<EffectKind> {
        self.effect
            .filter(|effect| now < effect.until)
            .map(|effect| effect.kind)
    }

    fn fail(&mut self, err: ActionError) -> ActionError {
        warn!(%err, "action rejected before sending");
        self.error = Some(err.clone());
        err
    }

    fn apply_table(&mut self, incoming: GameState, policy: BalanceMerge) {
        let merged = match &self.table {
            Some(local) => local.merged_with(incoming, policy),
            None => incoming,
        };
        if merged.bet >= MIN_BET {
            self.bet = merged.bet;
        }
        sync_cards(&mut self.dealer_cards, &merged.bank, &mut self.rng);
        sync_cards(&mut self.player_cards, &merged.user, &mut self.rng);
        self.table = Some(merged);
    }
}

/// Keeps cards whose rank is unchanged at the same position so suits do not
/// reshuffle on every update.
fn sync_cards(displayed: &mut Vec<Card>, ranks: &[u8], rng: &mut StdRng) {
    displayed.truncate(ranks.len());
    for (index, rank) in ranks.iter().copied().enumerate() {
        if displayed.get(index).is_some_and(|card| card.rank == rank) {
            continue;
        }
        let card = match convert_to_card(rank, rng) {
            Ok(card) => card,
            Err(err) => {
                warn!(?err, "stopping at undisplayable card");
                break;
            }
        };
        if index < displayed.len() {
            displayed[index] = card;
        } else {
            displayed.push(card);
        }
    }
}
