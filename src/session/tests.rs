#![allow(non_snake_case)]

use super::*;
use crate::{
    indexer_client::UserBalances,
    notifications::{
        NOTIFICATION_STACK_OFFSET,
        NOTIFICATION_TTL,
    },
    table::ContractState,
    wallet::{
        Blob,
        IdentityBlobs,
        SessionKey,
    },
};
use chrono::DateTime;
use std::{
    collections::VecDeque,
    sync::Mutex,
};

#[derive(Default)]
struct FakeWallet {
    address: Option<String>,
    session: Option<SessionKey>,
    register_error: bool,
    registered: Vec<(DateTime<Utc>, Vec<String>)>,
    logged_out: bool,
}

impl FakeWallet {
    fn connected() -> Self {
        Self {
            address: Some("bob@wallet".to_string()),
            ..Self::default()
        }
    }

    fn ready() -> Self {
        Self {
            session: Some(SessionKey {
                public_key: "ab".repeat(32),
                expires_at: Utc::now() + chrono::Duration::days(1),
                whitelist: vec!["blackjack".to_string()],
            }),
            ..Self::connected()
        }
    }
}

impl WalletProvider for FakeWallet {
    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn session_key(&self) -> Option<&SessionKey> {
        self.session.as_ref()
    }

    fn create_identity_blobs(&self) -> Result<IdentityBlobs, WalletError> {
        let account = self.address.as_ref().ok_or(WalletError::NotConnected)?;
        let key = self.session.as_ref().ok_or(WalletError::NoSessionKey)?;
        Ok([
            Blob {
                contract_name: "secp256k1".to_string(),
                data: key.public_key.as_bytes().to_vec(),
            },
            Blob {
                contract_name: "wallet".to_string(),
                data: account.as_bytes().to_vec(),
            },
        ])
    }

    async fn register_session_key(
        &mut self,
        password: &str,
        expiration: DateTime<Utc>,
        whitelist: &[&str],
    ) -> Result<(), WalletError> {
        if self.register_error {
            return Err(WalletError::InvalidPassword(format!(
                "{password} {}",
                "f".repeat(48)
            )));
        }
        self.registered
            .push((expiration, whitelist.iter().map(|s| s.to_string()).collect()));
        self.session = Some(SessionKey {
            public_key: "cd".repeat(32),
            expires_at: expiration,
            whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    fn clean_expired_session_key(&mut self, now: DateTime<Utc>) {
        if self.session.as_ref().is_some_and(|key| key.is_expired(now)) {
            self.session = None;
        }
    }

    fn logout(&mut self) {
        self.logged_out = true;
        self.address = None;
        self.session = None;
    }
}

#[derive(Default)]
struct FakeBackend {
    responses: Mutex<VecDeque<Result<GameResponse, ApiError>>>,
    requests: Mutex<Vec<ActionRequest>>,
}

impl FakeBackend {
    fn answering(responses: Vec<Result<GameResponse, ApiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        }
    }

    fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GameBackend for FakeBackend {
    async fn submit(&self, request: &ActionRequest) -> Result<GameResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("no canned response")))
    }

    async fn config(&self) -> Result<crate::backend::BackendConfig, ApiError> {
        Ok(crate::backend::BackendConfig {
            contract_name: "blackjack".to_string(),
        })
    }
}

struct FakeIndexer {
    table: Option<GameState>,
}

impl IndexerApi for FakeIndexer {
    async fn contract_state(
        &self,
        _contract: &str,
        identity: &str,
    ) -> Result<Option<ContractState>, ApiError> {
        let mut state = ContractState::default();
        if let Some(table) = &self.table {
            state.tables.insert(identity.to_string(), table.clone());
        }
        Ok(Some(state))
    }

    async fn user_balances(
        &self,
        _contract: &str,
        _identity: &str,
    ) -> Result<UserBalances, ApiError> {
        Ok(UserBalances::default())
    }

    async fn token_balance(&self, _token: Token, _identity: &str) -> Result<u64, ApiError> {
        Ok(0)
    }
}

fn session(wallet: FakeWallet) -> GameSession<FakeWallet> {
    GameSession::with_rng(wallet, StdRng::seed_from_u64(42))
}

fn table(user: Vec<u8>, bank: Vec<u8>, state: TableState) -> GameState {
    GameState {
        bank,
        user,
        bet: 10,
        state,
        ..GameState::default()
    }
}

fn ok(tx_hash: &str, table: GameState) -> Result<GameResponse, ApiError> {
    Ok(GameResponse {
        tx_hash: tx_hash.to_string(),
        table,
    })
}

/// Session with an ongoing round already dealt.
fn dealt(now: Instant) -> GameSession<FakeWallet> {
    let mut session = session(FakeWallet::ready());
    let ticket = session.prepare(Action::Start { bet: 10 }).unwrap();
    session
        .complete(
            ticket,
            ok("0xdeal", table(vec![5, 6], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();
    session
}

#[tokio::test]
async fn hit__without_session_key__fails_before_any_request() {
    // given
    let mut session = session(FakeWallet::connected());
    let backend = FakeBackend::default();

    // when
    let result = session.hit(&backend).await;

    // then
    assert_eq!(result, Err(ActionError::NoSessionKey));
    assert!(backend.requests().is_empty());
    let view = session.view(Instant::now());
    assert_eq!(view.error.as_deref(), Some("No session key found"));
    assert!(!view.loading);
    assert_eq!(view.phase, Phase::WalletConnectedNoSession);
}

#[tokio::test]
async fn start_game__without_wallet__reports_not_connected() {
    let mut session = session(FakeWallet::default());
    let backend = FakeBackend::default();

    let result = session.start_game(&backend, 10).await;

    assert_eq!(result, Err(ActionError::WalletNotConnected));
    assert_eq!(session.phase(), Phase::NoWallet);
    assert!(backend.requests().is_empty());
}

#[test]
fn prepare__expired_session_key_counts_as_missing() {
    let mut wallet = FakeWallet::ready();
    if let Some(key) = wallet.session.as_mut() {
        key.expires_at = Utc::now() - chrono::Duration::seconds(1);
    }
    let mut session = session(wallet);

    let result = session.prepare(Action::Start { bet: 10 });

    assert_eq!(result.unwrap_err(), ActionError::NoSessionKey);
    assert!(session.wallet().session.is_none());
}

#[tokio::test]
async fn start_game__success__shows_table_and_notification() {
    // given
    let mut session = session(FakeWallet::ready());
    let backend = FakeBackend::answering(vec![ok(
        "0x1234567890abcdef",
        table(vec![1, 13], vec![10, 7], TableState::Ongoing),
    )]);

    // when
    session.start_game(&backend, 25).await.unwrap();

    // then
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, Action::Start { bet: 25 });
    assert_eq!(requests[0].identity, "bob@wallet");
    let view = session.view(Instant::now());
    assert_eq!(view.phase, Phase::SessionReady(RoundPhase::InRound));
    assert_eq!(view.player.total, Some(21));
    assert_eq!(view.notifications.len(), 1);
    assert_eq!(view.notifications[0].short_hash, "0x123456...abcdef");
    assert_eq!(view.error, None);
    assert!(!view.loading);
}

#[test]
fn view__hides_dealer_hole_card_while_round_is_open() {
    // given
    let now = Instant::now();
    let session = dealt(now);

    // when
    let view = session.view(now);

    // then
    assert!(matches!(view.dealer.cards[0], CardView::FaceUp(ref card) if card.value == "10"));
    assert_eq!(view.dealer.cards[1], CardView::FaceDown);
    assert_eq!(view.dealer.total, Some(10));
    assert_eq!(view.player.total, Some(11));
}

#[test]
fn complete__won_round_sets_effect_for_four_seconds() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Stand).unwrap();

    // when
    session
        .complete(
            ticket,
            ok("0xstand", table(vec![5, 6, 10], vec![10, 7, 9], TableState::Won)),
            now,
        )
        .unwrap();

    // then
    assert_eq!(session.effect(now), Some(EffectKind::Win));
    assert_eq!(
        session.effect(now + Duration::from_millis(3999)),
        Some(EffectKind::Win)
    );
    assert_eq!(session.effect(now + EFFECT_DURATION), None);
    session.tick(now + EFFECT_DURATION);
    assert_eq!(session.view(now).effect, None);
    assert_eq!(session.phase(), Phase::SessionReady(RoundPhase::RoundOver));
    assert_eq!(session.view(now).dealer.total, Some(26));
}

#[test]
fn complete__lost_round_sets_lose_effect() {
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Hit).unwrap();

    session
        .complete(
            ticket,
            ok("0xhit", table(vec![5, 6, 13, 12], vec![10, 7], TableState::Lost)),
            now,
        )
        .unwrap();

    assert_eq!(session.effect(now), Some(EffectKind::Lose));
}

#[test]
fn complete__fund_movement_never_triggers_effect() {
    // given
    let now = Instant::now();
    let mut session = session(FakeWallet::ready());
    let ticket = session.prepare(Action::Deposit { amount: 50 }).unwrap();
    let settled = GameState {
        balance: Some(150),
        ..table(vec![2, 3], vec![9, 9], TableState::Won)
    };

    // when
    session.complete(ticket, ok("0xdep", settled), now).unwrap();

    // then
    assert_eq!(session.effect(now), None);
    assert_eq!(session.table().unwrap().balance, Some(150));
}

#[tokio::test]
async fn resume__adopts_indexed_table_without_effect() {
    // given
    let mut session = session(FakeWallet::ready());
    let indexer = FakeIndexer {
        table: Some(GameState {
            bet: 40,
            ..table(vec![10, 9], vec![10, 10], TableState::Lost)
        }),
    };

    // when
    session.resume(&indexer, "blackjack").await.unwrap();

    // then
    let view = session.view(Instant::now());
    assert_eq!(view.effect, None);
    assert_eq!(view.phase, Phase::SessionReady(RoundPhase::RoundOver));
    assert_eq!(view.bet, 40);
    assert!(view.notifications.is_empty());
}

#[tokio::test]
async fn resume__no_recorded_table_leaves_betting_phase() {
    let mut session = session(FakeWallet::ready());
    let indexer = FakeIndexer { table: None };

    session.resume(&indexer, "blackjack").await.unwrap();

    assert_eq!(session.phase(), Phase::SessionReady(RoundPhase::Betting));
}

#[tokio::test]
async fn resume__lagging_index_does_not_shadow_pending_action() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let hit = session.prepare(Action::Hit).unwrap();
    let indexer = FakeIndexer {
        table: Some(table(vec![5, 6], vec![10, 7], TableState::Ongoing)),
    };

    // when
    session.resume(&indexer, "blackjack").await.unwrap();
    session
        .complete(
            hit,
            ok("0xhit", table(vec![5, 6, 4], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();

    // then
    assert_eq!(session.table().unwrap().user, vec![5, 6, 4]);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn resume__adopts_index_again_once_actions_settled() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let indexer = FakeIndexer {
        table: Some(table(vec![5, 6, 9], vec![10, 7, 2], TableState::Lost)),
    };

    // when
    session.resume(&indexer, "blackjack").await.unwrap();

    // then
    assert_eq!(session.table().unwrap().state, TableState::Lost);
    assert_eq!(session.effect(now), None);
}

#[test]
fn complete__round_action_preserves_local_balance() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    session.apply_balances(TokenBalances {
        oranj_deposited: Some(90),
        ..TokenBalances::default()
    });
    let ticket = session.prepare(Action::Hit).unwrap();
    let incoming = GameState {
        balance: Some(0),
        ..table(vec![5, 6, 2], vec![10, 7], TableState::Ongoing)
    };

    // when
    session.complete(ticket, ok("0xhit", incoming), now).unwrap();

    // then
    assert_eq!(session.table().unwrap().balance, Some(90));
    assert_eq!(session.table().unwrap().user, vec![5, 6, 2]);
}

#[tokio::test]
async fn hit__insufficient_balance_raises_deposit_prompt() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let backend = FakeBackend::answering(vec![Err(ApiError::backend(
        400,
        "Insufficient balance for double down",
    ))]);

    // when
    let result = session.double_down(&backend).await;

    // then
    assert!(matches!(result, Err(ActionError::Rejected(_))));
    let view = session.view(now);
    assert!(view.deposit_prompt);
    assert_eq!(
        view.error.as_deref(),
        Some("Insufficient balance for double down")
    );
    assert!(!view.loading);

    session.dismiss_error();
    let view = session.view(now);
    assert!(!view.deposit_prompt);
    assert_eq!(view.error, None);
}

#[tokio::test]
async fn hit__finished_game_error_offers_new_deal() {
    let now = Instant::now();
    let mut session = dealt(now);
    let backend =
        FakeBackend::answering(vec![Err(ApiError::backend(400, "Cannot hit on finished game!"))]);

    let _ = session.hit(&backend).await;

    let view = session.view(now);
    assert!(view.offer_new_deal);
    assert!(!view.deposit_prompt);
}

#[tokio::test]
async fn stand__network_failure_shows_generic_message() {
    let now = Instant::now();
    let mut session = dealt(now);
    let backend = FakeBackend::answering(vec![Err(ApiError::network("connection reset"))]);

    let result = session.stand(&backend).await;

    assert!(matches!(result, Err(ActionError::Unreachable { .. })));
    assert_eq!(
        session.view(now).error.as_deref(),
        Some("Failed to stand. Please try again.")
    );
}

#[tokio::test]
async fn start_game__backend_error_truncates_long_keys() {
    // given
    let mut session = session(FakeWallet::ready());
    let key = "0123456789".to_string() + &"a".repeat(30) + "fedcba9876";
    let backend = FakeBackend::answering(vec![Err(ApiError::backend(
        403,
        format!("Session key {key} not found"),
    ))]);

    // when
    let _ = session.start_game(&backend, 10).await;

    // then
    assert_eq!(
        session.view(Instant::now()).error.as_deref(),
        Some("Session key 0123456789[...]fedcba9876 not found")
    );
}

#[test]
fn complete__invalid_ranks_are_treated_as_decode_failure() {
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Hit).unwrap();

    let result = session.complete(
        ticket,
        ok("0xbad", table(vec![5, 6, 14], vec![10, 7], TableState::Ongoing)),
        now,
    );

    assert!(matches!(result, Err(ActionError::Unreachable { .. })));
    assert_eq!(session.table().unwrap().user, vec![5, 6]);
}

#[test]
fn complete__stale_response_does_not_overwrite_newer_table() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let first = session.prepare(Action::Hit).unwrap();
    let second = session.prepare(Action::Stand).unwrap();
    assert!(session.is_loading());

    // when
    session
        .complete(
            second,
            ok("0xstand", table(vec![5, 6, 3], vec![10, 7, 8], TableState::Lost)),
            now,
        )
        .unwrap();
    assert!(session.is_loading());
    session
        .complete(
            first,
            ok("0xhit", table(vec![5, 6, 3], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();

    // then
    assert_eq!(session.table().unwrap().state, TableState::Lost);
    assert_eq!(session.table().unwrap().bank, vec![10, 7, 8]);
    let hashes: Vec<_> = session
        .notifications()
        .iter()
        .map(|n| n.tx_hash.clone())
        .collect();
    assert_eq!(hashes, vec!["0xdeal", "0xstand", "0xhit"]);
    assert!(!session.is_loading());
}

#[test]
fn complete__stale_failure_leaves_newer_round_untouched() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let hit = session.prepare(Action::Hit).unwrap();
    let stand = session.prepare(Action::Stand).unwrap();
    session
        .complete(
            stand,
            ok("0xstand", table(vec![5, 6], vec![10, 7, 1], TableState::Won)),
            now,
        )
        .unwrap();

    // when
    let result = session.complete(
        hit,
        Err(ApiError::backend(400, "Cannot hit on finished game!")),
        now,
    );

    // then
    assert!(matches!(result, Err(ActionError::Rejected(_))));
    let view = session.view(now);
    assert_eq!(view.error, None);
    assert!(!view.offer_new_deal);
    assert!(!view.deposit_prompt);
    assert_eq!(view.effect, Some(EffectKind::Win));
    assert!(!view.loading);
}

#[test]
fn complete__loading_clears_after_failure() {
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Hit).unwrap();
    assert!(session.view(now).loading);

    let _ = session.complete(ticket, Err(ApiError::decode("bad json")), now);

    assert!(!session.view(now).loading);
}

#[test]
fn complete__keeps_suits_of_cards_already_shown() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let before = session.view(now).player.cards;
    let ticket = session.prepare(Action::Hit).unwrap();

    // when
    session
        .complete(
            ticket,
            ok("0xhit", table(vec![5, 6, 4], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();

    // then
    let after = session.view(now).player.cards;
    assert_eq!(after.len(), 3);
    assert_eq!(after[..2], before[..]);
}

#[test]
fn prepare__round_actions_need_open_round() {
    let mut fresh = session(FakeWallet::ready());
    assert_eq!(
        fresh.prepare(Action::Hit).unwrap_err(),
        ActionError::NoActiveRound
    );

    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Stand).unwrap();
    session
        .complete(
            ticket,
            ok("0xstand", table(vec![5, 6], vec![10, 7, 5], TableState::Won)),
            now,
        )
        .unwrap();

    assert_eq!(
        session.prepare(Action::DoubleDown).unwrap_err(),
        ActionError::RoundOver
    );
    assert!(session.prepare(Action::Start { bet: 10 }).is_ok());
}

#[test]
fn prepare__validates_amounts() {
    // given
    let mut session = session(FakeWallet::ready());
    session.apply_balances(TokenBalances {
        oranj_balance: Some(100),
        oranj_deposited: Some(30),
        vit_balance: Some(0),
        vit_earned: Some(5),
    });

    // then
    assert_eq!(
        session.prepare(Action::Start { bet: 5 }).unwrap_err(),
        ActionError::BetTooSmall
    );
    assert_eq!(
        session.prepare(Action::Deposit { amount: 0 }).unwrap_err(),
        ActionError::ZeroAmount
    );
    assert_eq!(
        session.prepare(Action::Deposit { amount: 101 }).unwrap_err(),
        ActionError::ExceedsBalance {
            token: Token::Oranj,
            available: 100,
            requested: 101,
        }
    );
    assert!(matches!(
        session.prepare(Action::Withdraw {
            amount: 6,
            token: Token::Vitamin,
        }),
        Err(ActionError::ExceedsBalance { available: 5, .. })
    ));
    assert!(
        session
            .prepare(Action::Withdraw {
                amount: 30,
                token: Token::Oranj,
            })
            .is_ok()
    );
    assert_eq!(
        session.view(Instant::now()).error,
        Some("Insufficient vitamin balance. You have 5 but requested 6".to_string())
    );
}

#[test]
fn set_bet__rejects_amounts_below_minimum() {
    let mut session = session(FakeWallet::ready());

    assert_eq!(session.set_bet(9), Err(ActionError::BetTooSmall));
    assert_eq!(session.bet(), MIN_BET);
    assert!(session.set_bet(50).is_ok());
    assert_eq!(session.bet(), 50);
}

#[test]
fn tick__requests_balance_refresh_after_settle_delay() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    assert!(!session.tick(now + Duration::from_secs(5)));
    let ticket = session.prepare(Action::Hit).unwrap();

    // when
    session
        .complete(
            ticket,
            ok("0xhit", table(vec![5, 6, 2], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();

    // then
    assert!(!session.tick(now + Duration::from_millis(1000)));
    assert!(session.tick(now + Duration::from_millis(1500)));
    assert!(!session.tick(now + Duration::from_millis(2000)));
}

#[test]
fn view__stacks_notifications_by_terminal_rows() {
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Hit).unwrap();
    session
        .complete(
            ticket,
            ok("0xhit", table(vec![5, 6, 2], vec![10, 7], TableState::Ongoing)),
            now,
        )
        .unwrap();

    let offsets: Vec<_> = session
        .view(now)
        .notifications
        .iter()
        .map(|n| n.offset)
        .collect();

    assert_eq!(offsets, vec![0, NOTIFICATION_STACK_OFFSET]);
}

#[test]
fn tick__expires_notifications() {
    let now = Instant::now();
    let mut session = dealt(now);

    session.tick(now + NOTIFICATION_TTL);

    assert!(session.view(now).notifications.is_empty());
}

#[test]
fn apply_balances__overwrites_table_balance_only() {
    let now = Instant::now();
    let mut session = dealt(now);
    let balances = TokenBalances {
        oranj_balance: Some(10),
        oranj_deposited: Some(77),
        vit_balance: Some(1),
        vit_earned: Some(2),
    };

    session.apply_balances(balances);

    assert_eq!(session.balances(), Some(balances));
    assert_eq!(session.table().unwrap().balance, Some(77));
    assert_eq!(session.table().unwrap().user, vec![5, 6]);
}

#[test]
fn apply_balances__unresolved_deposits_are_not_taken_as_zero() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    session.apply_balances(TokenBalances {
        oranj_deposited: Some(40),
        ..TokenBalances::default()
    });

    // when
    session.apply_balances(TokenBalances {
        oranj_balance: Some(500),
        oranj_deposited: None,
        vit_balance: Some(0),
        vit_earned: None,
    });

    // then
    assert_eq!(session.table().unwrap().balance, Some(40));
    assert!(
        session
            .prepare(Action::Withdraw {
                amount: 20,
                token: Token::Oranj,
            })
            .is_ok()
    );
    assert!(
        session
            .prepare(Action::Withdraw {
                amount: 3,
                token: Token::Vitamin,
            })
            .is_ok()
    );
    assert!(matches!(
        session.prepare(Action::Deposit { amount: 501 }),
        Err(ActionError::ExceedsBalance { available: 500, .. })
    ));
}

#[test]
fn disconnect__clears_state_and_ignores_late_responses() {
    // given
    let now = Instant::now();
    let mut session = dealt(now);
    let ticket = session.prepare(Action::Hit).unwrap();

    // when
    session.disconnect();
    let late = session.complete(
        ticket,
        ok("0xlate", table(vec![5, 6, 2], vec![10, 7], TableState::Ongoing)),
        now,
    );

    // then
    assert_eq!(late, Ok(()));
    assert!(session.wallet().logged_out);
    let view = session.view(now);
    assert_eq!(view.phase, Phase::NoWallet);
    assert!(view.notifications.is_empty());
    assert_eq!(view.player, HandView::default());
    assert_eq!(view.balances, None);
    assert!(!view.loading);
    assert!(!session.tick(now + Duration::from_secs(5)));
}

#[tokio::test]
async fn create_session_key__registers_week_long_key_then_deals() {
    // given
    let mut session = session(FakeWallet::connected());
    let backend = FakeBackend::answering(vec![ok(
        "0xdeal",
        table(vec![2, 3], vec![4, 5], TableState::Ongoing),
    )]);
    let before = Utc::now();

    // when
    session
        .create_session_key(&backend, "hunter2")
        .await
        .unwrap();

    // then
    let (expiration, whitelist) = session.wallet().registered[0].clone();
    assert_eq!(whitelist, vec!["blackjack", "oranj"]);
    let ttl = expiration - before;
    assert!(ttl >= chrono::Duration::days(7));
    assert!(ttl < chrono::Duration::days(7) + chrono::Duration::minutes(1));
    assert_eq!(backend.requests()[0].action, Action::Start { bet: MIN_BET });
    assert_eq!(session.phase(), Phase::SessionReady(RoundPhase::InRound));
}

#[tokio::test]
async fn create_session_key__registration_error_is_formatted() {
    let mut session = session(FakeWallet {
        register_error: true,
        ..FakeWallet::connected()
    });
    let backend = FakeBackend::default();

    let result = session.create_session_key(&backend, "pw").await;

    assert!(matches!(result, Err(ActionError::Wallet(_))));
    assert!(backend.requests().is_empty());
    assert_eq!(
        session.view(Instant::now()).error.as_deref(),
        Some("Invalid password for wallet 'pw ffffffffff[...]ffffffffff'")
    );
}

#[tokio::test]
async fn create_session_key__shows_loading_while_registering() {
    // given
    let mut session = session(FakeWallet::connected());
    let backend = FakeBackend::answering(vec![ok(
        "0xdeal",
        table(vec![2, 3], vec![4, 5], TableState::Ongoing),
    )]);

    // when
    session.begin_session_key_registration();
    let during = session.view(Instant::now()).loading;
    session
        .create_session_key(&backend, "hunter2")
        .await
        .unwrap();

    // then
    assert!(during);
    assert!(!session.view(Instant::now()).loading);
}

#[tokio::test]
async fn create_session_key__failed_registration_stops_loading() {
    let mut session = session(FakeWallet {
        register_error: true,
        ..FakeWallet::connected()
    });
    let backend = FakeBackend::default();

    session.begin_session_key_registration();
    let _ = session.create_session_key(&backend, "pw").await;

    assert!(!session.is_loading());
}
