use crate::{
    backend::{
        Action,
        GameBackend,
        HttpGameBackend,
    },
    balances::fetch_token_balances,
    config::{
        AppConfig,
        DEFAULT_CONTRACT_NAME,
    },
    error::ApiError,
    indexer_client::IndexerClient,
    session::{
        ActionTicket,
        GameSession,
    },
    table::{
        GameResponse,
        TokenBalances,
    },
    ui::{
        self,
        Chrome,
        UserEvent,
    },
    wallet::keystore::KeystoreWallet,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::time::{
    Duration,
    Instant,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    debug,
    info,
    warn,
};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

enum WorkerEvent {
    ActionSettled {
        ticket: ActionTicket,
        result: std::result::Result<GameResponse, ApiError>,
    },
    Balances(TokenBalances),
}

impl WorkerEvent {
    fn label(&self) -> &'static str {
        match self {
            WorkerEvent::ActionSettled { .. } => "action result",
            WorkerEvent::Balances(_) => "balance sync",
        }
    }
}

/// Hands a worker result to the app loop. Returns `false` once the loop is gone.
fn report(tx: &mpsc::UnboundedSender<WorkerEvent>, event: WorkerEvent) -> bool {
    let label = event.label();
    match tx.send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!(event = label, "worker event dropped: app loop gone");
            false
        }
    }
}

struct Services {
    backend: HttpGameBackend,
    indexer: IndexerClient,
    contract: String,
    worker_tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl Services {
    fn submit(&self, session: &mut GameSession<KeystoreWallet>, action: Action) {
        let ticket = match session.prepare(action) {
            Ok(ticket) => ticket,
            Err(err) => {
                debug!(%err, %action, "action not sent");
                return;
            }
        };
        let backend = self.backend.clone();
        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let result = backend.submit(ticket.request()).await;
            report(&tx, WorkerEvent::ActionSettled { ticket, result });
        });
    }

    fn refresh_balances(&self, session: &GameSession<KeystoreWallet>) {
        let Some(identity) = session.identity().map(str::to_owned) else {
            return;
        };
        let indexer = self.indexer.clone();
        let contract = self.contract.clone();
        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let balances = fetch_token_balances(&indexer, &contract, &identity).await;
            report(&tx, WorkerEvent::Balances(balances));
        });
    }
}

pub async fn run_app(config: AppConfig, wallet: KeystoreWallet) -> Result<()> {
    let backend = HttpGameBackend::new(config.api_url.as_str())
        .wrap_err("failed to set up game backend client")?;
    let indexer = IndexerClient::new(config.indexer_url.as_str())
        .wrap_err("failed to set up indexer client")?;
    let contract = match backend.config().await {
        Ok(remote) => remote.contract_name,
        Err(err) => {
            warn!(?err, "could not fetch backend config; using default contract");
            DEFAULT_CONTRACT_NAME.to_string()
        }
    };
    info!(%backend, %indexer, node = %config.node_url, %contract, "starting ezcasino");

    let mut session = GameSession::new(wallet);
    if let Err(err) = session.resume(&indexer, &contract).await {
        warn!(%err, "starting without a resumed table");
    }

    let (worker_tx, worker_rx) = mpsc::unbounded_channel();
    let services = Services {
        backend,
        indexer,
        contract: contract.clone(),
        worker_tx,
    };
    let chrome = Chrome {
        contract,
        faucet_url: config.faucet_url.to_string(),
    };

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();
    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(
        &services,
        session,
        worker_rx,
        &mut ui_state,
        &mut input_events,
        &chrome,
    )
    .await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    services: &Services,
    mut session: GameSession<KeystoreWallet>,
    mut worker_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
    chrome: &Chrome,
) -> Result<()> {
    services.refresh_balances(&session);
    let mut ticker = time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            Some(event) = worker_rx.recv() => match event {
                WorkerEvent::ActionSettled { ticket, result } => {
                    // Failures land in the session's error banner.
                    let _ = session.complete(ticket, result, Instant::now());
                }
                WorkerEvent::Balances(balances) => session.apply_balances(balances),
            },
            _ = ticker.tick() => {
                if session.tick(Instant::now()) {
                    services.refresh_balances(&session);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, exiting");
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    UserEvent::Quit => break,
                    UserEvent::Deal => {
                        let bet = session.bet();
                        services.submit(&mut session, Action::Start { bet });
                    }
                    UserEvent::Hit => services.submit(&mut session, Action::Hit),
                    UserEvent::Stand => services.submit(&mut session, Action::Stand),
                    UserEvent::DoubleDown => services.submit(&mut session, Action::DoubleDown),
                    UserEvent::SetBet(amount) => {
                        let _ = session.set_bet(amount);
                    }
                    UserEvent::Deposit(amount) => {
                        services.submit(&mut session, Action::Deposit { amount });
                    }
                    UserEvent::Withdraw(amount, token) => {
                        services.submit(&mut session, Action::Withdraw { amount, token });
                    }
                    UserEvent::CreateSessionKey(password) => {
                        session.begin_session_key_registration();
                        ui::draw(ui_state, &session.view(Instant::now()), chrome)
                            .wrap_err("draw before session key registration failed")?;
                        if let Err(err) = session
                            .create_session_key(&services.backend, &password)
                            .await
                        {
                            debug!(%err, "session key flow stopped");
                        }
                        services.refresh_balances(&session);
                    }
                    UserEvent::Refresh => {
                        if let Err(err) = session.resume(&services.indexer, &services.contract).await {
                            warn!(%err, "refresh failed");
                        }
                        services.refresh_balances(&session);
                    }
                    UserEvent::DismissNotification => {
                        if let Some(id) = session.notifications().latest().map(|n| n.id) {
                            session.notifications_mut().remove(id);
                        }
                    }
                    UserEvent::ClearError => session.dismiss_error(),
                    UserEvent::Disconnect => session.disconnect(),
                    UserEvent::Redraw => {}
                }
            }
        }
        ui::draw(ui_state, &session.view(Instant::now()), chrome).wrap_err("draw failed")?;
    }
    info!("app loop finished");
    Ok(())
}
