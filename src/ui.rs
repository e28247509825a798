use crate::{
    notifications::NOTIFICATION_STACK_OFFSET,
    session::{
        CardView,
        EffectKind,
        HandView,
        Phase,
        RoundPhase,
        SessionView,
    },
    table::Token,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Deal,
    Hit,
    Stand,
    DoubleDown,
    SetBet(u64),
    Deposit(u64),
    Withdraw(u64, Token),
    CreateSessionKey(String),
    Refresh,
    DismissNotification,
    ClearError,
    Disconnect,
    Redraw,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AmountKind {
    Bet,
    Deposit,
    Withdraw(Token),
}

impl AmountKind {
    fn title(self) -> String {
        match self {
            AmountKind::Bet => "Set Bet".to_string(),
            AmountKind::Deposit => "Deposit oranj".to_string(),
            AmountKind::Withdraw(token) => format!("Withdraw {token}"),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    AmountModal {
        kind: AmountKind,
        input: String,
    },
    PasswordModal(String),
    QuitModal,
}

/// Static context shown alongside the session.
#[derive(Clone, Debug, Default)]
pub struct Chrome {
    pub contract: String,
    pub faucet_url: String,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, view: &SessionView, chrome: &Chrome) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, view, chrome))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to what the player asked for, updating modal
/// input along the way.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let Event::Key(key) = event else {
        return match event {
            Event::Resize(..) => Some(UserEvent::Redraw),
            _ => None,
        };
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match &mut state.mode {
        Mode::Normal => interpret_normal(state, key),
        Mode::AmountModal { kind, input } => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let kind = *kind;
                let amount = input.parse::<u64>().ok();
                state.mode = Mode::Normal;
                let Some(amount) = amount else {
                    return Some(UserEvent::Redraw);
                };
                Some(match kind {
                    AmountKind::Bet => UserEvent::SetBet(amount),
                    AmountKind::Deposit => UserEvent::Deposit(amount),
                    AmountKind::Withdraw(token) => UserEvent::Withdraw(amount, token),
                })
            }
            KeyCode::Backspace => {
                input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() && input.len() < 18 => {
                input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::PasswordModal(input) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let password = std::mem::take(input);
                state.mode = Mode::Normal;
                Some(UserEvent::CreateSessionKey(password))
            }
            KeyCode::Backspace => {
                input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
    }
}

fn interpret_normal(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    let open_amount = |kind| Mode::AmountModal {
        kind,
        input: String::new(),
    };
    let event = match key.code {
        KeyCode::Char('q') => {
            state.mode = Mode::QuitModal;
            UserEvent::Redraw
        }
        KeyCode::Char('d') => UserEvent::Deal,
        KeyCode::Char('h') => UserEvent::Hit,
        KeyCode::Char('s') => UserEvent::Stand,
        KeyCode::Char('x') => UserEvent::DoubleDown,
        KeyCode::Char('b') => {
            state.mode = open_amount(AmountKind::Bet);
            UserEvent::Redraw
        }
        KeyCode::Char('p') => {
            state.mode = open_amount(AmountKind::Deposit);
            UserEvent::Redraw
        }
        KeyCode::Char('w') => {
            state.mode = open_amount(AmountKind::Withdraw(Token::Oranj));
            UserEvent::Redraw
        }
        KeyCode::Char('v') => {
            state.mode = open_amount(AmountKind::Withdraw(Token::Vitamin));
            UserEvent::Redraw
        }
        KeyCode::Char('k') => {
            state.mode = Mode::PasswordModal(String::new());
            UserEvent::Redraw
        }
        KeyCode::Char('r') => UserEvent::Refresh,
        KeyCode::Char('n') => UserEvent::DismissNotification,
        KeyCode::Char('c') => UserEvent::ClearError,
        KeyCode::Char('o') => UserEvent::Disconnect,
        _ => return None,
    };
    Some(event)
}

fn ui(f: &mut Frame, state: &UiState, view: &SessionView, chrome: &Chrome) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // wallet + balances
            Constraint::Min(8),    // table
            Constraint::Length(4), // status / errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], view, chrome);
    draw_table(f, chunks[1], view);
    draw_status(f, chunks[2], view);
    draw_help(f, chunks[3], view);
    draw_notifications(f, view);
    draw_modals(f, state, view);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, view: &SessionView, chrome: &Chrome) {
    let account = view.address.as_deref().unwrap_or("not connected");
    let session = view.session_key.as_deref().unwrap_or("none");
    let mut lines = vec![Line::from(format!(
        "Account: {account} | Session key: {session} | Contract: {}",
        chrome.contract
    ))];
    match view.balances {
        Some(b) => lines.push(Line::from(format!(
            "Wallet: {} oranj, {} vitamin | In game: {} oranj deposited, {} vitamin earned",
            b.oranj_balance.unwrap_or_default(),
            b.vit_balance.unwrap_or_default(),
            b.oranj_deposited.unwrap_or_default(),
            b.vit_earned.unwrap_or_default(),
        ))),
        None => lines.push(Line::from("Balances: loading...")),
    }
    lines.push(Line::styled(
        format!("Need oranj? Faucet: {}", chrome.faucet_url),
        Style::default().fg(Color::DarkGray),
    ));
    let block = Block::default().borders(Borders::ALL).title("Wallet");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_table(f: &mut Frame, area: Rect, view: &SessionView) {
    let title = match view.phase {
        Phase::NoWallet => "Blackjack (connect a wallet)",
        Phase::WalletConnectedNoSession => "Blackjack (press k to create a session key)",
        Phase::SessionReady(RoundPhase::Betting) => "Blackjack (place your bet)",
        Phase::SessionReady(RoundPhase::InRound) => "Blackjack (your move)",
        Phase::SessionReady(RoundPhase::RoundOver) => "Blackjack (round over)",
    };
    let mut lines = vec![
        hand_line("Dealer", &view.dealer),
        Line::from(""),
        hand_line("You   ", &view.player),
        Line::from(""),
        Line::from(format!(
            "Bet: ${} | Table balance: {}",
            view.bet,
            view.table_balance
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string())
        )),
    ];
    if let Some(effect) = view.effect {
        let (text, color) = match effect {
            EffectKind::Win => ("*** YOU WIN! ***", Color::Green),
            EffectKind::Lose => ("*** YOU LOSE ***", Color::Red),
        };
        lines.push(Line::from(""));
        lines.push(Line::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn hand_line(label: &str, hand: &HandView) -> Line<'static> {
    let mut spans = vec![Span::raw(format!("{label}: "))];
    for card in &hand.cards {
        let span = match card {
            CardView::FaceUp(card) => {
                let color = if card.suit.is_red() {
                    Color::Red
                } else {
                    Color::White
                };
                Span::styled(format!("[{card}] "), Style::default().fg(color))
            }
            CardView::FaceDown => Span::styled("[??] ", Style::default().fg(Color::Blue)),
        };
        spans.push(span);
    }
    if let Some(total) = hand.total {
        spans.push(Span::raw(format!("({total})")));
    }
    Line::from(spans)
}

fn draw_status(f: &mut Frame, area: Rect, view: &SessionView) {
    let mut lines = Vec::new();
    if view.loading {
        lines.push(Line::from("Waiting for transaction..."));
    }
    if let Some(error) = &view.error {
        lines.push(Line::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ));
        if view.deposit_prompt {
            lines.push(Line::from("Press p to deposit more oranj."));
        } else if view.offer_new_deal {
            lines.push(Line::from("Press d to deal a NEW GAME."));
        }
    }
    let block = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_help(f: &mut Frame, area: Rect, view: &SessionView) {
    let help = match view.phase {
        Phase::NoWallet => "q quit",
        Phase::WalletConnectedNoSession => "k session key | r refresh | o disconnect | q quit",
        Phase::SessionReady(_) => {
            "d deal | h hit | s stand | x double | b bet | p deposit | w/v withdraw oranj/vitamin | k key | r refresh | n dismiss | c clear | o disconnect | q quit"
        }
    };
    let block = Block::default().borders(Borders::ALL).title("Keys");
    f.render_widget(Paragraph::new(help).block(block), area);
}

fn draw_notifications(f: &mut Frame, view: &SessionView) {
    let area = f.area();
    let width = 34.min(area.width);
    for notification in &view.notifications {
        // Toasts stack downwards from the top-right corner.
        let y = area.y.saturating_add(1).saturating_add(notification.offset);
        if y.saturating_add(NOTIFICATION_STACK_OFFSET) > area.bottom() {
            break;
        }
        let rect = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height: NOTIFICATION_STACK_OFFSET,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Transaction sent")
            .border_style(Style::default().fg(Color::Green));
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(notification.short_hash.clone()).block(block),
            rect,
        );
    }
}

fn draw_modals(f: &mut Frame, state: &UiState, view: &SessionView) {
    let (title, body) = match &state.mode {
        Mode::AmountModal { kind, input } => {
            let hint = match kind {
                AmountKind::Bet => format!("Current bet: {}\n", view.bet),
                _ => String::new(),
            };
            (
                kind.title(),
                format!("{hint}Amount: {input}\nEnter=confirm Esc=cancel"),
            )
        }
        Mode::PasswordModal(input) => (
            "Create Session Key".to_string(),
            format!(
                "Wallet password: {}\nEnter=confirm Esc=cancel",
                "*".repeat(input.chars().count())
            ),
        ),
        Mode::QuitModal => ("Confirm Quit".to_string(), "Quit the game? (Y/N)".to_string()),
        Mode::Normal => return,
    };
    let area = centered_rect(50, 25, f.area());
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new(body), block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
