use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};

use candy_drop::eligibility::EndCondition;

use crate::app::{self, App, Screen};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // title bar
            Constraint::Min(10),    // main content
            Constraint::Length(3),  // action bar
            Constraint::Length(6),  // message log
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);

    match app.screen {
        Screen::Dashboard => draw_dashboard(frame, app, chunks[1]),
        Screen::Confirm => draw_confirm(frame, app, chunks[1]),
        Screen::Verify => draw_verify(frame, app, chunks[1]),
    }

    draw_action_bar(frame, app, chunks[2]);
    draw_message_log(frame, app, chunks[3]);
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let wallet = app
        .wallet
        .public_key()
        .map(|pk| app::short_pubkey(&pk))
        .unwrap_or_else(|| "not connected".into());
    let refresh_str = app
        .last_refresh
        .map(|t| format!("{}s ago", t.elapsed().as_secs()))
        .unwrap_or_else(|| "never".into());

    let title = format!(
        " Candy Drop | Wallet: {} | Last refresh: {} ",
        wallet, refresh_str,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);
}

fn draw_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12), // drop panel
            Constraint::Min(5),     // gallery
        ])
        .split(area);

    draw_drop_panel(frame, app, chunks[0]);
    draw_gallery(frame, app, chunks[1]);
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::Gray))
}

fn flag(on: bool) -> Span<'static> {
    if on {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("no", Style::default().fg(Color::DarkGray))
    }
}

fn draw_drop_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Drop ")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.wallet.public_key().is_none() {
        let text = Paragraph::new("  Wallet not connected. Press [c] to connect.");
        frame.render_widget(text, inner);
        return;
    }

    let Some(snap) = &app.snapshot else {
        let text = match &app.refresh_error {
            Some(err) => Paragraph::new(format!("  {}", err))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false }),
            None => Paragraph::new("  Waiting for drop state. Press [r] to refresh."),
        };
        frame.render_widget(text, inner);
        return;
    };
    let (config, state) = (&snap.config, &snap.state);

    let now = app::unix_now();
    let go_live = match config.go_live_date {
        Some(t) if t > now => format!("in {}", app::format_duration(t - now)),
        Some(_) => "live".to_string(),
        None => "not scheduled".to_string(),
    };
    let end = match config.end_condition {
        Some(EndCondition::Date(t)) if t > now => format!("ends in {}", app::format_duration(t - now)),
        Some(EndCondition::Date(_)) => "ended".to_string(),
        Some(EndCondition::Amount(n)) => format!("capped at {}", n),
        None => String::new(),
    };

    let price_color = if state.is_valid_balance {
        Color::Green
    } else {
        Color::Red
    };
    let mut lines = vec![
        Line::from(vec![
            label("  Candy Machine: "),
            Span::raw(app::short_pubkey(&config.id)),
            Span::raw("    "),
            label("Go live: "),
            Span::raw(go_live),
            Span::raw("  "),
            Span::styled(end, Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![
            label("  Remaining: "),
            Span::styled(
                format!("{}/{}", state.items_remaining, config.items_available),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            label("Price: "),
            Span::styled(
                format!("{} SOL", app::lamports_to_sol(state.user_price)),
                Style::default().fg(price_color),
            ),
        ]),
        Line::from(vec![
            label("  Active: "),
            flag(state.is_active),
            Span::raw("   "),
            label("Presale: "),
            flag(state.is_presale),
            Span::raw("   "),
            label("Whitelisted: "),
            flag(state.is_whitelist_user),
            Span::raw("   "),
            label("Whitelist only: "),
            flag(state.is_whitelist_only),
        ]),
    ];
    if let Some(gk) = &config.gatekeeper {
        lines.push(Line::from(vec![
            label("  Gatekeeper: "),
            Span::raw(app::short_pubkey(&gk.network)),
        ]));
    }
    if state.needs_setup_transaction {
        lines.push(Line::from(Span::styled(
            format!("  Mint needs a setup transaction (~{} bytes)", state.estimated_tx_size),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let button_style = if app.can_mint() {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!(" {} ", state.button_label(app.is_minting())), button_style),
    ]));

    if let Some(attempt) = &app.last_attempt {
        let color = if attempt.outcome.is_success() {
            Color::Green
        } else {
            Color::Red
        };
        lines.push(Line::from(vec![
            label("  Last mint: "),
            Span::styled(attempt.outcome.message(), Style::default().fg(color)),
        ]));
    }

    let para = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}

fn draw_gallery(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Your NFTs ({}) ", app.gallery.len()))
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.gallery.is_empty() {
        let text = Paragraph::new("  No NFTs found. Press [g] to reload.");
        frame.render_widget(text, inner);
        return;
    }

    let header = Row::new(vec!["Name", "Mint", "Image"])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(0);

    let rows: Vec<Row> = app
        .gallery
        .iter()
        .map(|item| {
            Row::new(vec![
                item.name.clone(),
                item.mint.clone(),
                item.image.clone(),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(24),
        Constraint::Length(46),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, widths).header(header);
    frame.render_widget(table, inner);
}

fn draw_confirm(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm Mint ")
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = vec![Line::from("")];

    if let Some(snap) = &app.snapshot {
        lines.push(Line::from(format!(
            "  Mint 1 NFT from {} for {} SOL",
            app::short_pubkey(&snap.config.id),
            app::lamports_to_sol(snap.state.user_price),
        )));
        if let Some(mint) = snap.config.token_mint {
            lines.push(Line::from(format!(
                "  Paid in SPL token {}",
                app::short_pubkey(&mint)
            )));
        }
        if snap.state.is_whitelist_user {
            lines.push(Line::from("  Whitelist token will be used"));
        }
        let txs = if snap.state.needs_setup_transaction {
            "2 (setup + mint)"
        } else {
            "1"
        };
        lines.push(Line::from(format!("  Transactions: {}", txs)));
        if snap.config.gatekeeper.is_some() {
            lines.push(Line::from("  Identity verification may be required"));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press [Y] to confirm and send, [N] or [Esc] to cancel",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )));

    let para = Paragraph::new(Text::from(lines));
    frame.render_widget(para, inner);
}

fn draw_verify(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Identity Verification ")
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let prompt = app.verification_prompt.as_deref().unwrap_or("");
    let lines = vec![
        Line::from(""),
        Line::from("  This drop requires a gateway token. Open the link below to verify:"),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", prompt),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Waiting for the token... minting continues automatically.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let para = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}

fn draw_action_bar(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Actions ")
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = match app.screen {
        Screen::Confirm => Line::from(vec![
            action_key("[Y]"), action_label("Confirm  "),
            action_key("[N]"), action_label("Cancel"),
        ]),
        Screen::Verify => Line::from(vec![
            action_key("[Esc]"), action_label("Abandon  "),
            action_key("[q]"), action_label("Quit"),
        ]),
        Screen::Dashboard => {
            let mut spans = Vec::new();
            if app.wallet.public_key().is_none() {
                spans.extend([action_key("[c]"), action_label("onnect  ")]);
            }
            if app.can_mint() {
                spans.extend([action_key("[m]"), action_label("int  ")]);
            }
            if app.wallet.public_key().is_some() {
                spans.extend([action_key("[g]"), action_label("allery  ")]);
            }
            spans.extend([action_key("[r]"), action_label("efresh  ")]);
            spans.extend([action_key("[q]"), action_label("uit")]);
            Line::from(spans)
        }
    };

    let para = Paragraph::new(line);
    frame.render_widget(para, inner);
}

fn action_key(key: &str) -> Span<'_> {
    Span::styled(key, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

fn action_label(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::White))
}

fn draw_message_log(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Log ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = app
        .message_log
        .iter()
        .map(|m| Line::from(format!(" > {}", m)))
        .collect();

    let width = inner.width as usize;
    let total_rows: usize = lines
        .iter()
        .map(|line| {
            let len = line.width();
            if width == 0 { 1 } else { 1_usize.max(len.div_ceil(width)) }
        })
        .sum();

    let scroll = (total_rows as u16).saturating_sub(inner.height);

    let para = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(para, inner);
}
