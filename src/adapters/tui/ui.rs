use crate::adapters::tui::app::{
    AccessKeysField, ActiveModal, AuthTab, FormPhase, TuiApp,
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
};

const BANNER: &str = r"
                                 _
  __ ___      _____ _ __   ___  ___| |_
 / _` \ \ /\ / / __| '_ \ / _ \/ __| __|
| (_| |\ V  V /\__ \ |_) |  __/ (__| |_
 \__,_| \_/\_/ |___/ .__/ \___|\___|\__|
                   |_|
";

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub(crate) fn draw(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)])
        .split(frame.area());

    draw_header_panel(frame, app, chunks[0]);
    draw_banner(frame, chunks[1]);

    match app.active_modal {
        Some(ActiveModal::Auth) => draw_auth_modal(frame, app),
        Some(ActiveModal::Sso) => draw_sso_modal(frame, app),
        Some(ActiveModal::Error) => draw_error_modal(frame, app),
        Some(ActiveModal::Help) => draw_help_popup(frame),
        None => {}
    }
}

fn header_line<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:>18}: "), Style::default().fg(Color::Yellow)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

fn draw_header_panel(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let d = &app.header.data;
    let lines = vec![
        header_line("Profile", &d.profile),
        header_line("Region", &d.region),
        header_line("Account ID", &d.account_id),
        header_line("SSO Role", &d.sso_role_name),
        header_line("Assumed Role ARN", &d.assume_role_arn),
        header_line("Access Key ID", &d.access_key_id),
        header_line("Credentials From", &d.credentials_source),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .title(" AWS Session ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(panel, area);
}

fn draw_banner(frame: &mut Frame<'_>, area: Rect) {
    let lines: Vec<Line<'_>> = BANNER
        .lines()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::DarkGray))))
        .chain(std::iter::once(Line::from("")))
        .chain(std::iter::once(Line::from(Span::styled(
            "Ctrl+A auth  Ctrl+S sso  Ctrl+H help  Ctrl+C quit",
            Style::default().fg(Color::DarkGray),
        ))))
        .collect();
    let banner = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(banner, area);
}

fn draw_auth_modal(frame: &mut Frame<'_>, app: &TuiApp) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Authentication (Esc to close) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let selected_tab = match app.auth_modal.tab {
        AuthTab::ChangeProfile => 0,
        AuthTab::SetAccessKeys => 1,
    };
    let tabs = Tabs::new(vec!["Change Profile", "Set Access Keys"])
        .select(selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunks[0]);

    match app.auth_modal.tab {
        AuthTab::ChangeProfile => draw_profile_select(frame, app, chunks[1]),
        AuthTab::SetAccessKeys => draw_access_keys_form(frame, app, chunks[1]),
    }
}

fn draw_profile_select(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let view = &app.auth_modal.profile_select;
    match view.phase {
        FormPhase::Input => {
            let items = profile_list_items(&view.profiles, view.selected);
            let list = List::new(items).block(
                Block::default()
                    .title(" Select a profile (Enter to apply) ")
                    .borders(Borders::ALL),
            );
            frame.render_widget(list, area);
        }
        FormPhase::Working => draw_phase_message(frame, area, "Switching profile...", Color::Cyan),
        FormPhase::Success => {
            draw_phase_message(frame, area, "Profile changed. Press Enter.", Color::Green);
        }
    }
}

fn draw_access_keys_form(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let view = &app.auth_modal.access_keys;
    match view.phase {
        FormPhase::Working => {
            draw_phase_message(frame, area, "Validating access keys...", Color::Cyan);
            return;
        }
        FormPhase::Success => {
            draw_phase_message(frame, area, "Access keys applied. Press Enter.", Color::Green);
            return;
        }
        FormPhase::Input => {}
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let field_style = |field: AccessKeysField| {
        if view.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let key_id = Paragraph::new(view.key_id.as_str()).block(
        Block::default()
            .title("Access Key ID")
            .borders(Borders::ALL)
            .border_style(field_style(AccessKeysField::KeyId)),
    );
    frame.render_widget(key_id, chunks[0]);

    let masked = "*".repeat(view.secret.chars().count());
    let secret = Paragraph::new(masked).block(
        Block::default()
            .title("Secret Access Key")
            .borders(Borders::ALL)
            .border_style(field_style(AccessKeysField::Secret)),
    );
    frame.render_widget(secret, chunks[1]);

    let submit = Paragraph::new(Span::styled(
        "[ Apply ]",
        field_style(AccessKeysField::Submit).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(submit, chunks[2]);
}

fn draw_sso_modal(frame: &mut Frame<'_>, app: &TuiApp) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);

    let border_color = if app.sso_modal.must_reauth {
        Color::Red
    } else {
        Color::Yellow
    };
    let block = Block::default()
        .title(" SSO Reauthentication (Esc to close) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let prompt = Paragraph::new(app.sso_modal.prompt.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(prompt, chunks[0]);

    match app.sso_modal.phase {
        FormPhase::Input => {
            let items = profile_list_items(&app.sso_modal.profiles, app.sso_modal.selected);
            let list = List::new(items).block(
                Block::default()
                    .title(" Profile to log in (Enter to run) ")
                    .borders(Borders::ALL),
            );
            frame.render_widget(list, chunks[1]);
        }
        FormPhase::Working => draw_phase_message(
            frame,
            chunks[1],
            "Running aws sso login, finish in your browser...",
            Color::Cyan,
        ),
        FormPhase::Success => draw_phase_message(
            frame,
            chunks[1],
            "SSO session refreshed. Press Enter.",
            Color::Green,
        ),
    }
}

fn draw_error_modal(frame: &mut Frame<'_>, app: &TuiApp) {
    let area = centered_rect(50, 30, frame.area());
    frame.render_widget(Clear, area);

    let message = Paragraph::new(app.error_modal.message.as_str())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Error (Enter to dismiss) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(message, area);
}

fn draw_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(50, 50, frame.area());
    frame.render_widget(Clear, area);

    let lines: Vec<Line<'_>> = vec![
        Line::from("Hotkeys:"),
        Line::from("  Ctrl+A       : Toggle authentication modal"),
        Line::from("  Ctrl+S       : Toggle SSO reauthentication modal"),
        Line::from("  Ctrl+H       : Toggle this help"),
        Line::from("  Ctrl+C       : Quit"),
        Line::from("  Up/Down      : Navigate lists and form fields"),
        Line::from("  Tab          : Switch authentication tab"),
        Line::from("  Enter        : Confirm selection / submit / next field"),
        Line::from("  Esc          : Close the active modal"),
    ];
    let popup = Paragraph::new(lines).block(
        Block::default()
            .title(" Help (Esc to close) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(popup, area);
}

fn profile_list_items(profiles: &[String], selected: usize) -> Vec<ListItem<'_>> {
    profiles
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == selected {
                ListItem::new(format!("> {name}")).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ListItem::new(format!("  {name}"))
            }
        })
        .collect()
}
