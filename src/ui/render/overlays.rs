use crate::gemini::artist::ArtSource;
use crate::gemini::FailureKind;
use crate::plan::RepairStep;
use crate::ui::helpers::{centered_rect, wrap_text};
use crate::ui::theme::Theme;
use crate::ui::{App, ArtStatus, ErrorBanner, NarrationStatus, PickerState};
use crate::util::{format_clock, truncate};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub(super) fn render_help(frame: &mut Frame, scroll: usize) {
    let area = centered_rect(55, 80, frame.area());
    frame.render_widget(Clear, area);

    // Helper functions that return owned data
    fn section_start(title: &str) -> Vec<Line<'static>> {
        vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("    ╭─ ".to_string(), Style::default().fg(Theme::BORDER)),
                Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Theme::PARCHMENT)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    " ─────────────────────────╮".to_string(),
                    Style::default().fg(Theme::BORDER),
                ),
            ]),
        ]
    }

    fn key_row(key: &str, desc: &str) -> Line<'static> {
        Line::from(vec![
            Span::styled("    │  ".to_string(), Style::default().fg(Theme::BORDER)),
            Span::styled(
                format!(" {} ", key),
                Style::default().fg(Theme::BG).bg(Theme::MUTED),
            ),
            Span::styled(format!("  {}", desc), Style::default().fg(Theme::INK)),
        ])
    }

    fn section_end() -> Line<'static> {
        Line::from(vec![Span::styled(
            "    ╰─────────────────────────────────────╯".to_string(),
            Style::default().fg(Theme::BORDER),
        )])
    }

    fn section_spacer() -> Line<'static> {
        Line::from(vec![Span::styled(
            "    │".to_string(),
            Style::default().fg(Theme::BORDER),
        )])
    }

    let mut help_text: Vec<Line<'static>> = vec![Line::from("")];

    help_text.extend(section_start("Navigation"));
    help_text.push(section_spacer());
    help_text.push(key_row("↑↓ / jk", "Move between steps"));
    help_text.push(key_row("Tab", "Switch between steps and chat"));
    help_text.push(key_row("↵", "Open step detail"));
    help_text.push(key_row("Esc", "Go back / close"));
    help_text.push(section_spacer());
    help_text.push(section_end());

    help_text.extend(section_start("Repair Plan"));
    help_text.push(section_spacer());
    help_text.push(key_row("v", "Walkthrough slideshow"));
    help_text.push(key_row("c", "Ask the workshop chat"));
    help_text.push(key_row("n", "Narrate the selected step"));
    help_text.push(key_row("N", "Narrate every step"));
    help_text.push(key_row("x", "Export the plan as HTML"));
    help_text.push(section_spacer());
    help_text.push(section_end());

    help_text.extend(section_start("When Stuck"));
    help_text.push(section_spacer());
    help_text.push(key_row("r", "Retry after a failure"));
    help_text.push(key_row("s", "Enter a new API key"));
    help_text.push(key_row("d", "Switch to the demo workshop"));
    help_text.push(section_spacer());
    help_text.push(section_end());

    help_text.extend(section_start("General"));
    help_text.push(section_spacer());
    help_text.push(key_row("?", "Show help"));
    help_text.push(key_row("q", "Quit"));
    help_text.push(section_spacer());
    help_text.push(section_end());

    let max_lines = (area.height as usize).saturating_sub(2);
    let start = scroll.min(help_text.len().saturating_sub(1));
    let visible = &help_text[start..help_text.len().min(start + max_lines)];

    let block = Paragraph::new(visible.to_vec()).block(
        Block::default()
            .title(" Help ")
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .style(Style::default().bg(Theme::OVERLAY)),
    );

    frame.render_widget(block, area);
}

pub(super) fn render_step_detail(
    frame: &mut Frame,
    app: &App,
    step_index: usize,
    step: &RepairStep,
    scroll: usize,
) {
    let area = centered_rect(70, 75, frame.area());
    frame.render_widget(Clear, area);

    let inner_width = area.width.saturating_sub(12) as usize;

    let outer = Block::default()
        .title(format!(" Step {} ", step_index + 1))
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Style::default().bg(Theme::OVERLAY));
    let inner_area = outer.inner(area);
    frame.render_widget(outer, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)])
        .split(inner_area);

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("    ", Style::default()),
            Span::styled(
                format!(" {} ", step.action.label()),
                Style::default().fg(Theme::BG).bg(Theme::BRASS),
            ),
            Span::styled(
                format!("  {}", step.title),
                Style::default()
                    .fg(Theme::PARCHMENT)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
    ];

    boxed_section(&mut lines, "What to do", inner_width, |lines| {
        for row in wrap_text(&step.description, inner_width.saturating_sub(6)) {
            lines.push(gutter_row(row, Theme::INK));
        }
    });

    if !step.materials.is_empty() {
        lines.push(Line::from(""));
        boxed_section(&mut lines, "From the scrap pile", inner_width, |lines| {
            for item in &step.materials {
                for (i, row) in wrap_text(item, inner_width.saturating_sub(8))
                    .into_iter()
                    .enumerate()
                {
                    let bullet = if i == 0 {
                        format!("{} ", Theme::BULLET_FILLED)
                    } else {
                        "  ".to_string()
                    };
                    lines.push(Line::from(vec![
                        Span::styled("    │  ", Style::default().fg(Theme::BORDER)),
                        Span::styled(bullet, Style::default().fg(Theme::DIM)),
                        Span::styled(row, Style::default().fg(Theme::INK)),
                    ]));
                }
            }
        });
    }

    if !step.rationale.is_empty() {
        lines.push(Line::from(""));
        boxed_section(&mut lines, "Why this works", inner_width, |lines| {
            for row in wrap_text(&step.rationale, inner_width.saturating_sub(6)) {
                lines.push(gutter_row(row, Theme::MUTED));
            }
        });
    }

    lines.push(Line::from(""));
    if let Some(card) = app.steps.get(step_index) {
        lines.push(detail_art_line(card, app));
        lines.push(detail_narration_line(card));
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(body, layout[0]);

    let footer = Paragraph::new(vec![
        Line::from(Span::styled(
            "  ─────────────────────────────────────────────────",
            Style::default().fg(Theme::BORDER),
        )),
        Line::from(vec![
            Span::styled("   ", Style::default()),
            Span::styled(" ↑↓ ", Style::default().fg(Theme::BG).bg(Theme::MUTED)),
            Span::styled(" scroll  ", Style::default().fg(Theme::MUTED)),
            Span::styled(" Esc ", Style::default().fg(Theme::BG).bg(Theme::MUTED)),
            Span::styled(" close", Style::default().fg(Theme::MUTED)),
        ]),
    ]);
    frame.render_widget(footer, layout[1]);
}

fn boxed_section<F>(lines: &mut Vec<Line<'static>>, title: &str, inner_width: usize, fill: F)
where
    F: FnOnce(&mut Vec<Line<'static>>),
{
    let dash_count = inner_width.saturating_sub(8 + title.chars().count());
    lines.push(Line::from(vec![
        Span::styled("    ╭─ ", Style::default().fg(Theme::BORDER)),
        Span::styled(title.to_string(), Style::default().fg(Theme::BRASS)),
        Span::styled(
            " ".to_string() + &"─".repeat(dash_count) + "╮",
            Style::default().fg(Theme::BORDER),
        ),
    ]));
    lines.push(Line::from(vec![Span::styled(
        "    │",
        Style::default().fg(Theme::BORDER),
    )]));
    fill(lines);
    lines.push(Line::from(vec![Span::styled(
        "    │",
        Style::default().fg(Theme::BORDER),
    )]));
    lines.push(Line::from(vec![Span::styled(
        "    ╰".to_string() + &"─".repeat(inner_width.saturating_sub(4)) + "╯",
        Style::default().fg(Theme::BORDER),
    )]));
}

fn gutter_row(text: String, color: ratatui::style::Color) -> Line<'static> {
    Line::from(vec![
        Span::styled("    │  ", Style::default().fg(Theme::BORDER)),
        Span::styled(text, Style::default().fg(color)),
    ])
}

fn detail_art_line(card: &crate::ui::StepCard, app: &App) -> Line<'static> {
    match &card.art {
        ArtStatus::Waiting => Line::from(Span::styled(
            format!("    {} illustration pending", Theme::BULLET_EMPTY),
            Theme::text_dim(),
        )),
        ArtStatus::Rendering => Line::from(vec![
            Span::raw("    "),
            Span::styled(
                app.spinner_glyph().to_string(),
                Style::default().fg(Theme::EMBER),
            ),
            Span::styled(" illustrating", Theme::text_muted()),
        ]),
        ArtStatus::Done { source, path } => {
            let (mark, style) = if *source == ArtSource::Blueprint {
                (Theme::BLUEPRINT_MARK, Style::default().fg(Theme::STEEL))
            } else {
                (Theme::CHECK_MARK, Theme::success())
            };
            let name = path
                .as_deref()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("");
            Line::from(Span::styled(
                format!("    {} {} art  {}", mark, source.label(), name),
                style,
            ))
        }
    }
}

fn detail_narration_line(card: &crate::ui::StepCard) -> Line<'static> {
    match &card.narration {
        NarrationStatus::None => Line::from(""),
        NarrationStatus::Synthesizing => Line::from(Span::styled(
            format!("    {} narrating", Theme::SPEAKER_MARK),
            Style::default().fg(Theme::EMBER),
        )),
        NarrationStatus::Ready {
            path,
            duration_secs,
        } => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");
            Line::from(Span::styled(
                format!(
                    "    {} narration {}  {}",
                    Theme::SPEAKER_MARK,
                    format_clock(*duration_secs),
                    name
                ),
                Theme::success(),
            ))
        }
        NarrationStatus::Unavailable(reason) => Line::from(vec![
            Span::styled(
                format!("    {} narration unavailable", Theme::SPEAKER_MARK),
                Theme::text_dim(),
            ),
            Span::styled(format!("  {}", truncate(reason, 40)), Theme::text_dim()),
        ]),
    }
}

pub(super) fn render_picker(frame: &mut Frame, state: &PickerState) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let outer = Block::default()
        .title(" Choose Photos ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border_active())
        .style(Style::default().bg(Theme::OVERLAY));
    let inner_area = outer.inner(area);
    frame.render_widget(outer, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(2)])
        .split(inner_area);

    let headline = Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  pick the ", Theme::text_muted()),
            Span::styled(
                state.target_label(),
                Style::default()
                    .fg(Theme::EMBER)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" photo", Theme::text_muted()),
        ]),
    ]);
    frame.render_widget(headline, layout[0]);

    let visible = (layout[1].height as usize).max(1);
    let offset = (state.selected + 1).saturating_sub(visible);
    let width = (layout[1].width as usize).saturating_sub(8);

    let mut lines: Vec<Line> = Vec::new();
    if state.files.is_empty() {
        lines.push(Line::from(Span::styled(
            "  no images found under the current directory",
            Theme::text_dim(),
        )));
    }
    for (idx, file) in state.files.iter().enumerate().skip(offset).take(visible) {
        let focused = idx == state.selected;
        let indicator = if focused {
            format!("  {} ", Theme::ARROW_RIGHT)
        } else {
            "    ".to_string()
        };
        let shown = file.display().to_string();
        lines.push(Line::from(vec![
            Span::styled(indicator, Style::default().fg(Theme::EMBER)),
            Span::styled(
                truncate(&shown, width),
                if focused {
                    Style::default()
                        .fg(Theme::PARCHMENT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Theme::text()
                },
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), layout[1]);

    let mut footer_spans = vec![
        Span::styled("   ", Style::default()),
        Span::styled(" j/k ", Style::default().fg(Theme::BG).bg(Theme::MUTED)),
        Span::styled(" move  ", Style::default().fg(Theme::MUTED)),
        Span::styled(" ↵ ", Style::default().fg(Theme::BG).bg(Theme::EMBER)),
        Span::styled(" choose  ", Style::default().fg(Theme::MUTED)),
        Span::styled(" Esc ", Style::default().fg(Theme::BG).bg(Theme::BORDER)),
        Span::styled(" quit", Style::default().fg(Theme::MUTED)),
    ];
    if state.broken.is_some() {
        footer_spans.push(Span::styled(
            format!("   {} broken object chosen", Theme::CHECK_MARK),
            Theme::success(),
        ));
    }
    let footer = Paragraph::new(vec![
        Line::from(Span::styled(
            "  ─────────────────────────────────────────────────",
            Style::default().fg(Theme::BORDER),
        )),
        Line::from(footer_spans),
    ]);
    frame.render_widget(footer, layout[2]);
}

pub(super) fn render_key_entry(frame: &mut Frame, input: &str, error: Option<&str>) {
    let area = centered_rect(55, 35, frame.area());
    frame.render_widget(Clear, area);

    let width = (area.width as usize).saturating_sub(8);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Paste your Gemini API key",
            Style::default()
                .fg(Theme::PARCHMENT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  Keys begin with AIza and are stored in your OS keychain.",
            Theme::text_dim(),
        )),
        Line::from(""),
    ];

    // Long keys scroll left so the tail stays visible while typing
    let shown: String = {
        let chars = input.chars().count();
        if chars > width.saturating_sub(4) {
            input
                .chars()
                .skip(chars - width.saturating_sub(4))
                .collect()
        } else {
            input.to_string()
        }
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!("  {} ", Theme::ARROW_RIGHT),
            Style::default().fg(Theme::EMBER),
        ),
        Span::styled(shown, Theme::text()),
        Span::styled("▌", Style::default().fg(Theme::EMBER)),
    ]));
    lines.push(Line::from(""));

    if let Some(message) = error {
        for row in wrap_text(message, width) {
            lines.push(Line::from(Span::styled(
                format!("  {}", row),
                Theme::error(),
            )));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(vec![
        Span::styled("   ", Style::default()),
        Span::styled(" ↵ ", Style::default().fg(Theme::BG).bg(Theme::EMBER)),
        Span::styled(" save and retry  ", Style::default().fg(Theme::MUTED)),
        Span::styled(" Esc ", Style::default().fg(Theme::BG).bg(Theme::BORDER)),
        Span::styled(" cancel", Style::default().fg(Theme::MUTED)),
    ]));

    let block = Paragraph::new(lines).block(
        Block::default()
            .title(" API Key ")
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Theme::border_active())
            .style(Style::default().bg(Theme::OVERLAY)),
    );
    frame.render_widget(block, area);
}

pub(super) fn render_error_banner(frame: &mut Frame, banner: &ErrorBanner) {
    let area = centered_rect(60, 35, frame.area());
    frame.render_widget(Clear, area);

    let width = (area.width as usize).saturating_sub(8);

    let headline = match banner.kind {
        Some(FailureKind::InvalidKey) => "The workshop key was refused",
        Some(FailureKind::QuotaExceeded) => "The workshop is out of credit",
        Some(FailureKind::ServerUnavailable) => "The workshop line is down",
        Some(FailureKind::Network) => "The workshop is unreachable",
        Some(FailureKind::Blocked) => "The request was declined",
        Some(FailureKind::Malformed) => "The reply could not be read",
        None => "Something went wrong",
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", headline),
            Style::default()
                .fg(Theme::PARCHMENT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for row in wrap_text(&banner.message, width) {
        lines.push(Line::from(Span::styled(
            format!("  {}", row),
            Theme::text(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  ─────────────────────────────────────────────────",
        Style::default().fg(Theme::BORDER),
    )));
    lines.push(Line::from(vec![
        Span::styled("   ", Style::default()),
        Span::styled(" r ", Style::default().fg(Theme::BG).bg(Theme::EMBER)),
        Span::styled(" retry  ", Style::default().fg(Theme::MUTED)),
        Span::styled(" s ", Style::default().fg(Theme::BG).bg(Theme::MUTED)),
        Span::styled(" enter key  ", Style::default().fg(Theme::MUTED)),
        Span::styled(" d ", Style::default().fg(Theme::BG).bg(Theme::STEEL)),
        Span::styled(" demo workshop", Style::default().fg(Theme::MUTED)),
    ]));
    lines.push(Line::from(""));

    let block = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Snag ")
            .title_style(Style::default().fg(Theme::RUST).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Theme::RUST))
            .style(Style::default().bg(Theme::OVERLAY)),
    );
    frame.render_widget(block, area);
}
