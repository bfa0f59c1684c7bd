use crate::gemini::artist::ArtSource;
use crate::gemini::chat::ChatRole;
use crate::plan::RepairStep;
use crate::ui::theme::Theme;
use crate::ui::{
    helpers, markdown, ActivePanel, App, ArtStatus, InputMode, LoadingState, NarrationStatus,
    StepCard,
};
use crate::util::{format_clock, truncate};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub(super) fn render_workbench(frame: &mut Frame, area: Rect, app: &App) {
    if app.plan.is_none() {
        render_intake(frame, area, app);
        return;
    }

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(area);

    render_bench_notes(frame, halves[0], app);

    if app.active_panel == ActivePanel::Chat {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(halves[1]);
        render_steps(frame, rows[0], app);
        render_chat(frame, rows[1], app);
    } else {
        render_steps(frame, halves[1], app);
    }
}

/// Before a plan exists the whole area is a status card: which photos are
/// loaded and what the pipeline is doing with them.
fn render_intake(frame: &mut Frame, area: Rect, app: &App) {
    let card = helpers::centered_rect(64, 46, area);

    let mut lines = vec![Line::from("")];

    let status = match app.loading {
        LoadingState::PreparingPhotos => Some("preparing photos"),
        LoadingState::ConsultingAnalyst => Some("consulting the analyst"),
        _ => None,
    };
    match status {
        Some(phrase) => {
            lines.push(Line::from(vec![
                Span::styled(app.spinner_glyph().to_string(), Style::default().fg(Theme::EMBER)),
                Span::styled(format!(" {}", phrase), Theme::text()),
            ]));
        }
        None if app.error.is_some() => {
            lines.push(Line::from(Span::styled(
                "the workshop hit a snag",
                Style::default().fg(Theme::RUST),
            )));
        }
        None => {
            lines.push(Line::from(Span::styled("waiting for photos", Theme::text_dim())));
        }
    }

    lines.push(Line::from(""));
    lines.push(photo_line("broken object", app.broken_path.as_deref()));
    lines.push(photo_line("scrap pile", app.scrap_path.as_deref()));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "two photos in, one repair plan out",
        Theme::text_dim(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Theme::panel_bg());
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, card);
}

fn photo_line(label: &str, path: Option<&std::path::Path>) -> Line<'static> {
    match path {
        Some(p) => {
            let name = p
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo")
                .to_string();
            Line::from(vec![
                Span::styled(format!("{:14}", label), Theme::text_muted()),
                Span::styled(truncate(&name, 36), Theme::text()),
            ])
        }
        None => Line::from(vec![
            Span::styled(format!("{:14}", label), Theme::text_muted()),
            Span::styled("not chosen yet", Theme::text_dim()),
        ]),
    }
}

fn render_bench_notes(frame: &mut Frame, area: Rect, app: &App) {
    let Some(plan) = &app.plan else { return };
    let width = (area.width as usize).saturating_sub(4).max(16);

    let mut lines: Vec<Line> = Vec::new();
    for row in helpers::wrap_text(&plan.title, width) {
        lines.push(Line::from(Span::styled(
            row,
            Style::default()
                .fg(Theme::PARCHMENT)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    for row in helpers::wrap_text(&plan.summary, width) {
        lines.push(Line::from(Span::styled(row, Theme::text())));
    }

    push_section(&mut lines, "DAMAGE", &plan.damage_report, width);
    push_section(&mut lines, "SCRAP ON HAND", &plan.scrap_inventory, width);

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("SESSION", Theme::title())));
    if let Some(session) = &app.session {
        lines.push(Line::from(Span::styled(
            truncate(&session.dir.display().to_string(), width),
            Theme::text_dim(),
        )));
    }
    if let Some(export) = &app.export_path {
        lines.push(Line::from(vec![
            Span::styled("exported ", Theme::success()),
            Span::styled(
                truncate(&export.display().to_string(), width.saturating_sub(9)),
                Theme::text_muted(),
            ),
        ]));
    }
    if app.blueprint_count() > 0 {
        lines.push(Line::from(Span::styled(
            format!("{} step(s) fell back to blueprint art", app.blueprint_count()),
            Theme::text_dim(),
        )));
    }

    let block = Block::default()
        .title(" Bench Notes ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Theme::panel_bg());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn push_section(lines: &mut Vec<Line<'static>>, label: &'static str, body: &str, width: usize) {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(label, Theme::title())));
    for row in helpers::wrap_text(body, width) {
        lines.push(Line::from(Span::styled(row, Theme::text_muted())));
    }
}

fn render_steps(frame: &mut Frame, area: Rect, app: &App) {
    let Some(plan) = &app.plan else { return };

    let steps_active = app.active_panel == ActivePanel::Steps;
    let title = format!(
        " Repair Steps ({} of {} illustrated) ",
        app.rendered_count(),
        plan.steps.len()
    );
    let block = Block::default()
        .title(title)
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(if steps_active {
            Theme::border_active()
        } else {
            Theme::border()
        })
        .style(Theme::panel_bg());

    let inner_width = (area.width as usize).saturating_sub(4);
    let visible = (area.height as usize).saturating_sub(2).max(1);
    let offset = (app.selected_step + 1).saturating_sub(visible);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, step) in plan.steps.iter().enumerate().skip(offset).take(visible) {
        let Some(card) = app.steps.get(idx) else { break };
        let selected = idx == app.selected_step && steps_active;
        lines.push(step_line(idx, step, card, selected, app, inner_width));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn step_line(
    idx: usize,
    step: &RepairStep,
    card: &StepCard,
    selected: bool,
    app: &App,
    width: usize,
) -> Line<'static> {
    let mut spans = Vec::new();

    if selected {
        spans.push(Span::styled(
            format!("{} ", Theme::ARROW_RIGHT),
            Style::default().fg(Theme::EMBER),
        ));
    } else {
        spans.push(Span::raw("  "));
    }

    spans.push(Span::styled(
        format!("{:>2} ", idx + 1),
        if selected {
            Style::default()
                .fg(Theme::EMBER)
                .add_modifier(Modifier::BOLD)
        } else {
            Theme::text_dim()
        },
    ));

    spans.push(art_glyph(card, app));
    spans.push(Span::raw(" "));

    spans.push(Span::styled(
        format!("[{}] ", step.action.label()),
        Style::default().fg(Theme::BRASS),
    ));

    let narration = narration_suffix(card);
    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let narration_len: usize = narration.iter().map(|s| s.content.chars().count()).sum();
    let room = width.saturating_sub(used + narration_len).max(8);
    spans.push(Span::styled(
        truncate(&step.title, room),
        if selected {
            Style::default()
                .fg(Theme::PARCHMENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Theme::text()
        },
    ));
    spans.extend(narration);

    Line::from(spans)
}

fn art_glyph(card: &StepCard, app: &App) -> Span<'static> {
    match &card.art {
        ArtStatus::Waiting => Span::styled(
            Theme::BULLET_EMPTY.to_string(),
            Theme::text_dim(),
        ),
        ArtStatus::Rendering => Span::styled(
            app.spinner_glyph().to_string(),
            Style::default().fg(Theme::EMBER),
        ),
        ArtStatus::Done {
            source: ArtSource::Blueprint,
            ..
        } => Span::styled(
            Theme::BLUEPRINT_MARK.to_string(),
            Style::default().fg(Theme::STEEL),
        ),
        ArtStatus::Done { .. } => Span::styled(
            Theme::CHECK_MARK.to_string(),
            Theme::success(),
        ),
    }
}

fn narration_suffix(card: &StepCard) -> Vec<Span<'static>> {
    match &card.narration {
        NarrationStatus::None => Vec::new(),
        NarrationStatus::Synthesizing => vec![Span::styled(
            format!(" {} ...", Theme::SPEAKER_MARK),
            Style::default().fg(Theme::EMBER),
        )],
        NarrationStatus::Ready { duration_secs, .. } => vec![Span::styled(
            format!(" {} {}", Theme::SPEAKER_MARK, format_clock(*duration_secs)),
            Theme::success(),
        )],
        NarrationStatus::Unavailable(_) => vec![Span::styled(
            format!(" {} {}", Theme::SPEAKER_MARK, Theme::CROSS_MARK),
            Theme::text_dim(),
        )],
    }
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App) {
    let chat_active = app.active_panel == ActivePanel::Chat;
    let block = Block::default()
        .title(" Workshop Chat ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(if chat_active {
            Theme::border_active()
        } else {
            Theme::border()
        })
        .style(Theme::panel_bg());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 {
        return;
    }
    let width = (inner.width as usize).saturating_sub(1).max(16);

    // Transcript above, input line pinned to the bottom
    let mut transcript: Vec<Line> = Vec::new();
    for turn in app.chat_turns() {
        match turn.role {
            ChatRole::User => {
                if !transcript.is_empty() {
                    transcript.push(Line::from(""));
                }
                for (i, row) in helpers::wrap_text(&turn.text, width.saturating_sub(2))
                    .into_iter()
                    .enumerate()
                {
                    let prefix = if i == 0 {
                        Span::styled(
                            format!("{} ", Theme::ARROW_RIGHT),
                            Style::default().fg(Theme::EMBER),
                        )
                    } else {
                        Span::raw("  ")
                    };
                    transcript.push(Line::from(vec![
                        prefix,
                        Span::styled(row, Theme::text_muted()),
                    ]));
                }
            }
            ChatRole::Model => {
                transcript.extend(markdown::parse_markdown(&turn.text, width));
                transcript.push(Line::from(""));
            }
        }
    }
    if app.chat_waiting() && !app.chat_pending.is_empty() {
        transcript.push(Line::from(vec![
            Span::styled(app.spinner_glyph().to_string(), Style::default().fg(Theme::EMBER)),
            Span::styled(" thinking", Theme::text_dim()),
        ]));
    }
    if transcript.is_empty() {
        transcript.push(Line::from(Span::styled(
            "ask anything about the plan: tools, materials, what to watch for",
            Theme::text_dim(),
        )));
    }

    let transcript_height = (inner.height as usize).saturating_sub(2);
    let start = transcript
        .len()
        .saturating_sub(transcript_height + app.chat_scroll);
    let window: Vec<Line> = transcript
        .into_iter()
        .skip(start)
        .take(transcript_height)
        .collect();
    let transcript_area = Rect {
        height: transcript_height as u16,
        ..inner
    };
    frame.render_widget(Paragraph::new(window), transcript_area);

    // Input line
    let mut input_spans = vec![Span::styled(
        format!("{} ", Theme::ARROW_RIGHT),
        Style::default().fg(Theme::EMBER),
    )];
    let shown: String = {
        let budget = width.saturating_sub(4);
        let chars = app.chat_input.chars().count();
        if chars > budget {
            app.chat_input
                .chars()
                .skip(chars - budget)
                .collect()
        } else {
            app.chat_input.clone()
        }
    };
    input_spans.push(Span::styled(shown, Theme::text()));
    if app.input_mode == InputMode::Chat {
        input_spans.push(Span::styled("▌", Style::default().fg(Theme::EMBER)));
    }
    let input_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    frame.render_widget(Paragraph::new(Line::from(input_spans)), input_area);
}
