use crate::gemini::artist::ArtSource;
use crate::ui::theme::Theme;
use crate::ui::{helpers, App, ArtStatus, NarrationStatus};
use crate::util::format_clock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Full-screen walkthrough of a single step, one slide at a time.
pub(super) fn render_slideshow(frame: &mut Frame, area: Rect, app: &App, slide: usize) {
    let Some(plan) = &app.plan else { return };
    let Some(step) = plan.steps.get(slide) else { return };

    let stage = helpers::centered_rect(82, 88, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border_active())
        .style(Theme::panel_bg());
    let inner = block.inner(stage);
    frame.render_widget(block, stage);
    if inner.height < 8 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // step number, title, action tag
            Constraint::Min(3),    // body
            Constraint::Length(2), // hints
        ])
        .split(inner);

    let width = (inner.width as usize).saturating_sub(6).max(20);

    let mut head = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("STEP {} OF {}", slide + 1, plan.steps.len()),
            Theme::text_dim(),
        )),
    ];
    for row in helpers::wrap_text(&step.title, width) {
        head.push(Line::from(Span::styled(
            row,
            Style::default()
                .fg(Theme::PARCHMENT)
                .add_modifier(Modifier::BOLD),
        )));
    }
    head.push(Line::from(Span::styled(
        format!("[{}]", step.action.label()),
        Style::default().fg(Theme::BRASS),
    )));
    frame.render_widget(
        Paragraph::new(head).alignment(Alignment::Center),
        rows[0],
    );

    let mut body: Vec<Line> = vec![Line::from("")];
    for row in helpers::wrap_text(&step.description, width) {
        body.push(Line::from(Span::styled(row, Theme::text())));
    }
    if !step.materials.is_empty() {
        body.push(Line::from(""));
        body.push(Line::from(Span::styled("you will need", Theme::title())));
        for item in &step.materials {
            for (i, row) in helpers::wrap_text(item, width.saturating_sub(4))
                .into_iter()
                .enumerate()
            {
                let prefix = if i == 0 {
                    format!("  {} ", Theme::BULLET_FILLED)
                } else {
                    "    ".to_string()
                };
                body.push(Line::from(vec![
                    Span::styled(prefix, Theme::text_dim()),
                    Span::styled(row, Theme::text()),
                ]));
            }
        }
    }
    if !step.rationale.is_empty() {
        body.push(Line::from(""));
        for row in helpers::wrap_text(&step.rationale, width) {
            body.push(Line::from(Span::styled(
                row,
                Style::default()
                    .fg(Theme::MUTED)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
    }
    if let Some(card) = app.steps.get(slide) {
        body.push(Line::from(""));
        body.push(art_line(card, app));
        if let NarrationStatus::Ready {
            path,
            duration_secs,
        } = &card.narration
        {
            body.push(Line::from(Span::styled(
                format!(
                    "{} narration {}  {}",
                    Theme::SPEAKER_MARK,
                    format_clock(*duration_secs),
                    file_name(path),
                ),
                Theme::success(),
            )));
        }
    }

    let body_area = Rect {
        x: rows[1].x + 3,
        width: rows[1].width.saturating_sub(6),
        ..rows[1]
    };
    frame.render_widget(Paragraph::new(body), body_area);

    let hints = Line::from(vec![
        Span::styled("←/→", Theme::key()),
        Span::styled(" navigate  ", Theme::text_dim()),
        Span::styled("v", Theme::key()),
        Span::styled(" done", Theme::text_dim()),
    ]);
    frame.render_widget(
        Paragraph::new(vec![Line::from(""), hints]).alignment(Alignment::Center),
        rows[2],
    );
}

fn art_line(card: &crate::ui::StepCard, app: &App) -> Line<'static> {
    match &card.art {
        ArtStatus::Waiting => Line::from(Span::styled(
            format!("{} illustration pending", Theme::BULLET_EMPTY),
            Theme::text_dim(),
        )),
        ArtStatus::Rendering => Line::from(vec![
            Span::styled(
                app.spinner_glyph().to_string(),
                Style::default().fg(Theme::EMBER),
            ),
            Span::styled(" illustrating", Theme::text_muted()),
        ]),
        ArtStatus::Done {
            source: ArtSource::Blueprint,
            path,
        } => Line::from(Span::styled(
            format!(
                "{} blueprint sketch  {}",
                Theme::BLUEPRINT_MARK,
                path.as_deref().map(file_name).unwrap_or_default(),
            ),
            Style::default().fg(Theme::STEEL),
        )),
        ArtStatus::Done { source, path } => Line::from(Span::styled(
            format!(
                "{} {}  {}",
                Theme::CHECK_MARK,
                source.label(),
                path.as_deref().map(file_name).unwrap_or_default(),
            ),
            Theme::success(),
        )),
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
