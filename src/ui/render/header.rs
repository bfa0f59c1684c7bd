use crate::ui::theme::Theme;
use crate::ui::App;
use crate::util::truncate;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub(super) fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        format!("   {}", Theme::LOGO),
        Style::default()
            .fg(Theme::BRASS)
            .add_modifier(Modifier::BOLD),
    )];

    if app.demo_mode {
        spans.push(Span::styled(
            format!("   {} demo workshop", Theme::DOT_SEPARATOR),
            Style::default().fg(Theme::STEEL),
        ));
    }

    // Plan title on the right, once there is one
    if let Some(plan) = &app.plan {
        let title = truncate(&plan.title, 48);
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let right_len = title.chars().count() + 3;
        let spacer = (area.width as usize).saturating_sub(used + right_len);
        if spacer > 0 {
            spans.push(Span::styled(" ".repeat(spacer), Style::default()));
            spans.push(Span::styled(title, Style::default().fg(Theme::MUTED)));
        }
    }

    let lines = vec![Line::from(""), Line::from(spans)];
    let header = Paragraph::new(lines).style(Style::default().bg(Theme::BG));
    frame.render_widget(header, area);
}
