use crate::ui::theme::Theme;
use crate::ui::{Toast, ToastKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

pub(super) fn render_toast(frame: &mut Frame, toast: &Toast) {
    let area = frame.area();

    let (prefix, message, bg, text_style) = match toast.kind {
        ToastKind::Success => (
            "  + ",
            toast.message.trim_start_matches('+').trim_start(),
            Theme::MOSS,
            Style::default()
                .fg(Theme::BG)
                .add_modifier(Modifier::BOLD),
        ),
        ToastKind::Error => (
            "  x ",
            toast.message.as_str(),
            Theme::RUST,
            Style::default().fg(Theme::PARCHMENT),
        ),
        ToastKind::Info => (
            "  › ",
            toast.message.as_str(),
            Theme::OVERLAY,
            Style::default()
                .fg(Theme::INK)
                .add_modifier(Modifier::ITALIC),
        ),
    };

    let width = (prefix.len() + message.chars().count() + 2) as u16;
    let toast_area = Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: area.height.saturating_sub(5),
        width: width.min(area.width),
        height: 1,
    };

    frame.render_widget(Clear, toast_area);

    let content = Paragraph::new(Line::from(vec![
        Span::styled(prefix, text_style),
        Span::styled(message, text_style),
        Span::raw("  "),
    ]))
    .style(Style::default().bg(bg));
    frame.render_widget(content, toast_area);
}
