use crate::ui::theme::Theme;
use crate::ui::{App, InputMode, LoadingState, Overlay};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Key chips shown on the right edge depend on what the app is waiting for.
enum FooterContext {
    Picker,
    KeyEntry,
    Overlay,
    Slideshow,
    Error,
    Chat,
    Plan,
    Working,
}

fn footer_context(app: &App) -> FooterContext {
    match &app.overlay {
        Overlay::Picker(_) => return FooterContext::Picker,
        Overlay::KeyEntry { .. } => return FooterContext::KeyEntry,
        Overlay::Help { .. } | Overlay::StepDetail { .. } => return FooterContext::Overlay,
        Overlay::None => {}
    }
    if app.slideshow.is_some() {
        FooterContext::Slideshow
    } else if app.error.is_some() {
        FooterContext::Error
    } else if app.input_mode == InputMode::Chat {
        FooterContext::Chat
    } else if app.plan.is_some() {
        FooterContext::Plan
    } else {
        FooterContext::Working
    }
}

pub(super) fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled("  ", Style::default())];

    // Left side: what the workshop is doing right now
    match app.loading {
        LoadingState::None => {
            if let Some(session) = &app.session {
                spans.push(Span::styled(
                    session.dir.display().to_string(),
                    Style::default().fg(Theme::DIM),
                ));
            } else if app.plan.is_none() {
                spans.push(Span::styled(
                    "waiting for photos",
                    Style::default().fg(Theme::DIM),
                ));
            }
        }
        LoadingState::PreparingPhotos => {
            spans.push(spinner_span(app));
            spans.push(Span::styled(
                " preparing photos",
                Style::default().fg(Theme::MUTED),
            ));
        }
        LoadingState::ConsultingAnalyst => {
            spans.push(spinner_span(app));
            spans.push(Span::styled(
                " consulting the analyst",
                Style::default().fg(Theme::MUTED),
            ));
        }
        LoadingState::Illustrating => {
            let done = app.rendered_count();
            let total = app.steps.len();
            spans.push(spinner_span(app));
            spans.push(Span::styled(
                format!(" illustrating {} of {}", (done + 1).min(total), total),
                Style::default().fg(Theme::MUTED),
            ));
        }
        LoadingState::Narrating => {
            spans.push(spinner_span(app));
            spans.push(Span::styled(
                " narrating",
                Style::default().fg(Theme::MUTED),
            ));
        }
        LoadingState::Answering => {
            spans.push(spinner_span(app));
            spans.push(Span::styled(
                " answering",
                Style::default().fg(Theme::MUTED),
            ));
        }
    }

    if app.demo_mode {
        spans.push(Span::styled(
            format!("  {} demo", Theme::DOT_SEPARATOR),
            Style::default().fg(Theme::STEEL),
        ));
    }

    if app.session_tokens > 0 {
        spans.push(Span::styled(
            format!("  tok {}", app.session_tokens),
            Style::default().fg(Theme::DIM),
        ));
    }

    // Spacer before the key chips
    let context = footer_context(app);
    let status_len: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let available = area.width as usize;
    let button_area_approx = match context {
        FooterContext::Picker => 40,    // j/k move  ↵ choose  Esc quit
        FooterContext::KeyEntry => 30,  // ↵ save  Esc cancel
        FooterContext::Overlay => 25,   // j/k scroll  Esc close
        FooterContext::Slideshow => 35, // ←/→ step  v done  q quit
        FooterContext::Error => 45,     // r retry  s key  d demo  q quit
        FooterContext::Chat => 30,      // ↵ ask  Esc done
        FooterContext::Plan => 70,      // ↵ detail  v show  c chat  n voice  x export  ? help  q quit
        FooterContext::Working => 20,   // ? help  q quit
    };
    let spacer_len = available.saturating_sub(status_len + button_area_approx);
    if spacer_len > 0 {
        spans.push(Span::styled(" ".repeat(spacer_len), Style::default()));
    }

    match context {
        FooterContext::Picker => {
            push_chip(&mut spans, " j/k ", " move ", Theme::MUTED);
            push_chip(&mut spans, " ↵ ", " choose ", Theme::EMBER);
            push_chip(&mut spans, " Esc ", " quit ", Theme::BORDER);
        }
        FooterContext::KeyEntry => {
            push_chip(&mut spans, " ↵ ", " save ", Theme::EMBER);
            push_chip(&mut spans, " Esc ", " cancel ", Theme::BORDER);
        }
        FooterContext::Overlay => {
            push_chip(&mut spans, " j/k ", " scroll ", Theme::MUTED);
            push_chip(&mut spans, " Esc ", " close ", Theme::BORDER);
        }
        FooterContext::Slideshow => {
            push_chip(&mut spans, " ←/→ ", " step ", Theme::MUTED);
            push_chip(&mut spans, " v ", " done ", Theme::EMBER);
            push_chip(&mut spans, " q ", " quit ", Theme::BORDER);
        }
        FooterContext::Error => {
            push_chip(&mut spans, " r ", " retry ", Theme::EMBER);
            push_chip(&mut spans, " s ", " key ", Theme::MUTED);
            push_chip(&mut spans, " d ", " demo ", Theme::STEEL);
            push_chip(&mut spans, " q ", " quit ", Theme::BORDER);
        }
        FooterContext::Chat => {
            push_chip(&mut spans, " ↵ ", " ask ", Theme::EMBER);
            push_chip(&mut spans, " Esc ", " done ", Theme::BORDER);
        }
        FooterContext::Plan => {
            push_chip(&mut spans, " ↵ ", " detail ", Theme::MUTED);
            push_chip(&mut spans, " v ", " show ", Theme::MUTED);
            push_chip(&mut spans, " c ", " chat ", Theme::EMBER);
            push_chip(&mut spans, " n ", " voice ", Theme::MUTED);
            push_chip(&mut spans, " x ", " export ", Theme::MUTED);
            push_chip(&mut spans, " ? ", " help ", Theme::BORDER);
            push_chip(&mut spans, " q ", " quit ", Theme::BORDER);
        }
        FooterContext::Working => {
            push_chip(&mut spans, " ? ", " help ", Theme::BORDER);
            push_chip(&mut spans, " q ", " quit ", Theme::BORDER);
        }
    }

    spans.push(Span::styled(" ", Style::default()));

    let footer = Paragraph::new(vec![Line::from(""), Line::from(spans)])
        .style(Style::default().bg(Theme::PANEL));
    frame.render_widget(footer, area);
}

fn spinner_span(app: &App) -> Span<'static> {
    Span::styled(
        app.spinner_glyph().to_string(),
        Style::default().fg(Theme::EMBER),
    )
}

fn push_chip(spans: &mut Vec<Span<'static>>, key: &'static str, label: &'static str, accent: ratatui::style::Color) {
    spans.push(Span::styled(
        key,
        Style::default().fg(Theme::BG).bg(accent),
    ));
    spans.push(Span::styled(label, Style::default().fg(Theme::MUTED)));
}
