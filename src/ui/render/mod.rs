mod footer;
mod header;
mod overlays;
mod slideshow;
mod toast;
mod workbench;

use crate::ui::theme::Theme;
use crate::ui::{App, Overlay};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

use footer::render_footer;
use header::render_header;
use overlays::{
    render_error_banner, render_help, render_key_entry, render_picker, render_step_detail,
};
use slideshow::render_slideshow;
use toast::render_toast;
use workbench::render_workbench;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(Theme::BG)), area);

    // The walkthrough takes the whole screen; only toasts ride on top.
    if let Some(slide) = app.slideshow {
        render_slideshow(frame, area, app, slide);
        if let Some(toast) = &app.toast {
            render_toast(frame, toast);
        }
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Workbench
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(frame, layout[0], app);
    render_workbench(frame, layout[1], app);
    render_footer(frame, layout[2], app);

    if let Some(banner) = &app.error {
        render_error_banner(frame, banner);
    }

    match &app.overlay {
        Overlay::Help { scroll } => render_help(frame, *scroll),
        Overlay::StepDetail { step_index, scroll } => {
            if let Some(plan) = &app.plan {
                if let Some(step) = plan.steps.get(*step_index) {
                    render_step_detail(frame, app, *step_index, step, *scroll);
                }
            }
        }
        Overlay::Picker(state) => render_picker(frame, state),
        Overlay::KeyEntry { input, error } => render_key_entry(frame, input, error.as_deref()),
        Overlay::None => {}
    }

    if let Some(toast) = &app.toast {
        render_toast(frame, toast);
    }
}
