//! Workshop theme for scrapsmith
//! Warm lamplight neutrals with a few tool-steel accents

use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Ink ramp - from brightest to darkest
    // ─────────────────────────────────────────────────────────────────────

    /// Brightest text - selected items, critical emphasis
    pub const PARCHMENT: Color = Color::Rgb(245, 238, 226);

    /// Primary text
    pub const INK: Color = Color::Rgb(216, 207, 192);

    /// Secondary text, labels
    pub const MUTED: Color = Color::Rgb(168, 158, 140);

    /// Dimmed text, hints
    pub const DIM: Color = Color::Rgb(118, 110, 96);

    /// Borders, separators
    pub const BORDER: Color = Color::Rgb(88, 80, 68);

    /// Panel backgrounds
    pub const PANEL: Color = Color::Rgb(37, 33, 27);

    /// Overlay backgrounds
    pub const OVERLAY: Color = Color::Rgb(46, 41, 33);

    /// Main background
    pub const BG: Color = Color::Rgb(24, 21, 17);

    // ─────────────────────────────────────────────────────────────────────
    // Accents
    // ─────────────────────────────────────────────────────────────────────

    /// Ember orange - active selection, the current step
    pub const EMBER: Color = Color::Rgb(224, 122, 60);

    /// Brass - titles, key hints
    pub const BRASS: Color = Color::Rgb(198, 166, 88);

    /// Moss green - finished work
    pub const MOSS: Color = Color::Rgb(136, 166, 104);

    /// Rust red - failures
    pub const RUST: Color = Color::Rgb(198, 94, 76);

    /// Blueprint steel - placeholder art, info
    pub const STEEL: Color = Color::Rgb(110, 138, 162);

    // ─────────────────────────────────────────────────────────────────────
    // Pre-built styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn bg() -> Style {
        Style::default().bg(Self::BG)
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Self::PANEL)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::INK)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn bold() -> Style {
        Style::default()
            .fg(Self::PARCHMENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Self::EMBER)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_active() -> Style {
        Style::default().fg(Self::BRASS)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::BRASS)
            .add_modifier(Modifier::BOLD)
    }

    /// Keybinding highlight
    pub fn key() -> Style {
        Style::default()
            .fg(Self::PARCHMENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::MOSS)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::RUST)
            .add_modifier(Modifier::BOLD)
    }

    pub fn info() -> Style {
        Style::default().fg(Self::STEEL)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Glyphs
    // ─────────────────────────────────────────────────────────────────────

    pub const CHECK_MARK: char = '✓';
    pub const CROSS_MARK: char = '✗';
    /// Blueprint stand-in marker on step cards
    pub const BLUEPRINT_MARK: char = '▧';
    pub const SPEAKER_MARK: char = '♪';

    pub const BULLET_FILLED: char = '●';
    pub const BULLET_EMPTY: char = '○';
    pub const ARROW_RIGHT: char = '▸';
    pub const DOT_SEPARATOR: char = '·';

    /// Header wordmark
    pub const LOGO: &'static str = "S C R A P S M I T H";
}
