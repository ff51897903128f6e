use cert_core::Tone;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Color = Color::Rgb(146, 131, 116);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Purple => Color::Rgb(177, 98, 134),
        Tone::Blue => Color::Rgb(131, 165, 152),
        Tone::Yellow => Color::Rgb(250, 189, 47),
        Tone::Orange => Color::Rgb(254, 128, 25),
        Tone::Cyan => Color::Rgb(142, 192, 124),
        Tone::Indigo => Color::Rgb(69, 133, 136),
        Tone::Pink => Color::Rgb(211, 134, 155),
        Tone::Green => Color::Rgb(184, 187, 38),
        Tone::Gray => MUTED,
        Tone::Red => Color::Rgb(251, 73, 52),
    }
}

pub fn tone_style(tone: Tone) -> Style {
    Style::new().fg(tone_color(tone))
}

pub mod icons {
    pub const COMMENTS: &str = "✎";
    pub const ATTACHMENTS: &str = "⎘";
    pub const ASSIGNEE: &str = "@";
    pub const DUE: &str = "⏲";
}
