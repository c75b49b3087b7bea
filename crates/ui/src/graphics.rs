//! Terminal graphics protocol detection.

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

/// Cell width used when the terminal does not report its font size.
pub(crate) const FALLBACK_CELL_WIDTH_PX: u16 = 8;

fn env_set(name: &str) -> bool {
    std::env::var(name).ok().is_some_and(|v| !v.trim().is_empty())
}

fn env_contains(name: &str, needle: &str) -> bool {
    std::env::var(name).ok().is_some_and(|v| v.contains(needle))
}

fn in_tmux() -> bool {
    std::env::var_os("TMUX").is_some()
}

fn in_iterm() -> bool {
    env_set("ITERM_SESSION_ID")
        || env_contains("TERM_PROGRAM", "iTerm")
        || env_contains("LC_TERMINAL", "iTerm")
}

fn in_kitty() -> bool {
    env_set("KITTY_WINDOW_ID")
        || std::env::var("TERM")
            .ok()
            .is_some_and(|term| term.trim().starts_with("xterm-kitty"))
}

/// How long to wait for the terminal to answer capability queries, if at all.
pub(crate) fn query_timeout() -> Option<std::time::Duration> {
    if in_kitty() || in_iterm() {
        Some(std::time::Duration::from_millis(1500))
    } else if in_tmux() {
        Some(std::time::Duration::from_millis(300))
    } else {
        None
    }
}

pub(crate) fn allow_tmux_passthrough() {
    if !in_tmux() {
        return;
    }
    // best effort; old tmux versions reject the option
    let _ = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

/// Queries the terminal when it is likely to answer, else falls back to halfblocks.
pub(crate) fn detect_picker() -> Picker {
    allow_tmux_passthrough();
    let mut picker = match query_timeout() {
        Some(timeout) => {
            let mut options = QueryStdioOptions::default();
            options.timeout = timeout;
            options.text_sizing_protocol = false;
            Picker::from_query_stdio_with_options(options).unwrap_or_else(|_| Picker::halfblocks())
        }
        None => Picker::halfblocks(),
    };
    picker.set_background_color(image::Rgba([255u8, 255u8, 255u8, 255u8]));

    let kitty = !in_iterm()
        && (in_kitty()
            || picker
                .capabilities()
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty)));
    if kitty {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    tracing::info!(protocol = protocol_label(&picker), "graphics protocol");
    picker
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}

/// Terminal width in pixels, from the column count and font cell width.
pub(crate) fn width_px(columns: u16, cell_width_px: u16) -> u32 {
    let cell = if cell_width_px == 0 {
        FALLBACK_CELL_WIDTH_PX
    } else {
        cell_width_px
    };
    u32::from(columns) * u32::from(cell)
}
