//! Terminal viewer for replayed text state.
//!
//! A frame is first built as a flat list of commands (pure, no terminal
//! access) and then flushed to any `Write` in one pass. Selection paints in
//! reverse video and the composition preview underlined, spliced in at its
//! anchor. The last row carries a status line.
//!
//! Invariants:
//! * Commands preserve ordering; one flush per frame.
//! * Positions are absolute with a (0,0) origin.
//! * Every row that is moved to is cleared before printing, with plain style.

use anyhow::Result;
use core_playback::PlaybackState;
use core_player::PlayerState;
use core_state::TextState;
use core_text::{byte_offset, utf16_len};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType},
};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Selected,
    Composition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    pub show_selection: bool,
    pub show_composition: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            show_selection: true,
            show_composition: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveTo(u16, u16),
    ClearLine,
    Style(SpanStyle),
    Print(String),
}

/// Split the displayed text into styled runs. Empty text yields no spans.
pub fn spans(state: &TextState, opts: ViewerOptions) -> Vec<Span> {
    let (display, preview) = match &state.composition {
        Some(p) if opts.show_composition => (
            state.composed_text(),
            Some((p.anchor, p.span, utf16_len(&p.text))),
        ),
        _ => (state.text.clone(), None),
    };
    // Committed offsets shift by the preview's size difference past the anchor.
    let to_display = |offset: usize| match preview {
        Some((anchor, span, len)) if offset > anchor => {
            if offset >= anchor + span {
                offset - span + len
            } else {
                anchor
            }
        }
        _ => offset,
    };
    let total = utf16_len(&display);
    let selection = (opts.show_selection && !state.is_collapsed())
        .then(|| (to_display(state.selection_start), to_display(state.selection_end)));
    let composing = preview
        .map(|(anchor, _, len)| (anchor, anchor + len))
        .filter(|(a, b)| a < b);

    let mut cuts = vec![0, total];
    for (a, b) in selection.into_iter().chain(composing) {
        cuts.push(a.min(total));
        cuts.push(b.min(total));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let inside = |range: Option<(usize, usize)>, at: usize| {
        range.is_some_and(|(start, end)| start <= at && at < end)
    };
    let mut out: Vec<Span> = Vec::new();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let style = if inside(composing, a) {
            SpanStyle::Composition
        } else if inside(selection, a) {
            SpanStyle::Selected
        } else {
            SpanStyle::Plain
        };
        let text = &display[byte_offset(&display, a)..byte_offset(&display, b)];
        if text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => out.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }
    out
}

pub fn status_line(state: &PlayerState) -> String {
    let icon = match state.playback {
        PlaybackState::Playing => ">",
        PlaybackState::Paused => "||",
        PlaybackState::Stopped => "[]",
        PlaybackState::Idle => "-",
    };
    let text = &state.text_state;
    format!(
        "{icon} {:.1}s / {:.1}s  x{}  sel {}..{}  [space] play/pause  [<-/->] seek  [+/-] speed  [q] quit",
        state.current_time / 1000.0,
        state.duration / 1000.0,
        state.speed,
        text.selection_start,
        text.selection_end,
    )
}

/// Build the command list for one full frame of `rows` terminal rows.
pub fn frame(state: &PlayerState, opts: ViewerOptions, rows: u16) -> Vec<Command> {
    let mut cmds = Vec::new();
    let text_rows = rows.saturating_sub(1);
    let mut row = 0u16;
    if text_rows > 0 {
        cmds.push(Command::MoveTo(0, 0));
        cmds.push(Command::ClearLine);
        'spans: for span in spans(&state.text_state, opts) {
            for (i, piece) in span.text.split('\n').enumerate() {
                if i > 0 {
                    row += 1;
                    if row >= text_rows {
                        break 'spans;
                    }
                    cmds.push(Command::Style(SpanStyle::Plain));
                    cmds.push(Command::MoveTo(0, row));
                    cmds.push(Command::ClearLine);
                }
                let piece = piece.trim_end_matches('\r');
                if !piece.is_empty() {
                    cmds.push(Command::Style(span.style));
                    cmds.push(Command::Print(piece.to_string()));
                }
            }
        }
        cmds.push(Command::Style(SpanStyle::Plain));
        for blank in row.saturating_add(1)..text_rows {
            cmds.push(Command::MoveTo(0, blank));
            cmds.push(Command::ClearLine);
        }
    }
    if rows > 0 {
        cmds.push(Command::MoveTo(0, rows - 1));
        cmds.push(Command::ClearLine);
        cmds.push(Command::Print(status_line(state)));
    }
    cmds
}

pub fn flush<W: Write>(out: &mut W, cmds: &[Command]) -> Result<()> {
    for c in cmds {
        match c {
            Command::MoveTo(x, y) => {
                queue!(out, MoveTo(*x, *y))?;
            }
            Command::ClearLine => {
                queue!(out, Clear(ClearType::CurrentLine))?;
            }
            Command::Style(style) => {
                queue!(out, SetAttribute(Attribute::Reset))?;
                match style {
                    SpanStyle::Plain => {}
                    SpanStyle::Selected => queue!(out, SetAttribute(Attribute::Reverse))?,
                    SpanStyle::Composition => queue!(out, SetAttribute(Attribute::Underlined))?,
                }
            }
            Command::Print(s) => {
                queue!(out, Print(s))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

pub fn render<W: Write>(
    out: &mut W,
    state: &PlayerState,
    opts: ViewerOptions,
    rows: u16,
) -> Result<()> {
    flush(out, &frame(state, opts, rows))
}
