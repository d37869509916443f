//! Replay state reconstruction.
//!
//! `Reconstructor` is a pure state machine: committed text, a selection range,
//! an optional provisional composition overlay and a focus flag, advanced one
//! event at a time. It has no notion of time; ordering is the caller's job.
//!
//! Mutation rules:
//! - `selectionchange` is the only event that moves the selection without an edit.
//!   Range is `min(anchor, focus)..max(anchor, focus)`; the focus end is the caret.
//! - `beforeinput` / `input` are the only events that touch committed text.
//!   `insert*` replaces a non-empty selection, else inserts at `pos` (or the caret).
//!   `delete*` removes a non-empty selection, else one policy unit before/after
//!   `pos` (or the caret). Either way the selection collapses to the edit point.
//! - A `text` field is a full-field snapshot. It is adopted wholesale when the
//!   event carries nothing more precise (no `data` for inserts, no `pos` for deletes,
//!   or an unknown verb); the selection is clamped into the new length.
//! - Composition events only drive the overlay. Commits arrive as input events.
//!   While a composition is live, `insertCompositionText` replaces the range the
//!   previous composition insert produced instead of stacking a second copy, and
//!   `deleteCompositionText` removes it.
//! - Offsets are UTF-16 code units; anything out of range is clamped, never rejected.
//!
//! Invariant after every event: `selection_start <= selection_end <= len_utf16(text)`.

use core_events::{
    Affinity, CompositionData, CompositionSegment, Event, EventKind, InputData, SelectionData,
};
use core_text::{Buffer, Direction, byte_offset, clamp_offset};
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, trace};

pub mod policy;
pub use policy::{EditPolicy, default_unit};

const COMPOSITION_INSERT: &str = "insertCompositionText";
const COMPOSITION_DELETE: &str = "deleteCompositionText";

/// Which end of the selection is the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionDirection {
    /// Collapsed selection, or produced by an edit.
    #[default]
    None,
    /// Focus at `selection_end`.
    Forward,
    /// Focus at `selection_start`.
    Backward,
}

/// In-progress IME text shown over the committed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPreview {
    /// Where the preview is spliced in (UTF-16 offset into committed text).
    pub anchor: usize,
    /// Committed code units starting at `anchor` that the preview stands in for.
    pub span: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<CompositionSegment>,
}

/// Immutable snapshot handed to renderers and observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextState {
    pub text: String,
    pub selection_start: usize,
    pub selection_end: usize,
    pub direction: SelectionDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<CompositionPreview>,
    pub focused: bool,
}

impl TextState {
    /// Caret offset (the focus end of the selection).
    pub fn caret(&self) -> usize {
        match self.direction {
            SelectionDirection::Backward => self.selection_start,
            _ => self.selection_end,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection_start == self.selection_end
    }

    /// Committed text with the composition preview spliced in, if one is open.
    pub fn composed_text(&self) -> String {
        let Some(preview) = &self.composition else {
            return self.text.clone();
        };
        let a = byte_offset(&self.text, preview.anchor);
        let b = byte_offset(&self.text, preview.anchor + preview.span);
        let mut out = String::with_capacity(self.text.len() + preview.text.len());
        out.push_str(&self.text[..a]);
        out.push_str(&preview.text);
        out.push_str(&self.text[b..]);
        out
    }
}

/// What an applied event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Applied {
    None,
    Text,
    Selection,
    Composition,
    Focus,
}

#[derive(Debug, Clone, Default)]
pub struct Reconstructor {
    buffer: Buffer,
    start: usize,
    end: usize,
    direction: SelectionDirection,
    affinity: Option<Affinity>,
    composition: Option<CompositionPreview>,
    /// Range produced by the last composition insert, while it may still be replaced.
    composed: Option<Range<usize>>,
    focused: bool,
    /// Verb of the `beforeinput` applied by the previous event.
    paired: Option<String>,
    policy: EditPolicy,
}

impl Reconstructor {
    pub fn new(initial_text: &str) -> Self {
        Self::with_policy(initial_text, EditPolicy::default())
    }

    pub fn with_policy(initial_text: &str, policy: EditPolicy) -> Self {
        Self {
            buffer: Buffer::new(initial_text),
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &EditPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: EditPolicy) {
        self.policy = policy;
    }

    /// Back to `initial_text` with a collapsed selection at 0 and no overlay.
    pub fn reset(&mut self, initial_text: &str) {
        let policy = std::mem::take(&mut self.policy);
        *self = Self::with_policy(initial_text, policy);
        trace!(target: "replay.state", len = self.buffer.len_utf16(), "reset");
    }

    pub fn len_utf16(&self) -> usize {
        self.buffer.len_utf16()
    }

    /// Owned snapshot; later events never alter it.
    pub fn state(&self) -> TextState {
        let len = self.buffer.len_utf16();
        let composition = self.composition.as_ref().map(|o| {
            let anchor = o.anchor.min(len);
            CompositionPreview {
                anchor,
                span: o.span.min(len - anchor),
                text: o.text.clone(),
                segments: o.segments.clone(),
            }
        });
        TextState {
            text: self.buffer.to_string(),
            selection_start: self.start.min(len),
            selection_end: self.end.min(len),
            direction: self.direction,
            affinity: self.affinity,
            composition,
            focused: self.focused,
        }
    }

    pub fn apply_event(&mut self, event: &Event) -> Applied {
        let paired = self.paired.take();
        let applied = match &event.kind {
            EventKind::SelectionChange(selection) => self.select(selection),
            EventKind::BeforeInput(input) => {
                let applied = self.edit(event, input);
                // A no-op beforeinput leaves the edit to its input.
                if self.policy.pair_beforeinput && applied == Applied::Text {
                    self.paired = Some(input.input_type.clone());
                }
                applied
            }
            EventKind::Input(input) if paired.as_deref() == Some(input.input_type.as_str()) => {
                self.confirm(input)
            }
            EventKind::Input(input) => self.edit(event, input),
            EventKind::CompositionStart(_) => self.open_composition(),
            EventKind::CompositionUpdate(update) => self.update_composition(update),
            EventKind::CompositionEnd(_) => match self.composition.take() {
                Some(_) => Applied::Composition,
                None => Applied::None,
            },
            EventKind::Focus => self.set_focus(true),
            EventKind::Blur => self.set_focus(false),
            EventKind::KeyDown(_)
            | EventKind::KeyUp(_)
            | EventKind::Custom(_)
            | EventKind::Unrecognized(_) => Applied::None,
        };
        trace!(
            target: "replay.state",
            kind = event.kind.name(),
            time = event.time,
            ?applied,
            start = self.start,
            end = self.end,
            "event_applied"
        );
        applied
    }

    fn edit(&mut self, event: &Event, input: &InputData) -> Applied {
        let verb = input.input_type.as_str();
        if verb.starts_with("insert") {
            self.insert(event, input)
        } else if verb.starts_with("delete") {
            self.delete(event, input)
        } else {
            self.snapshot_or_ignore(input)
        }
    }

    fn insert(&mut self, event: &Event, input: &InputData) -> Applied {
        let verb = input.input_type.as_str();
        let content = match input.data.as_deref() {
            Some(data) => data,
            None if matches!(verb, "insertLineBreak" | "insertParagraph") => "\n",
            None => return self.snapshot_or_ignore(input),
        };
        let composing = verb == COMPOSITION_INSERT;
        let target = match self.live_composed(event.pos) {
            Some(range) if composing => range,
            _ if self.start != self.end => self.start..self.end,
            _ => {
                let at = self.offset_or_caret(event.pos);
                at..at
            }
        };
        let placed = self.buffer.replace(target, content);
        self.collapse_to(placed.end);
        if composing {
            self.track_composed(placed);
        } else {
            self.composed = None;
        }
        Applied::Text
    }

    fn delete(&mut self, event: &Event, input: &InputData) -> Applied {
        let verb = input.input_type.as_str();
        if verb == COMPOSITION_DELETE
            && let Some(range) = self.live_composed(event.pos)
        {
            self.buffer.remove(range.clone());
            self.collapse_to(range.start);
            self.track_composed(range.start..range.start);
            return Applied::Text;
        }
        let removal = if self.start != self.end {
            self.start..self.end
        } else {
            let direction = if verb.contains("Backward") {
                Direction::Backward
            } else if verb.contains("Forward") {
                Direction::Forward
            } else {
                return self.snapshot_or_ignore(input);
            };
            if event.pos.is_none()
                && let Some(snapshot) = input.text.as_deref()
            {
                return self.adopt_snapshot(snapshot);
            }
            let at = self.offset_or_caret(event.pos);
            self.buffer
                .unit_range(at, self.policy.unit_for(verb), direction)
        };
        if removal.is_empty() {
            return Applied::None;
        }
        self.buffer.remove(removal.clone());
        self.composed = None;
        self.collapse_to(removal.start);
        Applied::Text
    }

    /// Second half of a beforeinput/input pair: only a differing snapshot changes anything.
    fn confirm(&mut self, input: &InputData) -> Applied {
        match input.text.as_deref() {
            Some(snapshot) => self.adopt_snapshot(snapshot),
            None => Applied::None,
        }
    }

    fn snapshot_or_ignore(&mut self, input: &InputData) -> Applied {
        match input.text.as_deref() {
            Some(snapshot) => self.adopt_snapshot(snapshot),
            None => {
                debug!(target: "replay.state", verb = input.input_type.as_str(), "input_ignored");
                Applied::None
            }
        }
    }

    fn adopt_snapshot(&mut self, snapshot: &str) -> Applied {
        if self.buffer.to_string() == snapshot {
            return Applied::None;
        }
        self.buffer.set(snapshot);
        self.composed = None;
        self.start = self.buffer.clamp(self.start);
        self.end = self.buffer.clamp(self.end);
        debug!(
            target: "replay.state",
            len = self.buffer.len_utf16(),
            start = self.start,
            end = self.end,
            "snapshot_adopted"
        );
        Applied::Text
    }

    fn select(&mut self, selection: &SelectionData) -> Applied {
        let len = self.buffer.len_utf16();
        let anchor = self.buffer.clamp(clamp_offset(selection.anchor.index, len));
        let focus = self.buffer.clamp(clamp_offset(selection.focus.index, len));
        if anchor as f64 != selection.anchor.index || focus as f64 != selection.focus.index {
            debug!(
                target: "replay.state",
                anchor = selection.anchor.index,
                focus = selection.focus.index,
                len,
                "selection_clamped"
            );
        }
        self.start = anchor.min(focus);
        self.end = anchor.max(focus);
        self.direction = match focus.cmp(&anchor) {
            Ordering::Less => SelectionDirection::Backward,
            Ordering::Greater => SelectionDirection::Forward,
            Ordering::Equal => SelectionDirection::None,
        };
        self.affinity = selection.focus.affinity;
        if self
            .composed
            .as_ref()
            .is_some_and(|range| self.start < range.start || self.end > range.end)
        {
            self.composed = None;
        }
        Applied::Selection
    }

    /// Composition range still being rewritten, unless `pos` points elsewhere.
    fn live_composed(&mut self, pos: Option<f64>) -> Option<Range<usize>> {
        let range = self.composed.clone()?;
        if pos.is_some() && !(range.start..=range.end).contains(&self.offset_or_caret(pos)) {
            self.composed = None;
            return None;
        }
        Some(range)
    }

    fn open_composition(&mut self) -> Applied {
        self.composed = None;
        self.composition = Some(CompositionPreview {
            anchor: self.start,
            span: self.end - self.start,
            text: String::new(),
            segments: Vec::new(),
        });
        Applied::Composition
    }

    fn update_composition(&mut self, update: &CompositionData) -> Applied {
        if self.composition.is_none() {
            self.open_composition();
        }
        let composed = self.composed.clone();
        if let Some(overlay) = self.composition.as_mut() {
            overlay.text = match (&update.data, &update.segments) {
                (Some(data), _) => data.clone(),
                (None, Some(segments)) => segments.iter().map(|s| s.text.as_str()).collect(),
                (None, None) => String::new(),
            };
            overlay.segments = update.segments.clone().unwrap_or_default();
            if let Some(range) = composed {
                overlay.anchor = range.start;
                overlay.span = range.len();
            }
        }
        Applied::Composition
    }

    fn set_focus(&mut self, focused: bool) -> Applied {
        self.focused = focused;
        Applied::Focus
    }

    fn track_composed(&mut self, range: Range<usize>) {
        if let Some(overlay) = self.composition.as_mut() {
            overlay.anchor = range.start;
            overlay.span = range.len();
        }
        self.composed = Some(range);
    }

    fn offset_or_caret(&self, pos: Option<f64>) -> usize {
        match pos {
            Some(raw) => self
                .buffer
                .clamp(clamp_offset(raw, self.buffer.len_utf16())),
            None => self.start,
        }
    }

    fn collapse_to(&mut self, at: usize) {
        self.start = at;
        self.end = at;
        self.direction = SelectionDirection::None;
        self.affinity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{CompositionPhase, CustomData, KeyData, SelectionPoint};
    use core_text::DeleteUnit;
    use pretty_assertions::assert_eq;

    fn snapshot_input(time: f64, verb: &str, text: &str) -> Event {
        Event::new(
            time,
            EventKind::Input(InputData {
                input_type: verb.into(),
                data: None,
                text: Some(text.into()),
            }),
        )
    }

    fn sel(r: &Reconstructor) -> (usize, usize) {
        let s = r.state();
        (s.selection_start, s.selection_end)
    }

    #[test]
    fn reset_sets_text_and_empty_selection() {
        let mut r = Reconstructor::new("old");
        r.apply_event(&Event::selection(0.0, 1.0, 3.0));
        r.reset("hello");
        let s = r.state();
        assert_eq!(s.text, "hello");
        assert_eq!((s.selection_start, s.selection_end), (0, 0));
        assert_eq!(s.composition, None);
    }

    #[test]
    fn insert_then_backward_delete() {
        let mut r = Reconstructor::new("cd");
        let applied = r.apply_event(&Event::input(0.0, "insertText", Some("ab")).with_pos(0.0));
        assert_eq!(applied, Applied::Text);
        assert_eq!(r.state().text, "abcd");
        assert_eq!(sel(&r), (2, 2));

        r.apply_event(&Event::input(1.0, "deleteContentBackward", None));
        assert_eq!(r.state().text, "acd");
        assert_eq!(sel(&r), (1, 1));
    }

    #[test]
    fn insert_replaces_selection() {
        let mut r = Reconstructor::new("hello");
        r.apply_event(&Event::selection(0.0, 0.0, 5.0));
        r.apply_event(&Event::input(1.0, "insertText", Some("hi")));
        assert_eq!(r.state().text, "hi");
        assert_eq!(sel(&r), (2, 2));
    }

    #[test]
    fn insert_without_pos_uses_caret() {
        let mut r = Reconstructor::new("ac");
        r.apply_event(&Event::selection(0.0, 1.0, 1.0));
        r.apply_event(&Event::input(1.0, "insertText", Some("b")));
        assert_eq!(r.state().text, "abc");
        assert_eq!(sel(&r), (2, 2));
    }

    #[test]
    fn insert_pos_is_clamped() {
        let mut r = Reconstructor::new("ab");
        r.apply_event(&Event::input(0.0, "insertText", Some("!")).with_pos(99.0));
        assert_eq!(r.state().text, "ab!");
        r.apply_event(&Event::input(1.0, "insertText", Some("<")).with_pos(-4.0));
        assert_eq!(r.state().text, "<ab!");
        assert_eq!(sel(&r), (1, 1));
    }

    #[test]
    fn line_break_without_data_inserts_newline() {
        let mut r = Reconstructor::new("ab");
        r.apply_event(&Event::input(0.0, "insertParagraph", None).with_pos(1.0));
        assert_eq!(r.state().text, "a\nb");
        assert_eq!(sel(&r), (2, 2));
    }

    #[test]
    fn delete_removes_selection_first() {
        let mut r = Reconstructor::new("hello world");
        r.apply_event(&Event::selection(0.0, 11.0, 5.0));
        r.apply_event(&Event::input(1.0, "deleteContentBackward", None));
        assert_eq!(r.state().text, "hello");
        assert_eq!(sel(&r), (5, 5));
    }

    #[test]
    fn forward_delete_at_pos() {
        let mut r = Reconstructor::new("abcd");
        r.apply_event(&Event::input(0.0, "deleteContentForward", None).with_pos(1.0));
        assert_eq!(r.state().text, "acd");
        assert_eq!(sel(&r), (1, 1));
    }

    #[test]
    fn delete_at_edge_is_noop() {
        let mut r = Reconstructor::new("ab");
        let applied = r.apply_event(&Event::input(0.0, "deleteContentBackward", None));
        assert_eq!(applied, Applied::None);
        assert_eq!(r.state().text, "ab");
    }

    #[test]
    fn undirected_delete_needs_selection() {
        let mut r = Reconstructor::new("abc");
        assert_eq!(
            r.apply_event(&Event::input(0.0, "deleteByCut", None)),
            Applied::None
        );
        r.apply_event(&Event::selection(1.0, 0.0, 2.0));
        r.apply_event(&Event::input(2.0, "deleteByCut", None));
        assert_eq!(r.state().text, "c");
    }

    #[test]
    fn word_delete_uses_policy() {
        let mut r = Reconstructor::new("hello big world");
        r.apply_event(&Event::selection(0.0, 15.0, 15.0));
        r.apply_event(&Event::input(1.0, "deleteWordBackward", None));
        assert_eq!(r.state().text, "hello big ");

        let policy = EditPolicy::default().with_unit("deleteWordBackward", DeleteUnit::Char);
        let mut r = Reconstructor::with_policy("hello", policy);
        r.apply_event(&Event::selection(0.0, 5.0, 5.0));
        r.apply_event(&Event::input(1.0, "deleteWordBackward", None));
        assert_eq!(r.state().text, "hell");
    }

    #[test]
    fn backward_delete_removes_whole_emoji() {
        let mut r = Reconstructor::new("a😀");
        r.apply_event(&Event::selection(0.0, 3.0, 3.0));
        r.apply_event(&Event::input(1.0, "deleteContentBackward", None));
        assert_eq!(r.state().text, "a");
        assert_eq!(sel(&r), (1, 1));
    }

    #[test]
    fn snapshot_fallback_replaces_text_and_clamps_selection() {
        let mut r = Reconstructor::new("hello world");
        r.apply_event(&Event::selection(0.0, 8.0, 11.0));
        let applied = r.apply_event(&snapshot_input(1.0, "insertFromPaste", "hey"));
        assert_eq!(applied, Applied::Text);
        let s = r.state();
        assert_eq!(s.text, "hey");
        assert_eq!((s.selection_start, s.selection_end), (3, 3));
    }

    #[test]
    fn unknown_verb_with_snapshot_is_adopted() {
        let mut r = Reconstructor::new("plain");
        r.apply_event(&snapshot_input(0.0, "formatBold", "plain!"));
        assert_eq!(r.state().text, "plain!");
        assert_eq!(
            r.apply_event(&Event::input(1.0, "historyUndo", None)),
            Applied::None
        );
    }

    #[test]
    fn delete_without_pos_prefers_snapshot() {
        let mut r = Reconstructor::new("abc");
        let mut ev = snapshot_input(0.0, "deleteContentBackward", "ab");
        r.apply_event(&ev);
        assert_eq!(r.state().text, "ab");

        ev = Event::new(
            1.0,
            EventKind::Input(InputData {
                input_type: "deleteContentBackward".into(),
                data: None,
                text: Some("zzz".into()),
            }),
        )
        .with_pos(1.0);
        r.apply_event(&ev);
        assert_eq!(r.state().text, "b");
    }

    #[test]
    fn selection_is_ordered_and_clamped() {
        let mut r = Reconstructor::new("abc");
        r.apply_event(&Event::selection(0.0, 10.0, 1.0));
        let s = r.state();
        assert_eq!((s.selection_start, s.selection_end), (1, 3));
        assert_eq!(s.direction, SelectionDirection::Backward);
        assert_eq!(s.caret(), 1);

        r.apply_event(&Event::selection(1.0, f64::NAN, 2.0));
        let s = r.state();
        assert_eq!((s.selection_start, s.selection_end), (0, 2));
        assert_eq!(s.direction, SelectionDirection::Forward);
        assert_eq!(s.caret(), 2);
    }

    #[test]
    fn selection_affinity_follows_focus() {
        let mut r = Reconstructor::new("abc");
        let ev = Event::new(
            0.0,
            EventKind::SelectionChange(SelectionData {
                anchor: SelectionPoint::at(0.0),
                focus: SelectionPoint {
                    index: 2.0,
                    affinity: Some(Affinity::Backward),
                },
            }),
        );
        r.apply_event(&ev);
        assert_eq!(r.state().affinity, Some(Affinity::Backward));
        r.apply_event(&Event::input(1.0, "insertText", Some("x")));
        assert_eq!(r.state().affinity, None);
    }

    #[test]
    fn composition_does_not_commit() {
        let mut r = Reconstructor::new("ab");
        r.apply_event(&Event::selection(0.0, 2.0, 2.0));
        r.apply_event(&Event::composition(1.0, CompositionPhase::Start, None));
        r.apply_event(&Event::composition(2.0, CompositionPhase::Update, Some("ｋ")));
        let s = r.state();
        assert_eq!(s.text, "ab");
        let preview = s.composition.clone().expect("overlay open");
        assert_eq!(preview.anchor, 2);
        assert_eq!(preview.text, "ｋ");
        assert_eq!(s.composed_text(), "abｋ");

        r.apply_event(&Event::composition(3.0, CompositionPhase::End, Some("か")));
        assert_eq!(r.state().text, "ab");
        assert_eq!(r.state().composition, None);

        r.apply_event(&Event::input(4.0, "insertCompositionText", Some("か")));
        assert_eq!(r.state().text, "abか");
        assert_eq!(sel(&r), (3, 3));
    }

    #[test]
    fn live_composition_inserts_replace_each_other() {
        let mut r = Reconstructor::new("x");
        r.apply_event(&Event::selection(0.0, 1.0, 1.0));
        r.apply_event(&Event::composition(1.0, CompositionPhase::Start, None));
        r.apply_event(&Event::composition(2.0, CompositionPhase::Update, Some("k")));
        r.apply_event(&Event::before_input(3.0, "insertCompositionText", Some("k")));
        r.apply_event(&Event::input(3.0, "insertCompositionText", Some("k")));
        assert_eq!(r.state().text, "xk");
        r.apply_event(&Event::composition(4.0, CompositionPhase::Update, Some("か")));
        r.apply_event(&Event::input(5.0, "insertCompositionText", Some("か")));
        let s = r.state();
        assert_eq!(s.text, "xか");
        assert_eq!(s.composed_text(), "xか");
        r.apply_event(&Event::composition(6.0, CompositionPhase::End, Some("か")));
        // Late commit after compositionend replaces rather than duplicates.
        r.apply_event(&Event::input(7.0, "insertCompositionText", Some("か")));
        assert_eq!(r.state().text, "xか");
        r.apply_event(&Event::input(8.0, "insertText", Some("!")));
        assert_eq!(r.state().text, "xか!");
    }

    #[test]
    fn delete_composition_text_removes_live_range() {
        let mut r = Reconstructor::new("");
        r.apply_event(&Event::composition(0.0, CompositionPhase::Start, None));
        r.apply_event(&Event::input(1.0, "insertCompositionText", Some("にほ")));
        r.apply_event(&Event::input(2.0, "deleteCompositionText", None));
        assert_eq!(r.state().text, "");
        r.apply_event(&Event::composition(3.0, CompositionPhase::End, Some("日本")));
        r.apply_event(&Event::input(4.0, "insertFromComposition", Some("日本")));
        assert_eq!(r.state().text, "日本");
    }

    #[test]
    fn segments_feed_preview_when_data_missing() {
        let mut r = Reconstructor::new("");
        let ev = Event::new(
            0.0,
            EventKind::CompositionUpdate(CompositionData {
                data: None,
                segments: Some(vec![
                    CompositionSegment {
                        text: "日本".into(),
                        highlight: Some(true),
                    },
                    CompositionSegment {
                        text: "語".into(),
                        highlight: None,
                    },
                ]),
            }),
        );
        r.apply_event(&ev);
        let preview = r.state().composition.expect("implicitly opened");
        assert_eq!(preview.text, "日本語");
        assert_eq!(preview.segments.len(), 2);
    }

    #[test]
    fn beforeinput_input_pair_applies_once() {
        let mut r = Reconstructor::new("");
        r.apply_event(&Event::before_input(0.0, "insertText", Some("a")));
        r.apply_event(&Event::input(0.0, "insertText", Some("a")));
        assert_eq!(r.state().text, "a");

        let mut unpaired = Reconstructor::with_policy("", EditPolicy::new(false));
        assert!(!unpaired.policy().pair_beforeinput);
        unpaired.apply_event(&Event::before_input(0.0, "insertText", Some("a")));
        unpaired.apply_event(&Event::input(0.0, "insertText", Some("a")));
        assert_eq!(unpaired.state().text, "aa");
    }

    #[test]
    fn paired_input_snapshot_wins() {
        let mut r = Reconstructor::new("");
        r.apply_event(&Event::before_input(0.0, "insertText", Some("a")));
        let mut confirm = snapshot_input(1.0, "insertText", "A");
        if let EventKind::Input(d) = &mut confirm.kind {
            d.data = Some("a".into());
        }
        r.apply_event(&confirm);
        assert_eq!(r.state().text, "A");
    }

    #[test]
    fn intervening_event_breaks_pair() {
        let mut r = Reconstructor::new("");
        r.apply_event(&Event::before_input(0.0, "insertText", Some("a")));
        r.apply_event(&Event::selection(1.0, 0.0, 0.0));
        r.apply_event(&Event::input(2.0, "insertText", Some("b")));
        assert_eq!(r.state().text, "ba");
    }

    #[test]
    fn empty_beforeinput_leaves_payload_to_input() {
        let mut r = Reconstructor::new("ab");
        r.apply_event(&Event::selection(0.0, 2.0, 2.0));
        let applied = r.apply_event(&Event::before_input(1.0, "insertFromPaste", None));
        assert_eq!(applied, Applied::None);
        r.apply_event(&Event::input(2.0, "insertFromPaste", Some("XY")));
        assert_eq!(r.state().text, "abXY");
        assert_eq!(sel(&r), (4, 4));
        assert_eq!(r.len_utf16(), 4);
    }

    #[test]
    fn moving_the_caret_away_ends_composition_tracking() {
        let mut r = Reconstructor::new("hello ");
        r.apply_event(&Event::selection(0.0, 6.0, 6.0));
        r.apply_event(&Event::composition(1.0, CompositionPhase::Start, None));
        r.apply_event(&Event::input(2.0, "insertCompositionText", Some("か")));
        r.apply_event(&Event::composition(3.0, CompositionPhase::End, Some("か")));
        r.apply_event(&Event::selection(4.0, 0.0, 0.0));
        r.apply_event(&Event::input(5.0, "insertCompositionText", Some("X")).with_pos(0.0));
        assert_eq!(r.state().text, "Xhello か");
        assert_eq!(sel(&r), (1, 1));
    }

    #[test]
    fn composition_insert_elsewhere_starts_a_new_range() {
        let mut r = Reconstructor::new("ab");
        r.apply_event(&Event::selection(0.0, 2.0, 2.0));
        r.apply_event(&Event::composition(1.0, CompositionPhase::Start, None));
        r.apply_event(&Event::input(2.0, "insertCompositionText", Some("k")));
        // Caret stays at the end of the live range, so no selection reset.
        r.apply_event(&Event::input(3.0, "insertCompositionText", Some("Z")).with_pos(0.0));
        assert_eq!(r.state().text, "Zabk");
        r.apply_event(&Event::input(4.0, "insertCompositionText", Some("ZZ")));
        assert_eq!(r.state().text, "ZZabk");
    }

    #[test]
    fn inert_events_leave_text_and_selection() {
        let mut r = Reconstructor::new("abc");
        r.apply_event(&Event::selection(0.0, 1.0, 2.0));
        let before = r.state();
        let inert = [
            Event::new(1.0, EventKind::Unrecognized("scroll".into())),
            Event::new(
                2.0,
                EventKind::KeyDown(KeyData {
                    key: "a".into(),
                    code: "KeyA".into(),
                }),
            ),
            Event::new(
                3.0,
                EventKind::Custom(CustomData {
                    label: "marker".into(),
                    payload: None,
                }),
            ),
        ];
        for ev in &inert {
            assert_eq!(r.apply_event(ev), Applied::None);
        }
        assert_eq!(r.state(), before);
    }

    #[test]
    fn focus_flag_toggles_without_touching_text() {
        let mut r = Reconstructor::new("abc");
        assert_eq!(r.apply_event(&Event::new(0.0, EventKind::Focus)), Applied::Focus);
        assert!(r.state().focused);
        r.apply_event(&Event::new(1.0, EventKind::Blur));
        let s = r.state();
        assert!(!s.focused);
        assert_eq!(s.text, "abc");
    }

    #[test]
    fn snapshots_do_not_alias() {
        let mut r = Reconstructor::new("a");
        let first = r.state();
        r.apply_event(&Event::input(0.0, "insertText", Some("b")));
        assert_eq!(first.text, "a");
        assert_eq!(r.state().text, "ba");
    }

    #[test]
    fn text_state_serializes_camel_case() {
        let r = Reconstructor::new("hi");
        let json = serde_json::to_value(r.state()).unwrap();
        assert_eq!(json["selectionStart"], 0);
        assert_eq!(json["selectionEnd"], 0);
        assert_eq!(json["text"], "hi");
        assert!(json.get("composition").is_none());
    }
}
