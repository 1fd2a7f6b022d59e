//! Nested list tracking.
//!
//! Every frame on the stack owns exactly one open `<li>`. Frames are only
//! ever closed as the pair `</li></ol>` or `</li></ul>`, so the emitted tag
//! stream stays balanced once the stack is drained.

/// Which HTML list element a frame renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

/// The bullet of a list item line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Ordered(u64),
    Unordered,
}

impl Marker {
    fn kind(self) -> ListKind {
        match self {
            Self::Ordered(_) => ListKind::Ordered,
            Self::Unordered => ListKind::Unordered,
        }
    }

    fn number(self) -> Option<u64> {
        match self {
            Self::Ordered(n) => Some(n),
            Self::Unordered => None,
        }
    }
}

/// One open nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListFrame {
    pub(crate) kind: ListKind,
    pub(crate) indent: usize,
    /// Number of the most recent item (ordered lists only).
    pub(crate) last_number: Option<u64>,
}

/// Open list frames, outermost first.
#[derive(Debug, Default)]
pub(crate) struct ListStack {
    frames: Vec<ListFrame>,
    /// Deepest nesting reached since the last [`reset_peak`](Self::reset_peak).
    peak: usize,
}

impl ListStack {
    /// Number of open frames.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Deepest nesting reached since the last reset, even if already closed.
    pub(crate) fn peak(&self) -> usize {
        self.peak
    }

    /// Start a new peak window at the current depth.
    pub(crate) fn reset_peak(&mut self) {
        self.peak = self.frames.len();
    }

    /// Pop every frame indented deeper than `indent`. Returns how many closed.
    pub(crate) fn close_deeper_than(&mut self, indent: usize, out: &mut Vec<String>) -> usize {
        let mut closed = 0;
        while self.frames.last().is_some_and(|top| top.indent > indent) {
            self.pop_into(out);
            closed += 1;
        }
        closed
    }

    /// Pop every frame. Returns how many closed.
    pub(crate) fn close_all(&mut self, out: &mut Vec<String>) -> usize {
        let mut closed = 0;
        while self.pop_into(out) {
            closed += 1;
        }
        closed
    }

    fn pop_into(&mut self, out: &mut Vec<String>) -> bool {
        match self.frames.pop() {
            Some(frame) => {
                out.push("</li>".to_string());
                out.push(format!("</{}>", frame.kind.tag()));
                true
            }
            None => false,
        }
    }

    /// Emit the tags that open a new item at `indent`.
    ///
    /// Deeper frames are closed first. A frame is reused only for the same kind
    /// at the same indent; otherwise a new (nested) list is opened. Item content
    /// is left to the caller.
    pub(crate) fn open_item(&mut self, marker: Marker, indent: usize, out: &mut Vec<String>) {
        self.close_deeper_than(indent, out);

        let kind = marker.kind();
        let reuse = self
            .frames
            .last()
            .is_some_and(|top| top.indent == indent && top.kind == kind);

        if !reuse {
            out.push(match marker {
                Marker::Ordered(n) => format!("<ol start='{n}'>"),
                Marker::Unordered => "<ul>".to_string(),
            });
            out.push("<li>".to_string());
            self.frames.push(ListFrame {
                kind,
                indent,
                last_number: marker.number(),
            });
            self.peak = self.peak.max(self.frames.len());
            return;
        }

        let Some(frame) = self.frames.last_mut() else {
            return;
        };

        out.push("</li>".to_string());
        match marker {
            Marker::Ordered(n) => {
                let expected = frame.last_number.and_then(|last| last.checked_add(1));
                if expected == Some(n) {
                    out.push("<li>".to_string());
                } else {
                    out.push(format!("<li value='{n}'>"));
                }
                frame.last_number = Some(n);
            }
            Marker::Unordered => out.push("<li>".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(stack: &mut ListStack, marker: Marker, indent: usize) -> String {
        let mut out = Vec::new();
        stack.open_item(marker, indent, &mut out);
        out.concat()
    }

    fn drain(stack: &mut ListStack) -> String {
        let mut out = Vec::new();
        stack.close_all(&mut out);
        out.concat()
    }

    #[test]
    fn first_item_opens_list() {
        let mut stack = ListStack::default();
        assert_eq!(open(&mut stack, Marker::Unordered, 0), "<ul><li>");
        assert_eq!(stack.depth(), 1);
        assert_eq!(drain(&mut stack), "</li></ul>");
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn sibling_closes_previous_item() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        assert_eq!(open(&mut stack, Marker::Unordered, 0), "</li><li>");
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn ordered_list_starts_at_first_number() {
        let mut stack = ListStack::default();
        assert_eq!(open(&mut stack, Marker::Ordered(4), 0), "<ol start='4'><li>");
        assert_eq!(open(&mut stack, Marker::Ordered(5), 0), "</li><li>");
        assert_eq!(stack.frames.last().and_then(|f| f.last_number), Some(5));
    }

    #[test]
    fn ordered_gap_gets_explicit_value() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Ordered(1), 0);
        assert_eq!(open(&mut stack, Marker::Ordered(3), 0), "</li><li value='3'>");
        assert_eq!(open(&mut stack, Marker::Ordered(1), 0), "</li><li value='1'>");
        assert_eq!(open(&mut stack, Marker::Ordered(2), 0), "</li><li>");
    }

    #[test]
    fn ordered_max_number_does_not_overflow() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Ordered(u64::MAX), 0);
        assert_eq!(
            open(&mut stack, Marker::Ordered(1), 0),
            "</li><li value='1'>"
        );
    }

    #[test]
    fn deeper_indent_nests() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        assert_eq!(open(&mut stack, Marker::Unordered, 2), "<ul><li>");
        assert_eq!(stack.depth(), 2);
        assert_eq!(drain(&mut stack), "</li></ul></li></ul>");
    }

    #[test]
    fn shallower_indent_closes_deeper_frames() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        open(&mut stack, Marker::Unordered, 2);
        open(&mut stack, Marker::Unordered, 4);
        assert_eq!(
            open(&mut stack, Marker::Unordered, 0),
            "</li></ul></li></ul></li><li>"
        );
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn kind_change_at_same_indent_nests() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        assert_eq!(open(&mut stack, Marker::Ordered(1), 0), "<ol start='1'><li>");
        assert_eq!(stack.depth(), 2);
        assert_eq!(drain(&mut stack), "</li></ol></li></ul>");
    }

    #[test]
    fn close_deeper_than_keeps_shallower_frames() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        open(&mut stack, Marker::Ordered(1), 3);

        let mut out = Vec::new();
        assert_eq!(stack.close_deeper_than(1, &mut out), 1);
        assert_eq!(out.concat(), "</li></ol>");
        assert_eq!(stack.frames.last().map(|f| f.kind), Some(ListKind::Unordered));
    }

    #[test]
    fn peak_survives_closing_frames() {
        let mut stack = ListStack::default();
        open(&mut stack, Marker::Unordered, 0);
        open(&mut stack, Marker::Unordered, 2);
        open(&mut stack, Marker::Unordered, 4);
        drain(&mut stack);
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.peak(), 3);

        stack.reset_peak();
        assert_eq!(stack.peak(), 0);
        open(&mut stack, Marker::Unordered, 0);
        open(&mut stack, Marker::Unordered, 0);
        assert_eq!(stack.peak(), 1);
    }

    #[test]
    fn close_all_on_empty_stack_emits_nothing() {
        let mut stack = ListStack::default();
        let mut out = Vec::new();
        assert_eq!(stack.close_all(&mut out), 0);
        assert!(out.is_empty());
    }
}
