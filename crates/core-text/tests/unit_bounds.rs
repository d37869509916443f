//! Property tests: unit ranges and clamping always stay inside the buffer.

use core_text::{Buffer, DeleteUnit, Direction, utf16_len};
use proptest::prelude::*;

fn any_unit() -> impl Strategy<Value = DeleteUnit> {
    prop_oneof![
        Just(DeleteUnit::Char),
        Just(DeleteUnit::Grapheme),
        Just(DeleteUnit::Word),
        Just(DeleteUnit::Line),
    ]
}

proptest! {
    #[test]
    fn unit_range_within_buffer(text in "[a-z \\n😀é\u{0301}]{0,24}", at in 0usize..40, unit in any_unit(), backward in any::<bool>()) {
        let buf = Buffer::new(&text);
        let dir = if backward { Direction::Backward } else { Direction::Forward };
        let r = buf.unit_range(at, unit, dir);
        prop_assert!(r.start <= r.end);
        prop_assert!(r.end <= buf.len_utf16());
        let caret = buf.clamp(at);
        match dir {
            Direction::Backward => prop_assert_eq!(r.end, caret),
            Direction::Forward => prop_assert_eq!(r.start, caret),
        }
    }

    #[test]
    fn clamp_is_idempotent(text in "[a-z😀]{0,16}", at in 0usize..40) {
        let buf = Buffer::new(&text);
        let once = buf.clamp(at);
        prop_assert_eq!(buf.clamp(once), once);
        prop_assert!(once <= utf16_len(&text));
    }

    #[test]
    fn removing_a_unit_shrinks_by_its_length(text in "[a-z \\n😀]{1,24}", at in 0usize..30, unit in any_unit()) {
        let mut buf = Buffer::new(&text);
        let before = buf.len_utf16();
        let r = buf.unit_range(at, unit, Direction::Backward);
        let removed = buf.remove(r.clone());
        prop_assert_eq!(utf16_len(&removed), r.end - r.start);
        prop_assert_eq!(buf.len_utf16(), before - (r.end - r.start));
    }
}
