use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. CJK names count two cells per character.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn grapheme_width(g: &str) -> usize {
    UnicodeWidthStr::width(g)
}

/// Truncate to at most `max_cells` cells, ending in `…` when cut.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for g in s.graphemes(true) {
        let gw = grapheme_width(g);
        if width + gw > budget {
            break;
        }
        width += gw;
        out.push_str(g);
    }
    out.push('\u{2026}');
    out
}

/// Right-pad with spaces to exactly `cells` columns (truncating if longer)
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let cut = truncate_to_width(s, cells);
    let w = display_width(&cut);
    let mut out = cut;
    out.extend(std::iter::repeat_n(' ', cells.saturating_sub(w)));
    out
}

/// First non-blank line of free text, cut to `max_cells`; used for list previews
pub fn preview_line(text: &str, max_cells: usize) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate_to_width(line, max_cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_cjk_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("子"), 2);
        assert_eq!(display_width("便签10"), 6);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_to_width("hello world", 6), "hello\u{2026}");
        assert_eq!(truncate_to_width("hello", 5), "hello");
        assert_eq!(truncate_to_width("hello", 0), "");
    }

    #[test]
    fn truncate_never_splits_wide_char() {
        // 4 cells of budget after the ellipsis: 标签 fits, 1 does not
        assert_eq!(truncate_to_width("标签123", 5), "标签\u{2026}");
        // 3 cells: only one wide char fits before the ellipsis
        assert_eq!(truncate_to_width("标签123", 4), "标\u{2026}");
    }

    #[test]
    fn pad_aligns_mixed_scripts() {
        assert_eq!(pad_to_width("子", 4), "子  ");
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(display_width(&pad_to_width("标签123", 5)), 5);
    }

    #[test]
    fn preview_skips_blank_lines() {
        assert_eq!(preview_line("\n\n  first\nsecond", 20), "first");
        assert_eq!(preview_line("", 20), "");
    }
}
