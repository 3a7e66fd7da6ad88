use std::borrow::Cow;

use unicode_width::UnicodeWidthStr;

/// Display width of a string in terminal columns.
///
/// CJK ideographs count as 2 columns and ASCII as 1, which is also the
/// ratio the word cloud layout uses to size word boxes (1 em vs ½ em).
///
/// ```
/// use newscloud::util::display_width;
///
/// assert_eq!(display_width("news"), 4);
/// assert_eq!(display_width("中国"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Strip control characters from scraped text, keeping whitespace.
///
/// Returns `Cow::Borrowed` when there is nothing to remove, which is the
/// case for nearly every headline.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unwanted = |c: char| c.is_control() && !c.is_whitespace();

    if !s.chars().any(is_unwanted) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_unwanted(c)).collect())
}
