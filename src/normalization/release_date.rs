use chrono::{Datelike, NaiveDate};

// Storefront locales render release dates differently; these cover the
// countries we fetch. Order matters only for speed.
const DATE_FORMATS: [&str; 9] = [
    "%d %b, %Y",
    "%b %d, %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%Y年%m月%d日",
    "%Y년 %m월 %d일",
];

/// Release year of a free-text storefront date, `None` when unparsable.
///
/// Placeholders like "Coming soon" or "Q1 2025" yield `None`; callers exclude
/// those rows instead of zero-filling them.
pub fn release_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.year());
        }
    }
    // Month-and-year only ("Nov 2019"): chrono needs a day to build a date.
    for fmt in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {s}"), fmt) {
            return Some(d.year());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_storefront_formats() {
        assert_eq!(release_year("21 Aug, 2012"), Some(2012));
        assert_eq!(release_year("Aug 21, 2012"), Some(2012));
        assert_eq!(release_year("9 July, 2013"), Some(2013));
        assert_eq!(release_year("2020-03-23"), Some(2020));
        assert_eq!(release_year("2017年12月21日"), Some(2017));
        assert_eq!(release_year("2017년 12월 21일"), Some(2017));
        assert_eq!(release_year("Nov 2019"), Some(2019));
        assert_eq!(release_year(" 2004 "), Some(2004));
    }

    #[test]
    fn placeholders_are_unparsable() {
        assert_eq!(release_year("Coming soon"), None);
        assert_eq!(release_year("To be announced"), None);
        assert_eq!(release_year("Q1 2025"), None);
        assert_eq!(release_year(""), None);
    }
}
