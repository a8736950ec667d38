use crate::database_ops::db::GameRow;

/// Keep rows whose country is in `selected` (case-insensitive).
///
/// An empty selection selects nothing. Callers check for an empty result
/// before transforming; this stays a plain membership predicate.
pub fn filter_countries<S: AsRef<str>>(rows: Vec<GameRow>, selected: &[S]) -> Vec<GameRow> {
    rows.into_iter()
        .filter(|r| {
            selected
                .iter()
                .any(|c| c.as_ref().trim().eq_ignore_ascii_case(&r.country))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::sample_row;

    fn rows() -> Vec<GameRow> {
        vec![
            sample_row(1, "jp"),
            sample_row(1, "us"),
            sample_row(2, "kr"),
            sample_row(3, "jp"),
        ]
    }

    #[test]
    fn keeps_selected_countries_as_a_union() {
        let out = filter_countries(rows(), &["jp", "US"]);
        let got: Vec<(i64, &str)> = out.iter().map(|r| (r.app_id, r.country.as_str())).collect();
        assert_eq!(got, vec![(1, "jp"), (1, "us"), (3, "jp")]);
    }

    #[test]
    fn empty_selection_selects_nothing() {
        let none: [&str; 0] = [];
        assert!(filter_countries(rows(), &none).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let sel = ["kr", "jp"];
        let once = filter_countries(rows(), &sel);
        let twice = filter_countries(once.clone(), &sel);
        assert_eq!(once, twice);
    }
}
