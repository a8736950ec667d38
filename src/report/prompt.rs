use itertools::Itertools;

use super::focus::{Focus, FocusView, Table};

/// Used when the caller gives no extra question.
pub const DEFAULT_INVITATION: &str = "Feel free to point out anything else you notice.";

const MARKDOWN_REQUEST: &str =
    "Please format the answer as Markdown, with headings and bullet points where useful.";

/// Instruction text for the summarizer. Deterministic and infallible.
pub fn build_prompt<S: AsRef<str>>(
    view: &FocusView,
    countries: &[S],
    focus: &Focus,
    user_extra: Option<&str>,
    markdown: bool,
) -> String {
    let country_names = countries.iter().map(|c| c.as_ref().trim()).join(", ");
    // Blank text falls back to the invitation; anything else goes in untouched.
    let extra = user_extra
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_INVITATION);

    let mut table = render_table(&view.table());
    if let Some(bands) = view.price_bands() {
        table.push_str("\n\nFree vs paid and paid games per price band (JPY):\n");
        table.push_str(&render_table(&bands.table()));
    }

    let mut prompt = format!(
        "The following is Steam store data for {country_names}, prepared to analyse \"{focus}\".\n\
         (Rows used: {rows})\n\
         \n\
         {table}\n\
         \n\
         Based on this data, please analyse in natural language:\n\
         - trends and correlations\n\
         - interesting patterns or anomalies\n\
         - comparisons between countries\n\
         - forward-looking hypotheses (where possible)\n\
         \n\
         {extra}\n",
        focus = focus.label(),
        rows = view.len(),
    );
    if markdown {
        prompt.push('\n');
        prompt.push_str(MARKDOWN_REQUEST);
        prompt.push('\n');
    }
    prompt
}

/// Fixed-width text table, one line per row, columns separated by two spaces.
pub fn render_table(table: &Table) -> String {
    if table.rows.is_empty() {
        return format!("{}\n(no rows)", table.headers.join("  "));
    }
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            table
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .join("  ")
            .trim_end()
            .to_string()
    };
    std::iter::once(line(table.headers.clone()))
        .chain(
            table
                .rows
                .iter()
                .map(|r| line(r.iter().map(String::as_str).collect())),
        )
        .join("\n")
}
