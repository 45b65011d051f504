//! Turns raw catalog tokens into presentable labels.

/// Literal replacements, applied in order before tokenizing.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("-", " "),
    ("_", " "),
    ("ae", "ä"),
    ("ue", "ü"),
    ("oe", "ö"),
];

/// Contracted place-name tokens and their long forms.
const EXPANSIONS: &[(&str, &str)] = &[("st", "St."), ("stgallen", "St. Gallen")];

/// Normalize a catalog token into a display label.
///
/// `"altstetten"` becomes `"Altstetten"`, `"st_gallen"` becomes `"St. Gallen"`.
#[must_use]
pub fn normalize(text: &str) -> String {
    let replaced = REPLACEMENTS
        .iter()
        .fold(text.to_owned(), |acc, (search, replace)| {
            acc.replace(search, replace)
        });

    replaced
        .split_whitespace()
        .map(|token| {
            EXPANSIONS
                .iter()
                .find(|(short, _)| token.eq_ignore_ascii_case(short))
                .map_or_else(|| capitalize(token), |(_, long)| (*long).to_owned())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`normalize`], passing an absent value through unchanged.
#[must_use]
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
