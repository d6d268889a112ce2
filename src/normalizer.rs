// Cleans up free-text product names before they are sent upstream

/// Common brand misspellings seen in user-entered product names.
const BRAND_CORRECTIONS: &[(&str, &str)] = &[
    ("nik", "nike"),
    ("addidas", "adidas"),
    ("adiddas", "adidas"),
    ("pumaa", "puma"),
    ("zaraa", "zara"),
];

/// Collapses whitespace and fixes known brand typos word by word.
pub fn normalize_product_name(name: &str) -> String {
    name.split_whitespace()
        .map(normalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    for (typo, fixed) in BRAND_CORRECTIONS {
        if lower == *typo {
            return fixed.to_string();
        }
    }
    word.to_string()
}
