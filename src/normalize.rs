//! Text normalization: stopword filtering, suffix stemming and dictionary
//! lemmatization.
//!
//! The rules here are heuristic and deliberately literal. They are tuned
//! for a Go-programming corpus and produce crude roots such as `"runn"` for
//! `"running"`; downstream vectors depend on these exact outputs, so the
//! behavior must not be "corrected".
//!
//! # Pipeline
//!
//! ```text
//! text ──▶ whitespace split ──▶ drop stopwords ──▶ stem ──▶ lemmatize
//! ```

/// Closed stopword list. Matching is exact and case-sensitive.
pub const STOPWORDS: &[&str] = &[
    "a", "and", "the", "is", "to", "of", "in", "it", "that", "you", "this", "for", "on", "are",
    "with", "as", "be", "by", "at", "from", "or", "an", "but", "not", "we",
];

/// Domain keywords the stemmer returns untouched.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "func",
    "package",
    "import",
    "interface",
    "go",
    "goroutine",
    "channel",
    "select",
    "struct",
    "map",
    "slice",
    "var",
    "const",
    "type",
    "defer",
    "fallthrough",
];

/// Suffixes in the order they are tried. The first match wins.
const SUFFIXES: &[&str] = &[
    "es", "ed", "ing", "s", "ly", "ment", "ness", "ity", "ism", "er",
];

/// Fixed lemma table, consulted after stemming.
const LEMMAS: &[(&str, &str)] = &[
    ("execute", "execute"),
    ("running", "run"),
    ("returns", "return"),
    ("defined", "define"),
    ("compiles", "compile"),
    ("calls", "call"),
    ("creating", "create"),
    ("invoke", "invoke"),
    ("declares", "declare"),
    ("references", "reference"),
    ("implements", "implement"),
    ("utilizes", "utilize"),
    ("tests", "test"),
    ("loops", "loop"),
    ("deletes", "delete"),
];

/// Returns `true` if `token` is in the stopword list.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Split on Unicode whitespace. No case folding, no punctuation handling.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Strip the first matching suffix from `word`.
///
/// Domain keywords are returned unchanged. For `es`, a word whose remainder
/// ends in `i` keeps that `i` (`"studies"` → `"studi"`). All other matches
/// drop exactly the matched suffix, so `"running"` becomes `"runn"`.
pub fn stem(word: &str) -> String {
    if DOMAIN_KEYWORDS.contains(&word) {
        return word.to_string();
    }

    // The irregular `ies` plural and the `ed`/`ing` forms all reduce to
    // dropping the literal suffix, so one strip covers every branch.
    SUFFIXES
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .unwrap_or(word)
        .to_string()
}

/// Map a stemmed token to its base form.
///
/// Tokens missing from the lemma table that end in `ing` or `ed` lose their
/// last three characters, even for `ed`. Tokens shorter than three
/// characters collapse to the empty string.
pub fn lemmatize(word: &str) -> String {
    if let Some((_, base)) = LEMMAS.iter().find(|(from, _)| *from == word) {
        return (*base).to_string();
    }

    if word.ends_with("ing") || word.ends_with("ed") {
        return drop_trailing_chars(word, "ing".len());
    }

    word.to_string()
}

fn drop_trailing_chars(word: &str, n: usize) -> String {
    match word.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => word[..idx].to_string(),
        None => String::new(),
    }
}

/// Run the full pipeline over an already tokenized document.
pub fn normalize_tokens<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .filter(|t| !is_stopword(t))
        .map(|t| lemmatize(&stem(t)))
        .collect()
}

/// Tokenize and normalize a raw document.
pub fn normalize(text: &str) -> Vec<String> {
    normalize_tokens(tokenize(text))
}
