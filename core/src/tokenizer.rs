use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[!?.,'\-]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Splits on whitespace, then NFKC-normalizes, lowercases and strips `! ? . , ' -`
/// from each token. Tokens left empty are dropped, so positions stay dense.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(normalize).collect()
}

/// `tokenize` followed by English stemming.
pub fn tokenize_stemmed(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|term| STEMMER.stem(&term).into_owned()).collect()
}

fn normalize(token: &str) -> Option<String> {
    let lowered = token.nfkc().collect::<String>().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.into_owned())
    }
}
