use bsbi::tokenizer::tokenize;

#[test]
fn it_splits_on_any_whitespace() {
    assert!(tokenize("").is_empty());
    assert!(tokenize(" \n\t").is_empty());
    assert_eq!(tokenize("hi"), vec!["hi"]);
    assert_eq!(tokenize(" hi there  \n"), vec!["hi", "there"]);
}

#[test]
fn it_lowercases_and_strips_punctuation() {
    assert_eq!(tokenize("ABC"), vec!["abc"]);
    assert_eq!(tokenize("u.s.a. u,s,a, usa! ?usa"), vec!["usa", "usa", "usa", "usa"]);
    assert_eq!(tokenize("usa's s-i"), vec!["usas", "si"]);
    assert_eq!(tokenize("UsA's-?"), vec!["usas"]);
}

#[test]
fn it_drops_tokens_that_were_only_punctuation() {
    // positions must stay dense, so "--" must not leave a hole
    assert_eq!(tokenize("alpha -- beta"), vec!["alpha", "beta"]);
}

#[test]
fn it_normalizes_compatibility_forms() {
    let toks = tokenize("ｆｕｌｌｗｉｄｔｈ Ⅻ");
    assert_eq!(toks, vec!["fullwidth", "xii"]);
}
