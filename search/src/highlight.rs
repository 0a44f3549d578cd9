use std::collections::BTreeSet;

use crate::analyzer::Analyzer;

/// Verify that `text` contains every token of `matched` and, if given, a token
/// starting with `prefix`. Returns the text, with `<b>` markers around the
/// matched runs when `highlight` is set, or `None` if the text does not match.
pub fn search_all_maybe_highlight(analyzer: &dyn Analyzer, text: &str, matched: &BTreeSet<String>, prefix: Option<&str>, highlight: bool) -> Option<String> {
    let mut out = String::new();
    let mut upto = 0;
    let mut matched_in_text = BTreeSet::new();
    let mut matched_prefix = false;
    for token in analyzer.tokens(text) {
        if upto < token.start {
            if highlight {
                out.push_str(&text[upto..token.start]);
            }
            upto = token.start;
        } else if upto > token.start {
            continue;
        }

        let surface = &text[token.start..token.end];
        if matched.contains(&token.text) {
            if highlight {
                add_whole_match(&mut out, surface);
            }
            upto = token.end;
            matched_in_text.insert(token.text);
        } else if let Some(prefix) = prefix.filter(|p| token.text.starts_with(*p)) {
            if highlight {
                add_prefix_match(&mut out, surface, prefix);
            }
            upto = token.end;
            matched_prefix = true;
        }
    }

    if (prefix.is_some() && !matched_prefix) || matched_in_text.len() < matched.len() {
        return None;
    }
    if !highlight {
        return Some(text.to_string());
    }
    out.push_str(&text[upto..]);
    Some(out)
}

fn add_whole_match(out: &mut String, surface: &str) {
    out.push_str("<b>");
    out.push_str(surface);
    out.push_str("</b>");
}

fn add_prefix_match(out: &mut String, surface: &str, prefix: &str) {
    let prefix_chars = prefix.chars().count();
    match surface.char_indices().nth(prefix_chars) {
        Some((split, _)) => {
            out.push_str("<b>");
            out.push_str(&surface[..split]);
            out.push_str("</b>");
            out.push_str(&surface[split..]);
        }
        None => add_whole_match(out, surface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::StandardAnalyzer;

    fn set(tokens: &[&str]) -> BTreeSet<String> { tokens.iter().map(|t| t.to_string()).collect() }

    #[test]
    fn test_highlights_whole_and_prefix_matches() {
        let text = "The Quick brown Fox, jumping";
        let highlighted = search_all_maybe_highlight(&StandardAnalyzer, text, &set(&["quick"]), Some("fo"), true);
        assert_eq!(highlighted.as_deref(), Some("The <b>Quick</b> brown <b>Fo</b>x, jumping"));
        let plain = search_all_maybe_highlight(&StandardAnalyzer, text, &set(&["quick"]), Some("fo"), false);
        assert_eq!(plain.as_deref(), Some(text));
    }

    #[test]
    fn test_missing_token_or_prefix_is_no_match() {
        let text = "quick brown dog";
        assert!(search_all_maybe_highlight(&StandardAnalyzer, text, &set(&["quick"]), Some("fo"), true).is_none());
        assert!(search_all_maybe_highlight(&StandardAnalyzer, text, &set(&["quick", "fox"]), None, false).is_none());
        assert_eq!(search_all_maybe_highlight(&StandardAnalyzer, text, &set(&[]), Some("dog"), true).as_deref(), Some("quick brown <b>dog</b>"));
    }
}
