//! Quote-aware splitting of expression source.
//!
//! Delimiters inside `'...'` or `"..."` are literal. A backslash keeps the
//! next character from being treated as a delimiter or quote.

use crate::error::{Error, Result};
use crate::scope::Keypath;

/// The role of a clause after the core expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clause {
    Publish,
    Filter,
    Watch,
}

impl Clause {
    fn from_delimiter(c: char) -> Option<Clause> {
        match c {
            '>' => Some(Clause::Publish),
            '|' => Some(Clause::Filter),
            '<' => Some(Clause::Watch),
            _ => None,
        }
    }
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Split `source` on `predicate` outside quotes, keeping quotes and escapes
/// in the pieces. Each piece is paired with the delimiter that ended the
/// previous one.
fn split_outside_quotes(
    source: &str,
    predicate: impl Fn(char) -> bool,
) -> Result<Vec<(Option<char>, String)>> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut leading = None;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
            continue;
        }
        match quote {
            Some(open) => {
                if c == open {
                    quote = None;
                }
                current.push(c);
            }
            None if is_quote(c) => {
                quote = Some(c);
                current.push(c);
            }
            None if predicate(c) => {
                pieces.push((leading, std::mem::take(&mut current)));
                leading = Some(c);
            }
            None => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(Error::UnterminatedQuote(source.to_string()));
    }
    pieces.push((leading, current));
    Ok(pieces)
}

/// Split an expression into its core text and the trailing clauses.
pub(crate) fn clauses(source: &str) -> Result<(String, Vec<(Clause, String)>)> {
    let mut pieces = split_outside_quotes(source, |c| Clause::from_delimiter(c).is_some())?
        .into_iter();
    let core = pieces.next().map(|(_, text)| text).unwrap_or_default();
    let rest = pieces
        .filter_map(|(delimiter, text)| {
            delimiter
                .and_then(Clause::from_delimiter)
                .map(|clause| (clause, text))
        })
        .collect();
    Ok((core, rest))
}

/// Whitespace-separated words of a clause, quotes preserved.
pub(crate) fn words(clause: &str) -> Result<Vec<String>> {
    Ok(split_outside_quotes(clause, char::is_whitespace)?
        .into_iter()
        .map(|(_, word)| word)
        .filter(|word| !word.is_empty())
        .collect())
}

/// The contents of a fully quoted token, with escapes removed.
pub(crate) fn unquote(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let open = chars.next().filter(|c| is_quote(*c))?;
    if token.len() < 2 || !token.ends_with(open) {
        return None;
    }
    let inner = &token[1..token.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    Some(out)
}

/// `true` for standard finite decimal literals (`1`, `-2.5`, `.5`, `1e3`).
pub(crate) fn is_numeric(token: &str) -> bool {
    let starts_like_number = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    let only_number_chars = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    starts_like_number
        && only_number_chars
        && token.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Split a keypath token on unescaped dots outside quotes.
pub(crate) fn keypath(token: &str) -> Keypath {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = token.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (Some(open), c) if c == open => quote = None,
            (Some(_), c) => current.push(c),
            (None, c) if is_quote(c) => quote = Some(c),
            (None, '.') => segments.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    segments.push(current);
    Keypath::new(segments.into_iter().filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clauses_split_outside_quotes() {
        let (core, rest) = clauses("user.name | prefix '>| ' < updated > target").unwrap();
        assert_eq!(core.trim(), "user.name");
        assert_eq!(
            rest,
            vec![
                (Clause::Filter, " prefix '>| ' ".to_string()),
                (Clause::Watch, " updated ".to_string()),
                (Clause::Publish, " target".to_string()),
            ]
        );
    }

    #[test]
    fn words_keep_quoted_spaces() {
        assert_eq!(
            words("  greet 'hello world'  name ").unwrap(),
            vec!["greet", "'hello world'", "name"]
        );
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(matches!(clauses("say 'hi"), Err(Error::UnterminatedQuote(_))));
    }

    #[test]
    fn unquote_only_matches_whole_tokens() {
        assert_eq!(unquote("'a.b'").as_deref(), Some("a.b"));
        assert_eq!(unquote(r#""it\"s""#).as_deref(), Some("it\"s"));
        assert_eq!(unquote("'open"), None);
        assert_eq!(unquote("plain"), None);
    }

    #[test]
    fn numeric_accepts_finite_decimals_only() {
        for ok in ["0", "42", "-3.5", ".5", "1e3"] {
            assert!(is_numeric(ok), "{ok}");
        }
        for bad in ["Infinity", "NaN", "inf", "1e400", "1.2.3", "abc", "", "-"] {
            assert!(!is_numeric(bad), "{bad}");
        }
    }

    #[test]
    fn keypath_respects_quotes_and_escapes() {
        assert_eq!(keypath("user.name"), Keypath::new(["user", "name"]));
        assert_eq!(
            keypath("user.'first.name'.length"),
            Keypath::new(["user", "first.name", "length"])
        );
        assert_eq!(keypath(r"a\.b.c"), Keypath::new(["a.b", "c"]));
    }
}
