use std::borrow::Cow;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Positional `?`, understood natively by ODBC and `SQLite`.
    Positional,
    /// SQL Server (`tiberius`) numbered parameters: `@P1`, `@P2`, …
    AtP,
    /// Oracle numbered binds: `:1`, `:2`, …
    Colon,
}

impl PlaceholderStyle {
    fn prefix(self) -> &'static str {
        match self {
            PlaceholderStyle::Positional => "?",
            PlaceholderStyle::AtP => "@P",
            PlaceholderStyle::Colon => ":",
        }
    }

    /// Render placeholder number `n` (1-based).
    #[must_use]
    pub fn render(self, n: usize) -> String {
        match self {
            PlaceholderStyle::Positional => "?".to_string(),
            _ => format!("{}{n}", self.prefix()),
        }
    }
}

/// A placeholder found in command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder {
    start: usize,
    end: usize,
    /// Explicit number of a `?N` placeholder.
    number: Option<usize>,
}

/// Rewrite positional `?` placeholders into `target` style.
///
/// Bare `?` take the next sequential number; `?N` keeps its number. Text inside
/// quotes, `[bracketed]` identifiers and comments is left alone. Returns a
/// borrowed `Cow` when nothing changed.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    if target == PlaceholderStyle::Positional {
        return Cow::Borrowed(sql);
    }
    let placeholders = scan_placeholders(sql);
    if placeholders.is_empty() {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + placeholders.len() * 2);
    let mut copied = 0;
    let mut next_index = 1;
    for placeholder in placeholders {
        out.push_str(&sql[copied..placeholder.start]);
        let number = placeholder.number.unwrap_or_else(|| {
            let n = next_index;
            next_index += 1;
            n
        });
        out.push_str(&target.render(number));
        copied = placeholder.end;
    }
    out.push_str(&sql[copied..]);
    Cow::Owned(out)
}

/// Number of `?` placeholders outside literals and comments.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    scan_placeholders(sql).len()
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment(u32),
}

fn scan_placeholders(sql: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::Quoted(b'\''),
                b'"' => state = State::Quoted(b'"'),
                b'[' => state = State::Quoted(b']'),
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    let (end, number) = match scan_digits(bytes, idx + 1) {
                        Some((digits_end, digits)) => (digits_end, digits.parse().ok()),
                        None => (idx + 1, None),
                    };
                    found.push(Placeholder {
                        start: idx,
                        end,
                        number,
                    });
                    idx = end - 1;
                }
                _ => {}
            },
            State::Quoted(close) => {
                if b == close {
                    if bytes.get(idx + 1) == Some(&close) {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }
    found
}

fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_to_sql_server_style() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::AtP);
        assert_eq!(res, "select * from t where a = @P1 and b = @P2");
    }

    #[test]
    fn translates_to_oracle_style() {
        let sql = "insert into t values(?, ?)";
        let res = translate_placeholders(sql, PlaceholderStyle::Colon);
        assert_eq!(res, "insert into t values(:1, :2)");
    }

    #[test]
    fn keeps_explicit_numbers() {
        let sql = "select ?2, ?1";
        let res = translate_placeholders(sql, PlaceholderStyle::AtP);
        assert_eq!(res, "select @P2, @P1");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', [a?b], \"x?\" -- ?\n/* ? /* ? */ */ from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Colon);
        assert_eq!(
            res,
            "select '?', [a?b], \"x?\" -- ?\n/* ? /* ? */ */ from t where a = :1"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = "select 'it''s ?' where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::AtP);
        assert_eq!(res, "select 'it''s ?' where a = @P1");
    }

    #[test]
    fn positional_target_and_no_placeholders_borrow() {
        let sql = "select * from t where a = ?";
        assert!(matches!(
            translate_placeholders(sql, PlaceholderStyle::Positional),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            translate_placeholders("select 1", PlaceholderStyle::AtP),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn counts_placeholders() {
        assert_eq!(count_placeholders("select '?' from t where a = ? and b = ?"), 2);
        assert_eq!(count_placeholders("select 1"), 0);
    }
}
