//! Rewrites portable `?` placeholders into a driver's native markers.
//!
//! Question marks inside quoted literals, quoted identifiers and comments are
//! left alone.

use std::fmt::Write;

/// Native placeholder syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (left unchanged)
    Question,
    /// `?1`, `?2`, ... (SQLite)
    Indexed,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
    /// `%s` (MySQL DB-API drivers); literal `%` is escaped as `%%`
    Format,
}

/// Result of rewriting one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub sql: String,
    pub placeholders: usize,
}

#[derive(Clone, Copy)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Rewrite each `?` outside string literals, quoted identifiers and comments
/// into `style`'s marker, counting the markers written.
pub fn rewrite(sql: &str, style: PlaceholderStyle) -> Rewritten {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut placeholders = 0;
    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '?' => {
                    placeholders += 1;
                    push_marker(&mut out, style, placeholders);
                }
                '\'' | '"' | '`' => {
                    state = State::Quoted(c);
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = State::LineComment;
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    out.push(c);
                    out.push('*');
                    chars.next();
                }
                _ => push_plain(&mut out, style, c),
            },
            // A doubled quote leaves and immediately re-enters the literal,
            // which needs no special case.
            State::Quoted(quote) => {
                if c == quote {
                    state = State::Code;
                }
                push_plain(&mut out, style, c);
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
                push_plain(&mut out, style, c);
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    state = State::Code;
                    out.push('*');
                    out.push('/');
                    chars.next();
                } else {
                    push_plain(&mut out, style, c);
                }
            }
        }
    }

    Rewritten {
        sql: out,
        placeholders,
    }
}

fn push_marker(out: &mut String, style: PlaceholderStyle, index: usize) {
    match style {
        PlaceholderStyle::Question => out.push('?'),
        // Writing to a String cannot fail.
        PlaceholderStyle::Indexed => {
            let _ = write!(out, "?{}", index);
        }
        PlaceholderStyle::Numbered => {
            let _ = write!(out, "${}", index);
        }
        PlaceholderStyle::Format => out.push_str("%s"),
    }
}

fn push_plain(out: &mut String, style: PlaceholderStyle, c: char) {
    if c == '%' && style == PlaceholderStyle::Format {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        let out = rewrite(
            "select * from user where id=? and name=?",
            PlaceholderStyle::Numbered,
        );
        assert_eq!(out.sql, "select * from user where id=$1 and name=$2");
        assert_eq!(out.placeholders, 2);

        let out = rewrite("insert into t values (?,?)", PlaceholderStyle::Indexed);
        assert_eq!(out.sql, "insert into t values (?1,?2)");
    }

    #[test]
    fn skips_literals_and_comments() {
        let sql = "select '?', \"a?\", `b?` from t -- why?\nwhere x = ? /* and ? */";
        let out = rewrite(sql, PlaceholderStyle::Indexed);

        assert_eq!(out.placeholders, 1);
        assert_eq!(
            out.sql,
            "select '?', \"a?\", `b?` from t -- why?\nwhere x = ?1 /* and ? */"
        );
    }

    #[test]
    fn doubled_quotes_stay_inside_literal() {
        let out = rewrite("select 'it''s ?' , ?", PlaceholderStyle::Numbered);
        assert_eq!(out.sql, "select 'it''s ?' , $1");
    }

    #[test]
    fn format_style_escapes_percent() {
        let out = rewrite(
            "select * from blog where name like '%rust%' and id = ?",
            PlaceholderStyle::Format,
        );
        assert_eq!(
            out.sql,
            "select * from blog where name like '%%rust%%' and id = %s"
        );
    }

    #[test]
    fn question_style_is_identity() {
        let sql = "update t set a = ? where b = ?";
        let out = rewrite(sql, PlaceholderStyle::Question);
        assert_eq!(out.sql, sql);
        assert_eq!(out.placeholders, 2);
    }
}
