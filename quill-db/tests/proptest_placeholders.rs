use proptest::prelude::*;
use quill_db::placeholder::{rewrite, PlaceholderStyle};

/// SQL fragments paired with the number of bare placeholders each contributes.
const FRAGMENTS: &[(&str, usize)] = &[
    ("select * from user where id = ", 0),
    ("?", 1),
    (" and name = ?", 1),
    (" , ", 0),
    ("'what?'", 0),
    ("\"odd?column\"", 0),
    ("-- why?\n", 0),
    ("/* ? ? */", 0),
    (" like '50%'", 0),
];

fn statement() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..24).prop_map(|parts| {
        let sql = parts.iter().map(|(text, _)| *text).collect::<String>();
        let expected = parts.iter().map(|(_, n)| n).sum();
        (sql, expected)
    })
}

proptest! {
    /// Property: only placeholders outside literals and comments are counted
    #[test]
    fn counts_bare_placeholders((sql, expected) in statement()) {
        for style in [
            PlaceholderStyle::Question,
            PlaceholderStyle::Indexed,
            PlaceholderStyle::Numbered,
            PlaceholderStyle::Format,
        ] {
            prop_assert_eq!(rewrite(&sql, style).placeholders, expected);
        }
    }

    /// Property: the question style leaves statements untouched
    #[test]
    fn question_style_is_identity((sql, _) in statement()) {
        prop_assert_eq!(rewrite(&sql, PlaceholderStyle::Question).sql, sql);
    }

    /// Property: numbered markers run from 1 to the placeholder count
    #[test]
    fn numbered_markers_are_sequential((sql, expected) in statement()) {
        let out = rewrite(&sql, PlaceholderStyle::Numbered);
        for n in 1..=expected {
            let marker = format!("${}", n);
            prop_assert!(out.sql.contains(&marker), "missing {} in {}", marker, out.sql);
        }
        let past_end = format!("${}", expected + 1);
        prop_assert!(!out.sql.contains(&past_end));
    }
}
