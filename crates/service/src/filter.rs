//! Case-insensitive "contains" predicates over one or more fields.
//!
//! The search word is matched as literal text: it is never interpreted as a
//! regular expression or as SQL wildcards.

/// Matches a record when any of `fields` contains `word`, ignoring case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexFilter<F = String> {
    pub fields: Vec<F>,
    pub word: String,
}

/// Build a filter over the given fields for `word`.
pub fn to_regexp_query<F, I>(fields: I, word: &str) -> RegexFilter<F>
where
    I: IntoIterator<Item = F>,
{
    RegexFilter { fields: fields.into_iter().collect(), word: word.to_string() }
}

/// Split a `filterColumn` value such as `"name, updateTime"` into field names.
pub fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl<F> RegexFilter<F> {
    /// Case-insensitive substring test against one field value.
    pub fn matches_text(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.word.to_lowercase())
    }

    /// `LIKE` pattern for a lower-cased column, with `\` as the escape character.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.word.len() + 2);
        pattern.push('%');
        for c in self.word.to_lowercase().chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    /// Resolve field names into another representation, dropping those that do not resolve.
    /// With no fields left the filter matches nothing.
    pub fn filter_map_fields<G>(self, f: impl FnMut(F) -> Option<G>) -> RegexFilter<G> {
        RegexFilter { fields: self.fields.into_iter().filter_map(f).collect(), word: self.word }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignoring_case() {
        let f = to_regexp_query(["name".to_string()], "foo");
        assert!(f.matches_text("FooBar"));
        assert!(f.matches_text("a fOo b"));
        assert!(!f.matches_text("fo"));
    }

    #[test]
    fn empty_word_matches_everything() {
        let f = to_regexp_query(["name".to_string()], "");
        assert!(f.matches_text(""));
        assert!(f.matches_text("anything"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let f = to_regexp_query(["name".to_string()], "a.c");
        assert!(f.matches_text("xa.cx"));
        assert!(!f.matches_text("abc"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let f = to_regexp_query(["name".to_string()], "50%_Off\\");
        assert_eq!(f.like_pattern(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn split_fields_trims_and_drops_empty() {
        assert_eq!(split_fields(" name , updateTime,,"), vec!["name", "updateTime"]);
        assert!(split_fields(" , ").is_empty());
    }

    #[test]
    fn filter_map_fields_drops_unresolved() {
        let f = to_regexp_query(["a".to_string(), "b".to_string()], "x");
        let mapped: RegexFilter<usize> = f.clone().filter_map_fields(|s| (s == "a").then_some(1));
        assert_eq!(mapped.fields, vec![1]);
        assert_eq!(mapped.word, "x");
        let none: RegexFilter<usize> = f.filter_map_fields(|_| None);
        assert!(none.fields.is_empty());
    }
}
