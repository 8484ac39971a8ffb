//! Formula parsing, rollset selection and message formatting.
//!
//! A formula is free text with `#placeholders` in it:
//!
//! - `#face_value`: the roll result (a list or a sum, depending on mode)
//! - `#die_name`: the names of the dice that rolled
//! - a die's token, e.g. `#red_d20`: that die's own face
//!
//! A placeholder is `#` followed by the longest run of ASCII letters,
//! digits, `_` and `-`. Matching ignores ASCII case, so `#Face_Value`
//! works too. Whole placeholders are compared: `#a` never matches inside
//! `#apple`.

use std::collections::HashMap;

use pixelroll_die::{Die, DieId};

/// Replaced by the roll result.
pub const WILDCARD: &str = "#face_value";

/// Replaced by the names of the dice that rolled.
pub const NAME_PLACEHOLDER: &str = "#die_name";

/// Formula used until the user picks one.
pub const DEFAULT_FORMULA: &str = "ROLLED: #face_value";

fn is_placeholder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// A piece of formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Splits text into literal runs and placeholders.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let Some(body) = self.rest.strip_prefix('#') else {
            let end = self.rest.find('#').unwrap_or(self.rest.len());
            let (text, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Some(Segment::Text(text));
        };

        let len = body
            .find(|c: char| !is_placeholder_char(c))
            .unwrap_or(body.len());
        let (segment, rest) = self.rest.split_at(len + 1);
        self.rest = rest;
        if len == 0 {
            Some(Segment::Text(segment))
        } else {
            Some(Segment::Placeholder(segment))
        }
    }
}

fn segments(text: &str) -> Segments<'_> {
    Segments { rest: text }
}

/// Whether `formula` contains `placeholder` as a whole placeholder.
pub fn contains_placeholder(formula: &str, placeholder: &str) -> bool {
    segments(formula).any(|segment| match segment {
        Segment::Placeholder(p) => p.eq_ignore_ascii_case(placeholder),
        Segment::Text(_) => false,
    })
}

/// Picks the dice that take part in a roll of `formula`.
///
/// A die is in the rollset if it is enabled and either the formula has
/// the wildcard or it names the die's token. The result keeps the input
/// order, and the function has no other inputs, so the same dice and
/// formula always give the same rollset.
pub fn compute_rollset<'a>(
    formula: &str,
    dice: impl IntoIterator<Item = &'a Die>,
) -> Vec<DieId> {
    let wildcard = contains_placeholder(formula, WILDCARD);
    dice.into_iter()
        .filter(|die| die.is_enabled())
        .filter(|die| wildcard || contains_placeholder(formula, die.token()))
        .map(|die| die.id())
        .collect()
}

/// Values substituted into a formula for one chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContext {
    wildcard: String,
    names: String,
    /// Keyed by lowercased token.
    tokens: HashMap<String, String>,
}

impl MessageContext {
    pub fn new(wildcard: impl Into<String>, names: impl Into<String>) -> Self {
        Self {
            wildcard: wildcard.into(),
            names: names.into(),
            tokens: HashMap::new(),
        }
    }

    /// Adds a per-die token substitution.
    pub fn with_token(
        mut self,
        token: &str,
        value: impl Into<String>,
    ) -> Self {
        self.tokens.insert(token.to_ascii_lowercase(), value.into());
        self
    }

    pub fn set_wildcard(&mut self, wildcard: impl Into<String>) {
        self.wildcard = wildcard.into();
    }

    pub fn set_names(&mut self, names: impl Into<String>) {
        self.names = names.into();
    }

    fn lookup(&self, placeholder: &str) -> Option<&str> {
        if placeholder.eq_ignore_ascii_case(WILDCARD) {
            return Some(&self.wildcard);
        }
        if placeholder.eq_ignore_ascii_case(NAME_PLACEHOLDER) {
            return Some(&self.names);
        }
        self.tokens
            .get(&placeholder.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Renders `formula` into chat posts, one per non-blank line.
///
/// Placeholders with no value in `ctx` are left as they are.
pub fn format_message(formula: &str, ctx: &MessageContext) -> Vec<String> {
    formula
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut out = String::with_capacity(line.len());
            for segment in segments(line) {
                match segment {
                    Segment::Text(text) => out.push_str(text),
                    Segment::Placeholder(p) => {
                        out.push_str(ctx.lookup(p).unwrap_or(p));
                    }
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn die(id: u64, name: &str, enabled: bool) -> Die {
        Die::new(DieId::new(id), name, enabled)
    }

    #[test]
    fn test_segments_split_placeholders_and_text() {
        let parts: Vec<_> = segments("Hit #red_d20 for #face_value!").collect();
        assert_eq!(
            parts,
            [
                Segment::Text("Hit "),
                Segment::Placeholder("#red_d20"),
                Segment::Text(" for "),
                Segment::Placeholder("#face_value"),
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_segments_lone_hash_is_text() {
        let parts: Vec<_> = segments("# #").collect();
        assert!(parts.iter().all(|p| matches!(p, Segment::Text(_))));
    }

    #[test]
    fn test_contains_placeholder_matches_whole_token_only() {
        assert!(contains_placeholder("roll #a now", "#a"));
        assert!(!contains_placeholder("roll #apple now", "#a"));
        assert!(contains_placeholder("#FACE_VALUE", WILDCARD));
    }

    #[test]
    fn test_compute_rollset_wildcard_takes_all_enabled() {
        let dice = [die(1, "A", true), die(2, "B", false), die(3, "C", true)];
        let rollset = compute_rollset("You rolled #face_value", &dice);
        assert_eq!(rollset, [DieId::new(1), DieId::new(3)]);
    }

    #[test]
    fn test_compute_rollset_tokens_select_named_dice() {
        let dice = [die(1, "A", true), die(2, "B", true)];
        let rollset = compute_rollset("Attack #b", &dice);
        assert_eq!(rollset, [DieId::new(2)]);
    }

    #[test]
    fn test_compute_rollset_is_pure() {
        let dice = [die(1, "A", true), die(2, "B", true), die(3, "C", false)];
        let formula = "#a and #c";
        let first = compute_rollset(formula, &dice);
        let _ = compute_rollset("#face_value", &dice);
        let second = compute_rollset(formula, &dice);
        assert_eq!(first, second);
        assert_eq!(first, [DieId::new(1)]);
    }

    #[test]
    fn test_format_message_substitutes_all_placeholders() {
        let ctx = MessageContext::new("10", "A, B")
            .with_token("#a", "4")
            .with_token("#b", "6");
        let posts =
            format_message("#die_name rolled #face_value (#a + #b)", &ctx);
        assert_eq!(posts, ["A, B rolled 10 (4 + 6)"]);
    }

    #[test]
    fn test_format_message_one_post_per_line() {
        let ctx = MessageContext::new("7", "A");
        let posts = format_message("first #face_value\n\n  \nsecond\r\n", &ctx);
        assert_eq!(posts, ["first 7", "second"]);
    }

    #[test]
    fn test_format_message_leaves_unknown_placeholders() {
        let ctx = MessageContext::new("3", "A");
        let posts = format_message("#face_value vs #goblin", &ctx);
        assert_eq!(posts, ["3 vs #goblin"]);
    }
}
