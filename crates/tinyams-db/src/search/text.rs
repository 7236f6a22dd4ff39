//! Tokenization shared by indexed documents and queries.
//!
//! Text is split on every non-alphanumeric character and lowercased, so
//! `jane.doe@example.com` indexes as `jane doe example com`. Documents
//! are stored as a space-joined token stream with a leading and trailing
//! space; a prefix unit then matches exactly when ` <unit>` occurs in the
//! stream. Fields are separated by a `|` token, which the tokenizer never
//! produces, so a multi-word unit cannot run from one field into the next.
//! First, middle and last name count as one field.

use tinyams_core::models::person::PersonEntry;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Derived columns stored next to an index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedText {
    pub search_text: String,
    pub token_count: u64,
}

const FIELD_BREAK: &str = " | ";

impl IndexedText {
    pub fn of(entry: &PersonEntry) -> Self {
        let [username, first, middle, last, email, phone, employer, job_title] =
            entry.indexed_text();
        let full_name = format!("{first} {middle} {last}");

        let fields: Vec<Vec<String>> =
            [username, full_name.as_str(), email, phone, employer, job_title]
                .into_iter()
                .map(tokenize)
                .filter(|tokens| !tokens.is_empty())
                .collect();

        let token_count = fields.iter().map(Vec::len).sum::<usize>() as u64;
        let search_text = fields
            .iter()
            .map(|tokens| tokens.join(" "))
            .collect::<Vec<_>>()
            .join(FIELD_BREAK);

        Self {
            search_text: format!(" {search_text} "),
            token_count,
        }
    }
}

/// A query reduced to the single prefix unit it stands for.
///
/// Multi-word input is not split into independent terms: `jane d`
/// matches a token `jane` immediately followed, in the same field, by a
/// token starting with `d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixQuery {
    tokens: Vec<String>,
}

impl PrefixQuery {
    /// `None` when the query holds no searchable characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let tokens = tokenize(raw.trim());
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// Substring to look for in a stored `search_text`.
    pub fn needle(&self) -> String {
        format!(" {}", self.tokens.join(" "))
    }

    /// Number of positions in `search_text` where the unit matches.
    pub fn match_count(&self, search_text: &str) -> u32 {
        let doc: Vec<&str> = search_text.split_whitespace().collect();
        let n = self.tokens.len();
        if doc.len() < n {
            return 0;
        }
        let Some((last, head)) = self.tokens.split_last() else {
            return 0;
        };
        doc.windows(n)
            .filter(|w| {
                w[..n - 1].iter().zip(head).all(|(d, q)| d == q)
                    && w[n - 1].starts_with(last.as_str())
            })
            .count() as u32
    }
}
