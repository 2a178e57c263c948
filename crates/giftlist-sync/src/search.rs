use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use giftlist_types::models::{Id, PresentDetails, Recipient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    Recipient { id: Id, name: String },
    Present { id: Id, title: String, recipient_name: String },
}

impl SearchHit {
    pub fn label(&self) -> &str {
        match self {
            SearchHit::Recipient { name, .. } => name,
            SearchHit::Present { title, .. } => title,
        }
    }
}

struct Entry {
    hit: SearchHit,
    /// Normalized name or title.
    label: String,
    /// Normalized text of every searchable field, label included.
    text: String,
}

/// Search over recipients and presents, ignoring case and diacritics. Every query word has to appear somewhere in the entry.
pub struct Searcher {
    entries: Vec<Entry>,
}

impl Searcher {
    pub fn new(recipients: &[Recipient], presents: &[PresentDetails]) -> Self {
        let mut entries = Vec::with_capacity(recipients.len() + presents.len());

        for r in recipients {
            let label = normalize(&r.name);
            entries.push(Entry {
                hit: SearchHit::Recipient {
                    id: r.id,
                    name: r.name.clone(),
                },
                text: label.clone(),
                label,
            });
        }

        for p in presents {
            let label = normalize(&p.present.title);
            let mut text = format!("{} {}", label, normalize(&p.recipient_name));
            if let Some(comments) = &p.present.comments {
                text.push(' ');
                text.push_str(&normalize(comments));
            }
            entries.push(Entry {
                hit: SearchHit::Present {
                    id: p.present.id,
                    title: p.present.title.clone(),
                    recipient_name: p.recipient_name.clone(),
                },
                label,
                text,
            });
        }

        Self { entries }
    }

    /// Matches ranked: label starts with the query, then a label word starts
    /// with a query word, then the rest. Ties keep recipients first and sort
    /// by label. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = normalize(query);
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let phrase = tokens.join(" ");

        let mut matches: Vec<(u8, &Entry)> = self
            .entries
            .iter()
            .filter(|e| tokens.iter().all(|t| e.text.contains(t)))
            .map(|e| (rank(e, &phrase, &tokens), e))
            .collect();

        matches.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then_with(|| kind_order(&a.hit).cmp(&kind_order(&b.hit)))
                .then_with(|| a.label.cmp(&b.label))
        });

        matches.into_iter().map(|(_, e)| e.hit.clone()).collect()
    }
}

fn rank(entry: &Entry, phrase: &str, tokens: &[&str]) -> u8 {
    if entry.label.starts_with(phrase) {
        0
    } else if entry
        .label
        .split_whitespace()
        .any(|word| tokens.iter().any(|t| word.starts_with(t)))
    {
        1
    } else {
        2
    }
}

fn kind_order(hit: &SearchHit) -> u8 {
    match hit {
        SearchHit::Recipient { .. } => 0,
        SearchHit::Present { .. } => 1,
    }
}

/// Lowercase and strip diacritics. `ł` has no decomposition, so it is
/// folded by hand.
pub fn normalize(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ł' { 'l' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use giftlist_types::models::Present;

    use super::*;

    fn recipient(id: Id, name: &str) -> Recipient {
        Recipient {
            id,
            name: name.into(),
            identified_by: None,
            identified_by_username: None,
            has_picture: false,
            picture_url: None,
            present_count: 0,
            checked_count: 0,
            reserved_count: 0,
            is_me: false,
            created_at: String::new(),
        }
    }

    fn present(id: Id, title: &str, recipient_name: &str, comments: Option<&str>) -> PresentDetails {
        PresentDetails {
            present: Present {
                id,
                title: title.into(),
                comments: comments.map(str::to_string),
                recipient_id: 1,
                is_checked: false,
                reserved_by: None,
                created_by: None,
                created_at: String::new(),
            },
            recipient_name: recipient_name.into(),
            reserved_by_username: None,
            created_by_username: None,
        }
    }

    fn searcher() -> Searcher {
        Searcher::new(
            &[recipient(1, "Łukasz"), recipient(2, "Anna"), recipient(3, "Zosia")],
            &[
                present(10, "Książka kucharska", "Anna", None),
                present(11, "Klocki", "Zosia", Some("duże, kolorowe")),
                present(12, "Kubek na książki", "Łukasz", None),
            ],
        )
    }

    fn labels(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(SearchHit::label).collect()
    }

    #[test]
    fn ignores_case_and_diacritics() {
        let s = searcher();
        assert_eq!(labels(&s.search("lukasz")), vec!["Łukasz", "Kubek na książki"]);
        assert_eq!(labels(&s.search("KSIAZKA")), vec!["Książka kucharska"]);
    }

    #[test]
    fn all_words_must_match() {
        let s = searcher();
        assert_eq!(labels(&s.search("klocki zosia")), vec!["Klocki"]);
        assert_eq!(labels(&s.search("kolorowe")), vec!["Klocki"]);
        assert!(s.search("klocki anna").is_empty());
    }

    #[test]
    fn prefix_matches_rank_first() {
        let s = searcher();
        // "ksiazk" is a prefix of one title and a word inside another.
        assert_eq!(
            labels(&s.search("ksiazk")),
            vec!["Książka kucharska", "Kubek na książki"]
        );
        assert_eq!(labels(&s.search("k")).first(), Some(&"Klocki"));
    }

    #[test]
    fn blank_query_matches_nothing() {
        assert!(searcher().search("   ").is_empty());
    }

    #[test]
    fn normalize_strips_polish_marks() {
        assert_eq!(normalize("ZAŻÓŁĆ gęślą jaźń"), "zazolc gesla jazn");
    }

    #[test]
    fn normalize_handles_decomposed_and_foreign_accents() {
        assert_eq!(normalize("a\u{328}"), "a");
        assert_eq!(normalize("Crème brûlée"), "creme brulee");
        assert_eq!(normalize("Müller"), "muller");
    }

    #[test]
    fn decomposed_names_are_found() {
        let s = Searcher::new(&[recipient(1, "Re\u{301}my"), recipient(2, "Jürgen")], &[]);
        assert_eq!(labels(&s.search("remy")), vec!["Re\u{301}my"]);
        assert_eq!(labels(&s.search("RÉMY")), vec!["Re\u{301}my"]);
        assert_eq!(labels(&s.search("jurgen")), vec!["Jürgen"]);
    }
}
