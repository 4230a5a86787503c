pub mod remote;

pub use remote::{RemoteAnnotator, annotator_for};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum NlpError {
    #[error("annotator request failed: {0}")]
    Request(String),
    #[error("annotator returned an invalid document: {0}")]
    InvalidDocument(String),
}

/// One token of an annotated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnToken {
    pub text: String,
    /// Trailing whitespace between this token and the next (usually `" "` or
    /// empty), needed to reconstruct the exact source text from slices.
    #[serde(default)]
    pub whitespace: String,
    /// Universal POS tag (e.g. "VERB", "AUX", "PRON", "NOUN").
    pub pos: String,
    /// Dependency label (e.g. "nsubj", "ROOT", "det").
    pub dep: String,
    /// Index of the syntactic head token.
    pub head: usize,
    /// POS tag of the head token.
    #[serde(default)]
    pub head_pos: String,
    #[serde(default)]
    pub is_punct: bool,
    #[serde(default)]
    pub is_sent_end: bool,
}

/// A linguistically annotated text, produced by the external annotator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotatedDoc {
    pub language: String,
    pub tokens: Vec<AnnToken>,
    /// Sentence boundaries as half-open token ranges `[start, end)`.
    pub sents: Vec<(usize, usize)>,
}

impl AnnotatedDoc {
    /// Reconstructs the text of the half-open token range `[start, end)`,
    /// including intra-range whitespace but not the final token's trailing
    /// whitespace.
    pub fn slice_text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        if start >= end {
            return String::new();
        }
        let mut out = String::new();
        for (i, token) in self.tokens[start..end].iter().enumerate() {
            out.push_str(&token.text);
            if start + i + 1 < end {
                out.push_str(&token.whitespace);
            }
        }
        out
    }

    pub fn text(&self) -> String {
        self.slice_text(0, self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Sentence texts, trimmed, empties dropped.
    pub fn sentence_texts(&self) -> Vec<String> {
        self.sents
            .iter()
            .map(|&(start, end)| self.slice_text(start, end).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// External linguistic analyzer seam (POS, dependencies, sentence
/// boundaries).
#[async_trait::async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDoc, NlpError>;

    /// Language the annotator was loaded for.
    fn language(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Builds annotated docs by hand for splitter tests. Whitespace is
    /// attached automatically: every token except sentence-internal
    /// punctuation is preceded by a space.
    pub struct DocBuilder {
        doc: AnnotatedDoc,
    }

    impl DocBuilder {
        pub fn new(language: &str) -> Self {
            Self {
                doc: AnnotatedDoc {
                    language: language.to_string(),
                    tokens: Vec::new(),
                    sents: Vec::new(),
                },
            }
        }

        pub fn token(mut self, text: &str, pos: &str, dep: &str) -> Self {
            self.push(text, pos, dep, 0);
            self
        }

        pub fn token_with_head(mut self, text: &str, pos: &str, dep: &str, head: usize) -> Self {
            self.push(text, pos, dep, head);
            self
        }

        fn push(&mut self, text: &str, pos: &str, dep: &str, head: usize) {
            let is_punct = pos == "PUNCT";
            // Punctuation attaches to the previous token.
            if is_punct && let Some(prev) = self.doc.tokens.last_mut() {
                prev.whitespace = String::new();
            }
            self.doc.tokens.push(AnnToken {
                text: text.to_string(),
                whitespace: " ".to_string(),
                pos: pos.to_string(),
                dep: dep.to_string(),
                head,
                head_pos: String::new(),
                is_punct,
                is_sent_end: false,
            });
        }

        pub fn sent(mut self, start: usize, end: usize) -> Self {
            if end > start {
                self.doc.tokens[end - 1].is_sent_end = true;
            }
            self.doc.sents.push((start, end));
            self
        }

        pub fn build(mut self) -> AnnotatedDoc {
            if self.doc.sents.is_empty() {
                let n = self.doc.tokens.len();
                if n > 0 {
                    self.doc.tokens[n - 1].is_sent_end = true;
                    self.doc.sents.push((0, n));
                }
            }
            // Fill head POS tags from the head indices.
            let tags: Vec<String> = self.doc.tokens.iter().map(|t| t.pos.clone()).collect();
            for token in &mut self.doc.tokens {
                token.head_pos = tags.get(token.head).cloned().unwrap_or_default();
            }
            if let Some(last) = self.doc.tokens.last_mut() {
                last.whitespace = String::new();
            }
            self.doc
        }
    }

    /// Deterministic rule-based annotator for splitter and refine-driver
    /// tests: whitespace tokenization, a small POS lexicon, one sentence per
    /// text.
    pub struct RuleAnnotator {
        language: String,
    }

    impl RuleAnnotator {
        pub fn german() -> Self {
            Self {
                language: "de".to_string(),
            }
        }

        fn tag(word: &str) -> (&'static str, &'static str) {
            match word.trim_end_matches(['.', ',', '!', '?']) {
                "und" | "oder" | "aber" => ("CCONJ", "cd"),
                "weil" | "dass" => ("SCONJ", "mark"),
                "lief" | "schlief" | "ging" | "kam" | "las" => ("VERB", "ROOT"),
                "er" | "sie" | "es" | "ich" => ("PRON", "nsubj"),
                _ => ("NOUN", "nk"),
            }
        }
    }

    #[async_trait::async_trait]
    impl Annotator for RuleAnnotator {
        async fn annotate(&self, text: &str) -> Result<AnnotatedDoc, NlpError> {
            let mut builder = DocBuilder::new(&self.language);
            for word in text.split_whitespace() {
                if word.chars().all(|c| !c.is_alphanumeric()) {
                    builder = builder.token(word, "PUNCT", "punct");
                } else {
                    let (pos, dep) = Self::tag(word);
                    builder = builder.token(word, pos, dep);
                }
            }
            Ok(builder.build())
        }

        fn language(&self) -> &str {
            &self.language
        }
    }

    #[test]
    fn slice_text_reconstructs_with_whitespace() {
        let doc = DocBuilder::new("de")
            .token("Hallo", "INTJ", "ROOT")
            .token(",", "PUNCT", "punct")
            .token("Welt", "NOUN", "appos")
            .token(".", "PUNCT", "punct")
            .build();
        assert_eq!(doc.text(), "Hallo, Welt.");
        assert_eq!(doc.slice_text(0, 2), "Hallo,");
        assert_eq!(doc.slice_text(2, 4), "Welt.");
    }

    #[test]
    fn sentence_texts_follow_declared_ranges() {
        let doc = DocBuilder::new("de")
            .token("Es", "PRON", "nsubj")
            .token("regnet", "VERB", "ROOT")
            .token(".", "PUNCT", "punct")
            .token("Wir", "PRON", "nsubj")
            .token("bleiben", "VERB", "ROOT")
            .token(".", "PUNCT", "punct")
            .sent(0, 3)
            .sent(3, 6)
            .build();
        assert_eq!(
            doc.sentence_texts(),
            vec!["Es regnet.".to_string(), "Wir bleiben.".to_string()]
        );
        assert!(doc.tokens[2].is_sent_end);
        assert!(doc.tokens[5].is_sent_end);
    }
}
