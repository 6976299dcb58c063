//! Pluggable tokenization for the BM25 index.
//!
//! No CJK word-segmentation library is linked into this crate, so the default tokenizer
//! combines a whitespace/ASCII-punctuation splitter for Latin-script runs with a
//! character-bigram fallback over contiguous CJK runs — a standard substitute for
//! word segmentation when no segmenter is available. Its identity is recorded so an operator
//! can tell which tokenizer produced a given index.

/// A tokenizer turns query or document text into a sequence of lowercase tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// A stable identifier recorded alongside the BM25 index, so a tokenizer swap is
    /// detectable by operators inspecting index metadata.
    fn identity(&self) -> &'static str;
}

/// Default tokenizer: whitespace/punctuation splitting for Latin-script runs, character
/// bigrams for contiguous CJK runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTokenizer;

impl DefaultTokenizer {
    fn is_cjk(c: char) -> bool {
        matches!(c as u32,
            0x4E00..=0x9FFF   // CJK Unified Ideographs
            | 0x3400..=0x4DBF // CJK Extension A
            | 0x3040..=0x30FF // Hiragana + Katakana
            | 0xAC00..=0xD7A3 // Hangul syllables
        )
    }
}

impl Tokenizer for DefaultTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut latin_run = String::new();
        let mut cjk_run: Vec<char> = Vec::new();

        let flush_latin = |run: &mut String, tokens: &mut Vec<String>| {
            if !run.is_empty() {
                tokens.push(std::mem::take(run).to_lowercase());
            }
        };
        let flush_cjk = |run: &mut Vec<char>, tokens: &mut Vec<String>| {
            if run.len() == 1 {
                tokens.push(run[0].to_lowercase().to_string());
            } else {
                for window in run.windows(2) {
                    let bigram: String = window.iter().collect();
                    tokens.push(bigram.to_lowercase());
                }
            }
            run.clear();
        };

        for c in text.chars() {
            if Self::is_cjk(c) {
                flush_latin(&mut latin_run, &mut tokens);
                cjk_run.push(c);
            } else if c.is_alphanumeric() {
                flush_cjk(&mut cjk_run, &mut tokens);
                latin_run.push(c);
            } else {
                flush_latin(&mut latin_run, &mut tokens);
                flush_cjk(&mut cjk_run, &mut tokens);
            }
        }
        flush_latin(&mut latin_run, &mut tokens);
        flush_cjk(&mut cjk_run, &mut tokens);

        tokens
    }

    fn identity(&self) -> &'static str {
        "cjk-bigram+whitespace-v1"
    }
}

/// Counts whitespace-delimited tokens the way the adaptive-alpha heuristic does (§4.7), which
/// is deliberately distinct from [`DefaultTokenizer::tokenize`]: the adaptive heuristic is
/// specified in terms of ASCII whitespace splitting, not search-granularity tokenization.
pub fn whitespace_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}
