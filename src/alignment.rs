//! Zips phonetic tokens back onto the ideographs that produced them.
//!
//! The transcription provider only ever sees the ideograph subsequence of
//! the text, so alignment is purely positional: the n-th ideograph in the
//! text takes the n-th token. Iteration is over `char`s (code points) so a
//! character outside the BMP never shifts the count.

use crate::constants::{IDEOGRAPH_FIRST, IDEOGRAPH_LAST};
use pinyin::ToPinyin;
use serde::{Deserialize, Serialize};

pub fn is_ideograph(ch: char) -> bool {
    (IDEOGRAPH_FIRST..=IDEOGRAPH_LAST).contains(&ch)
}

pub fn contains_ideograph(text: &str) -> bool {
    text.chars().any(is_ideograph)
}

pub fn ideographs(text: &str) -> String {
    text.chars().filter(|&c| is_ideograph(c)).collect()
}

/// Phonetic transcription boundary: one token per input character, in
/// order. A shorter result is tolerated by the aligner.
pub trait PhoneticProvider: Send + Sync {
    fn transcribe(&self, ideographs: &str) -> Vec<String>;
}

/// Tone-marked pinyin, first reading only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinProvider;

impl PhoneticProvider for PinyinProvider {
    fn transcribe(&self, ideographs: &str) -> Vec<String> {
        ideographs
            .chars()
            .map(|ch| {
                ch.to_pinyin()
                    .map(|p| p.with_tone().to_string())
                    .unwrap_or_default()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedChar {
    pub ch: char,
    pub annotation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignmentResult(Vec<AnnotatedChar>);

impl AlignmentResult {
    /// Every character with an empty annotation.
    pub fn plain(text: &str) -> Self {
        Self(
            text.chars()
                .map(|ch| AnnotatedChar {
                    ch,
                    annotation: String::new(),
                })
                .collect(),
        )
    }

    pub fn segments(&self) -> &[AnnotatedChar] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `你(nǐ)好(hǎo)!` style rendering; unannotated characters stay bare.
    pub fn to_inline(&self) -> String {
        let mut out = String::new();
        for seg in &self.0 {
            out.push(seg.ch);
            if !seg.annotation.is_empty() {
                out.push('(');
                out.push_str(&seg.annotation);
                out.push(')');
            }
        }
        out
    }

    /// The source text reassembled from the segments.
    pub fn text(&self) -> String {
        self.0.iter().map(|seg| seg.ch).collect()
    }
}

pub fn annotate(text: &str, provider: &dyn PhoneticProvider) -> AlignmentResult {
    let subsequence = ideographs(text);
    if subsequence.is_empty() {
        return AlignmentResult::plain(text);
    }
    let tokens = provider.transcribe(&subsequence);
    align(text, &tokens)
}

pub(crate) fn align(text: &str, tokens: &[String]) -> AlignmentResult {
    let mut next = tokens.iter();
    AlignmentResult(
        text.chars()
            .map(|ch| {
                let annotation = if is_ideograph(ch) {
                    next.next().cloned().unwrap_or_default()
                } else {
                    String::new()
                };
                AnnotatedChar { ch, annotation }
            })
            .collect(),
    )
}
