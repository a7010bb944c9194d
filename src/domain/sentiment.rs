//! Keyword news sentiment.
//!
//! A word list is matched against lower-cased text by substring containment,
//! so "upgrade" counts as "up". Each keyword counts at most once per text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const POSITIVE_WORDS: [&str; 10] = [
    "up", "rise", "gain", "positive", "bullish", "growth", "profit", "strong", "beat", "exceed",
];
const NEGATIVE_WORDS: [&str; 10] = [
    "down", "fall", "drop", "negative", "bearish", "loss", "decline", "weak", "miss", "below",
];
const SCORE_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => f.write_str("positive"),
            SentimentLabel::Neutral => f.write_str("neutral"),
            SentimentLabel::Negative => f.write_str("negative"),
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextSentiment {
    pub label: SentimentLabel,
    pub score: f64,
    pub positive_hits: usize,
    pub negative_hits: usize,
}

pub fn score_text(text: &str) -> TextSentiment {
    let lower = text.to_lowercase();
    let positive_hits = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative_hits = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    let label = match positive_hits.cmp(&negative_hits) {
        std::cmp::Ordering::Greater => SentimentLabel::Positive,
        std::cmp::Ordering::Less => SentimentLabel::Negative,
        std::cmp::Ordering::Equal => SentimentLabel::Neutral,
    };

    let word_count = text.split_whitespace().count();
    let score = if word_count == 0 {
        0.0
    } else {
        let raw = (positive_hits as f64 - negative_hits as f64) / word_count as f64;
        (raw * SCORE_SCALE).clamp(-1.0, 1.0)
    };

    TextSentiment {
        label,
        score,
        positive_hits,
        negative_hits,
    }
}

/// A news article as returned by the backend's news endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "publishedAt", alias = "published_at")]
    pub published_at: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_label")]
    pub sentiment_label: Option<SentimentLabel>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    /// Older backends send the label only under `sentiment`.
    #[serde(default, deserialize_with = "lenient_label", skip_serializing)]
    pub sentiment: Option<SentimentLabel>,
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<SentimentLabel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|s| s.parse().ok()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl NewsArticle {
    /// Fills a missing label or score from the title and description.
    pub fn ensure_scored(&mut self) {
        if self.sentiment_label.is_none() {
            self.sentiment_label = self.sentiment.take();
        }
        if self.sentiment_label.is_some() && self.sentiment_score.is_some() {
            return;
        }
        let scored = score_text(&format!("{} {}", self.title, self.description));
        self.sentiment_label.get_or_insert(scored.label);
        self.sentiment_score.get_or_insert(scored.score);
    }
}

/// Aggregate sentiment over a set of articles.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NewsSentiment {
    pub articles: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub mean_score: f64,
}

impl NewsSentiment {
    /// Articles without a label or score are scored locally first.
    pub fn aggregate(articles: &mut [NewsArticle]) -> Self {
        let mut out = NewsSentiment::default();
        let mut total = 0.0;
        for article in articles.iter_mut() {
            article.ensure_scored();
            match article.sentiment_label {
                Some(SentimentLabel::Positive) => out.positive += 1,
                Some(SentimentLabel::Negative) => out.negative += 1,
                _ => out.neutral += 1,
            }
            total += article.sentiment_score.unwrap_or(0.0);
        }
        out.articles = articles.len();
        if out.articles > 0 {
            out.mean_score = total / out.articles as f64;
        }
        out
    }

    pub fn overall(&self) -> SentimentLabel {
        match self.positive.cmp(&self.negative) {
            std::cmp::Ordering::Greater => SentimentLabel::Positive,
            std::cmp::Ordering::Less => SentimentLabel::Negative,
            std::cmp::Ordering::Equal => SentimentLabel::Neutral,
        }
    }
}
