use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Bias;

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

/// Thin client for the NewsAPI `everything` search.
pub struct NewsClient {
    client: Client,
    api_key: String,
    lookback_days: i64,
}

impl NewsClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: cfg.news_api_key.clone(),
            lookback_days: cfg.sentiment_lookback_days,
        }
    }

    /// "EURUSD" searches "EUR OR USD".
    pub fn query_for(pair: &str) -> String {
        let letters: String = pair.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if letters.len() >= 6 {
            format!("{} OR {}", &letters[..3], &letters[3..6])
        } else {
            letters
        }
    }

    pub async fn fetch_articles(&self, pair: &str) -> Result<Vec<Article>> {
        let from = (Utc::now() - Duration::days(self.lookback_days))
            .format("%Y-%m-%d")
            .to_string();
        let query = Self::query_for(pair);

        let resp: NewsResponse = self
            .client
            .get(NEWSAPI_URL)
            .query(&[
                ("q", query.as_str()),
                ("from", from.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("news request failed")?
            .error_for_status()
            .context("news request rejected")?
            .json()
            .await
            .context("failed to parse news response")?;

        debug!("[Sentiment] fetched {} articles for {}", resp.articles.len(), pair);
        Ok(resp.articles)
    }
}

/// Word-list polarity scorer. Scores are the mean polarity of matched
/// words, negated when preceded by a negator.
pub struct SentimentAnalyzer;

const POSITIVE: &[&str] = &[
    "gain", "gains", "rally", "rallies", "surge", "surges", "strong", "stronger", "rise", "rises",
    "rising", "bullish", "boost", "growth", "optimism", "optimistic", "recovery", "upbeat", "beat",
    "higher", "record", "positive", "good", "improve", "improves",
];

const NEGATIVE: &[&str] = &[
    "loss", "losses", "fall", "falls", "falling", "drop", "drops", "slump", "weak", "weaker",
    "bearish", "decline", "declines", "fear", "fears", "recession", "crisis", "plunge", "lower",
    "negative", "bad", "worse", "inflation", "cut", "risk",
];

const NEGATORS: &[&str] = &["not", "no", "never", "without"];

impl SentimentAnalyzer {
    pub fn score(text: &str) -> f64 {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        let mut total = 0.0;
        let mut hits = 0usize;
        for (i, word) in words.iter().enumerate() {
            let polarity = if POSITIVE.contains(&word.as_str()) {
                1.0
            } else if NEGATIVE.contains(&word.as_str()) {
                -1.0
            } else {
                continue;
            };
            let negated = i > 0 && NEGATORS.contains(&words[i - 1].as_str());
            total += if negated { -polarity } else { polarity };
            hits += 1;
        }
        if hits == 0 {
            0.0
        } else {
            (total / hits as f64).clamp(-1.0, 1.0)
        }
    }

    pub fn score_article(article: &Article) -> f64 {
        let title = article.title.as_deref().unwrap_or_default();
        let description = article.description.as_deref().unwrap_or_default();
        Self::score(&format!("{}. {}", title, description))
    }

    /// Mean over articles that carry a title; zero when there are none.
    pub fn overall(articles: &[Article]) -> f64 {
        let scores: Vec<f64> = articles
            .iter()
            .filter(|a| a.title.as_deref().is_some_and(|t| !t.is_empty()))
            .map(Self::score_article)
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

pub fn sentiment_bias(score: f64, bullish: f64, bearish: f64) -> Bias {
    if score >= bullish {
        Bias::Bullish
    } else if score <= bearish {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Fetches and scores news for `pair`. Any failure yields `None`.
pub async fn compute_sentiment(client: &NewsClient, pair: &str) -> Option<f64> {
    match client.fetch_articles(pair).await {
        Ok(articles) => {
            let score = SentimentAnalyzer::overall(&articles);
            debug!("[Sentiment] average polarity for {}: {:.2}", pair, score);
            Some(score)
        }
        Err(e) => {
            warn!("[Sentiment] failed to fetch news for {}: {:#}", pair, e);
            None
        }
    }
}
