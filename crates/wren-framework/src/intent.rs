//! Intent classification over learned phrases.
//!
//! Scripts teach the bot example phrases for a handler with `learn`. When a
//! text event arrives, the [`IntentGate`] asks a [`TextClassifier`] which
//! handler the text most likely targets and how confident it is; the
//! dispatcher then applies a threshold that depends on whether the bot was
//! addressed directly.
//!
//! The model is built lazily from the accumulated phrases and marked stale
//! on every later `learn`, so the next classification rebuilds it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::handler::HandlerRef;

// ============================================================================
// Classifier
// ============================================================================

/// A trainable text classifier over integer labels.
pub trait TextClassifier: Send + Sync + Sized + 'static {
    /// Trains a model from `(phrase, label)` samples.
    fn fit(samples: &[(String, usize)]) -> Self;

    /// Returns the most likely label and its probability, or `None` when
    /// the text carries no known evidence.
    fn classify(&self, text: &str) -> Option<(usize, f64)>;
}

/// Lower-cased word tokens; apostrophes stay inside words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Multinomial naive Bayes with Laplace smoothing.
///
/// Words never seen in training are ignored.
#[derive(Debug, Clone, Default)]
pub struct NaiveBayes {
    vocabulary: HashSet<String>,
    classes: Vec<ClassStats>,
    total_docs: usize,
}

#[derive(Debug, Clone, Default)]
struct ClassStats {
    label: usize,
    docs: usize,
    words: usize,
    counts: HashMap<String, usize>,
}

impl TextClassifier for NaiveBayes {
    fn fit(samples: &[(String, usize)]) -> Self {
        let mut model = Self::default();
        let mut by_label: HashMap<usize, usize> = HashMap::new();

        for (phrase, label) in samples {
            let index = *by_label.entry(*label).or_insert_with(|| {
                model.classes.push(ClassStats {
                    label: *label,
                    ..Default::default()
                });
                model.classes.len() - 1
            });
            let class = &mut model.classes[index];
            class.docs += 1;
            for token in tokenize(phrase) {
                class.words += 1;
                *class.counts.entry(token.clone()).or_default() += 1;
                model.vocabulary.insert(token);
            }
            model.total_docs += 1;
        }
        model
    }

    fn classify(&self, text: &str) -> Option<(usize, f64)> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| self.vocabulary.contains(t))
            .collect();
        if tokens.is_empty() || self.classes.is_empty() {
            return None;
        }

        let vocab = self.vocabulary.len() as f64;
        let scores: Vec<(usize, f64)> = self
            .classes
            .iter()
            .map(|class| {
                let prior = (class.docs as f64 / self.total_docs as f64).ln();
                let denominator = class.words as f64 + vocab;
                let likelihood: f64 = tokens
                    .iter()
                    .map(|t| {
                        let count = class.counts.get(t).copied().unwrap_or(0) as f64;
                        ((count + 1.0) / denominator).ln()
                    })
                    .sum();
                (class.label, prior + likelihood)
            })
            .collect();

        let max = scores.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
        let norm: f64 = scores.iter().map(|(_, s)| (s - max).exp()).sum();
        scores
            .into_iter()
            .map(|(label, s)| (label, (s - max).exp() / norm))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Confidence thresholds for acting on a classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Required when the bot was addressed directly.
    pub direct: f64,
    /// Required for overheard channel traffic.
    pub ambient: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            direct: 0.65,
            ambient: 0.95,
        }
    }
}

impl Thresholds {
    pub fn accepts(&self, probability: f64, is_direct: bool) -> bool {
        let threshold = if is_direct { self.direct } else { self.ambient };
        probability > threshold
    }
}

struct Learned {
    samples: Vec<(String, usize)>,
    handlers: Vec<HandlerRef>,
}

/// Learned phrases plus the lazily built model.
pub struct IntentGate<C: TextClassifier = NaiveBayes> {
    learned: RwLock<Learned>,
    model: Mutex<Option<Arc<C>>>,
}

impl<C: TextClassifier> Default for IntentGate<C> {
    fn default() -> Self {
        Self {
            learned: RwLock::new(Learned {
                samples: Vec::new(),
                handlers: Vec::new(),
            }),
            model: Mutex::new(None),
        }
    }
}

impl<C: TextClassifier> IntentGate<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds example phrases for `handler` and marks the model stale.
    pub fn learn<S: AsRef<str>>(&self, phrases: &[S], handler: &HandlerRef) {
        {
            let mut learned = self.learned.write();
            let label = match learned.handlers.iter().position(|h| h == handler) {
                Some(label) => label,
                None => {
                    learned.handlers.push(handler.clone());
                    learned.handlers.len() - 1
                }
            };
            for phrase in phrases {
                learned.samples.push((phrase.as_ref().to_owned(), label));
            }
        }
        *self.model.lock() = None;
        info!(
            handler = handler.name(),
            phrases = phrases.len(),
            "Learned phrases"
        );
    }

    /// Whether any phrase has been learned.
    pub fn has_training_data(&self) -> bool {
        !self.learned.read().samples.is_empty()
    }

    /// Classifies `text`, building the model if needed.
    pub fn classify(&self, text: &str) -> Option<(HandlerRef, f64)> {
        if !self.has_training_data() {
            return None;
        }
        let model = self.model();
        let (label, probability) = model.classify(text)?;
        let handler = self.learned.read().handlers.get(label).cloned()?;
        debug!(handler = handler.name(), probability, "Classified text");
        Some((handler, probability))
    }

    fn model(&self) -> Arc<C> {
        let mut slot = self.model.lock();
        if let Some(model) = slot.as_ref() {
            return Arc::clone(model);
        }
        let learned = self.learned.read();
        debug!(samples = learned.samples.len(), "Building intent classifier");
        let model = Arc::new(C::fit(&learned.samples));
        *slot = Some(Arc::clone(&model));
        model
    }
}
