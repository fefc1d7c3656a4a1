//! Race text selection.
//!
//! Every racer gets its own paragraph. The coordinator asks a
//! [`TextProvider`] for one while handling a join, passing the texts
//! already handed out in that lobby so two racers rarely share one.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Returned when a provider has nothing at all to offer.
pub const FALLBACK_TEXT: &str =
    "The quick brown fox jumps over the lazy dog while the race clock keeps on ticking.";

/// Longest sample [`SamplePool::default`] cuts from its corpus.
pub const DEFAULT_SAMPLE_LEN: usize = 250;

/// Chunks this short or shorter are dropped by [`split_into_samples`].
const MIN_SAMPLE_CHARS: usize = 50;

/// Built-in corpus for the default pool.
const DEFAULT_CORPUS: &str = "\
Every morning the harbor wakes up before the town does. Fishing boats slide out past the breakwater \
while the gulls argue over whatever the night tide left on the rocks. By the time the bakery opens, \
the first crates of the day are already stacked on the pier and the auction bell has rung twice. \
Learning to type quickly is mostly a matter of trusting your hands. Beginners look down at the keys \
and lose their place in the text, while practiced typists keep their eyes on the words ahead and let \
muscle memory handle the rest. Accuracy comes first, because speed built on mistakes does not last. \
The old observatory on the hill has not pointed its telescope at the sky in decades. Students still \
climb the spiral staircase on clear nights, though, and sit on the cold stone floor of the dome to \
watch the stars wheel slowly overhead through the open shutter. \
A good map tells you where the roads go, but a great map tells you where people actually walk. The \
shortcuts worn into the grass between two buildings say more about a campus than any planner's \
drawing, and the best architects learn to pave the paths that already exist. \
Rain had been falling on the valley for three days when the river finally crested. The farmers moved \
their animals to the high pasture and waited, listening to the water rush under the wooden bridge, \
hoping the old stone pillars would hold for one more season. \
The recipe called for patience more than skill. Onions had to soften slowly over low heat until they \
turned the color of honey, and no amount of stirring or turning up the flame would make them get \
there any faster than they wanted to.";

/// A source of race texts.
///
/// Implementations must not block; they are called from inside the
/// coordinator while it handles a join.
pub trait TextProvider: Send + 'static {
    /// Returns a sample, preferring one not in `excluding`. When every
    /// sample is excluded, reuse is allowed.
    fn next_sample(&mut self, excluding: &HashSet<String>) -> String;
}

/// A fixed set of samples picked at random.
pub struct SamplePool {
    samples: Vec<String>,
    rng: StdRng,
}

impl SamplePool {
    /// Creates a pool over `samples`, seeded from the OS.
    pub fn new(samples: Vec<String>) -> Self {
        Self {
            samples,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a pool with a fixed seed, for reproducible picks.
    pub fn with_seed(samples: Vec<String>, seed: u64) -> Self {
        Self {
            samples,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Cuts `raw` into samples of at most `max_len` characters.
    pub fn from_corpus(raw: &str, max_len: usize) -> Self {
        Self::new(split_into_samples(raw, max_len))
    }

    /// Returns the samples in the pool.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SamplePool {
    fn default() -> Self {
        Self::from_corpus(DEFAULT_CORPUS, DEFAULT_SAMPLE_LEN)
    }
}

impl TextProvider for SamplePool {
    fn next_sample(&mut self, excluding: &HashSet<String>) -> String {
        let unused: Vec<&String> = self
            .samples
            .iter()
            .filter(|s| !excluding.contains(s.as_str()))
            .collect();

        let picked = match unused.choose(&mut self.rng) {
            Some(sample) => Some(*sample),
            None => self.samples.choose(&mut self.rng),
        };

        match picked {
            Some(sample) => sample.clone(),
            None => {
                tracing::warn!("sample pool is empty, using fallback text");
                FALLBACK_TEXT.to_string()
            }
        }
    }
}

/// Splits a corpus into race-sized samples.
///
/// Words are packed into chunks of at most `max_len` characters (a single
/// longer word becomes its own chunk). Each chunk is trimmed, gets a
/// trailing `.` if it does not already end in one, and is kept only if
/// it is longer than 50 characters.
pub fn split_into_samples(raw: &str, max_len: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in raw.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if current_len > 0 {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|chunk| {
            let mut sample = chunk.trim().to_string();
            if !sample.ends_with('.') {
                sample.push('.');
            }
            sample
        })
        .filter(|sample| sample.chars().count() > MIN_SAMPLE_CHARS)
        .collect()
}
