//! Normalizes free-form style text into a compact, top-loaded tag string.
//!
//! Output ordering is `[mood, energy, instrument, instrument, vocal, genre]`,
//! followed by any remaining input tags and the fixed fidelity tokens, bounded to
//! [`MAX_STYLE_CHARS`] characters.

use std::collections::HashSet;

use super::GenerationRequest;

pub const MAX_STYLE_CHARS: usize = 200;
pub const FIDELITY_TOKENS: [&str; 3] = ["44.1kHz", "Wide Stereo", "Clean Mix"];

const INSTRUMENT_HINTS: &[&str] = &[
    "guitar", "piano", "drums", "bass", "synth", "violin", "cello", "sax", "trumpet", "flute",
    "808", "organ", "harp",
];

const GENRE_INSTRUMENT_FALLBACK: &[(&str, [&str; 2])] = &[
    ("synthwave", ["Analog Synth", "Gated Drums"]),
    ("pop", ["Bright Synth", "Punchy Drums"]),
    ("rock", ["Electric Guitar", "Live Drums"]),
    ("rap", ["808 Bass", "Trap Hats"]),
    ("ambient", ["Atmospheric Pads", "Soft Piano"]),
    ("jazz", ["Upright Bass", "Brush Drums"]),
];

const DEFAULT_INSTRUMENTS: [&str; 2] = ["Core Drums", "Core Bass"];
const LOW_ENERGY_MOODS: &[&str] = &["calm", "sad", "melancholic", "dreamy"];
const LEADING_MINIMAL_LEN: usize = 5;

/// Request fields that steer sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleContext<'a> {
    pub genre: &'a str,
    pub mood: &'a str,
    pub voice: &'a str,
    pub tempo: &'a str,
    pub is_instrumental: bool,
}

impl<'a> StyleContext<'a> {
    pub fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            genre: &request.genre,
            mood: &request.mood,
            voice: &request.voice,
            tempo: &request.tempo,
            is_instrumental: request.is_instrumental,
        }
    }
}

pub fn sanitize_style(raw_style: &str, context: &StyleContext<'_>) -> String {
    let raw_tokens = split_tokens(raw_style);

    let instruments = dedupe(
        extract_instruments(&raw_tokens)
            .into_iter()
            .chain(fallback_instruments(context.genre)),
    )
    .into_iter()
    .take(2)
    .collect::<Vec<_>>();

    let mood = first_non_empty(&[context.mood, raw_tokens.first().map_or("", |t| t.as_str())])
        .unwrap_or("Cinematic");
    let energy = infer_energy(context.tempo, context.mood);
    let vocal = if context.is_instrumental {
        "Instrumental Arrangement"
    } else {
        first_non_empty(&[context.voice]).unwrap_or("Expressive Vocals")
    };
    let genre = first_non_empty(&[context.genre]).unwrap_or("Genre Fusion");

    let mut leading = vec![mood.to_string(), energy.to_string()];
    leading.extend(instruments);
    leading.push(vocal.to_string());
    leading.push(genre.to_string());

    let reserved = leading
        .iter()
        .map(String::as_str)
        .chain(FIDELITY_TOKENS)
        .map(str::to_lowercase)
        .collect::<HashSet<_>>();
    let mut remaining = raw_tokens
        .iter()
        .filter(|token| !reserved.contains(&token.to_lowercase()))
        .cloned()
        .collect::<Vec<_>>();

    let mut style = join_tags(&leading, &remaining);
    while char_len(&style) > MAX_STYLE_CHARS && !remaining.is_empty() {
        remaining.pop();
        style = join_tags(&leading, &remaining);
    }

    if char_len(&style) > MAX_STYLE_CHARS {
        let minimal = &leading[..leading.len().min(LEADING_MINIMAL_LEN)];
        style = join_tags(minimal, &[]);
    }

    // A hard cut can still sever a fidelity token when the leading tags alone are
    // oversized; that regime is accepted as-is.
    style
        .chars()
        .take(MAX_STYLE_CHARS)
        .collect::<String>()
        .trim_end_matches([',', ' '])
        .to_string()
}

fn join_tags(leading: &[String], remaining: &[String]) -> String {
    dedupe(
        leading
            .iter()
            .chain(remaining)
            .map(String::as_str)
            .chain(FIDELITY_TOKENS)
            .map(str::to_string),
    )
    .join(", ")
}

fn split_tokens(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_instruments(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|token| {
            let lowered = token.to_lowercase();
            INSTRUMENT_HINTS.iter().any(|hint| lowered.contains(hint))
        })
        .cloned()
        .collect()
}

fn fallback_instruments(genre: &str) -> Vec<String> {
    let genre = genre.trim().to_lowercase();
    GENRE_INSTRUMENT_FALLBACK
        .iter()
        .find(|(key, _)| genre.contains(key))
        .map_or(DEFAULT_INSTRUMENTS, |(_, instruments)| *instruments)
        .iter()
        .map(|instrument| (*instrument).to_string())
        .collect()
}

fn infer_energy(tempo: &str, mood: &str) -> &'static str {
    let tempo = tempo.to_lowercase();
    let tempo_has = |needles: &[&str]| needles.iter().any(|needle| tempo.contains(needle));

    if tempo_has(&["slow", "70", "80"]) {
        return "Low Energy";
    }
    if tempo_has(&["fast", "140", "160"]) {
        return "High Energy";
    }
    if tempo_has(&["120", "driving"]) {
        return "Driving Energy";
    }
    if LOW_ENERGY_MOODS.contains(&mood.to_lowercase().as_str()) {
        return "Low Energy";
    }
    "Balanced Energy"
}

fn first_non_empty<'a>(values: &[&'a str]) -> Option<&'a str> {
    values
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Case-insensitive dedupe keeping the first spelling seen; blank tokens are dropped.
fn dedupe<I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for token in tokens {
        let normalized = token.trim();
        if normalized.is_empty() || !seen.insert(normalized.to_lowercase()) {
            continue;
        }
        ordered.push(normalized.to_string());
    }
    ordered
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
