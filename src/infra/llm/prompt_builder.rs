use crate::domain::GenerationRequest;

const GENERATION_SYSTEM_PROMPT: &str = "You are a senior Suno v5 producer and lyricist. \
Return ONLY valid JSON with keys: title, style, lyrics, explanation. \
All values must be non-empty strings. \
The style string must be tag-based and <= 200 characters. \
Use top-loaded style ordering: [Mood], [Energy], [2 core instruments], [Vocal identity], [Genre], then fidelity tokens. \
Always include fidelity tokens: 44.1kHz, Wide Stereo, Clean Mix. \
If instrumental is true, do not create sung lyrics. Return [Instrumental] and optional arrangement tags. \
If non-English language requested, include explicit language tag in lyrics headers when helpful.";

const EXTEND_SYSTEM_PROMPT: &str = "You extend Suno-ready lyrics. Return plain text only, no markdown fences. \
Return only NEW lines with section tags. Do not repeat existing lines.";

const SECTION_TAG_GUIDANCE: &str = "Write natural, concise sections with Suno metatags like [Intro], [Verse], [Chorus], [Bridge], [Outro].";

const STRICT_JSON_REMINDER: &str = "IMPORTANT: your previous answer was not usable. \
Respond with exactly one strict JSON object with string keys title, style, lyrics, explanation. \
No markdown fences, no commentary, no trailing text.";

const STRUCTURE_PLANS: &[(&str, &str)] = &[
    ("Auto", "Choose a structure that best fits the topic and genre."),
    (
        "Standard",
        "Use: [Intro] -> [Verse] -> [Chorus] -> [Verse 2] -> [Bridge] -> [Chorus] -> [Outro].",
    ),
    (
        "Pop",
        "Use: [Intro] -> [Verse] -> [Pre-Chorus] -> [Chorus] -> [Verse 2] -> [Bridge] -> [Chorus] -> [Outro].",
    ),
    (
        "Rap",
        "Use: [Intro] -> [Hook] -> [Verse] -> [Hook] -> [Verse 2] -> [Outro].",
    ),
    (
        "Ambient",
        "Use a smooth linear flow with sparse sections and mostly atmospheric progression.",
    ),
    (
        "Custom",
        "Create a structure that best matches the concept while keeping section labels explicit.",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
}

impl BuiltPrompt {
    /// Same prompt with the strict-JSON reminder appended, used for the single
    /// malformed-output retry.
    pub fn with_strict_json_reminder(&self) -> Self {
        Self {
            system: self.system.clone(),
            user: format!("{}\n\n{STRICT_JSON_REMINDER}", self.user),
        }
    }
}

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_generation(request: &GenerationRequest) -> BuiltPrompt {
        let weirdness = match request.weirdness {
            Some(value) => format!("Weirdness: {value}."),
            None => "Weirdness: choose automatically based on genre.".to_string(),
        };
        let style_influence = match request.style_influence {
            Some(value) => format!("Style influence: {value}."),
            None => "Style influence: choose automatically based on genre and topic.".to_string(),
        };
        let structure = request.structure.as_str();

        let user = format!(
            "Topic: {topic}
Genre base: {genre}
Mood: {mood}
Voice: {voice}
Tempo: {tempo}
Structure: {structure}
Language: {language}
Instrumental: {instrumental}
{weirdness}
{style_influence}
Structure plan: {plan}
{SECTION_TAG_GUIDANCE}",
            topic = request.topic,
            genre = or_any(&request.genre),
            mood = or_any(&request.mood),
            voice = request.voice,
            tempo = or_any(&request.tempo),
            language = request.language,
            instrumental = request.is_instrumental,
            plan = structure_plan(structure),
        );

        BuiltPrompt {
            system: GENERATION_SYSTEM_PROMPT.to_string(),
            user,
        }
    }

    pub fn build_extend(
        current_lyrics: &str,
        topic: &str,
        style: &str,
        language: &str,
    ) -> BuiltPrompt {
        let user = format!(
            "Extend these lyrics with one additional coherent section.

Topic: {topic}
Style: {style}
Language: {language}

Current lyrics:
{current_lyrics}",
            style = or_any(style),
        );

        BuiltPrompt {
            system: EXTEND_SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Looks up the plan text for a structure name, falling back to the `Auto` plan.
pub fn structure_plan(structure: &str) -> &'static str {
    STRUCTURE_PLANS
        .iter()
        .find(|(name, _)| *name == structure)
        .or_else(|| STRUCTURE_PLANS.first())
        .map_or("", |(_, plan)| *plan)
}

fn or_any(value: &str) -> &str {
    if value.is_empty() { "Any" } else { value }
}
