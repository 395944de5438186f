//! Age-band adaptation of explanations
//!
//! Three learner tiers parametrize vocabulary, example domain and depth.
//! Common concepts come from a curated library of pre-written explanations;
//! everything else goes through a tier-specific rewrite instruction against
//! the generative backend, falling back to the original content verbatim.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ai_client::{self, AiClient};

/// Learner tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Kid,     // Age 8-12: simple explanations with examples and stories
    Teen,    // Age 13-17: moderate difficulty
    College, // Age 18+: technical depth
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Kid => "kid",
            DifficultyLevel::Teen => "teen",
            DifficultyLevel::College => "college",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "kid" => Some(DifficultyLevel::Kid),
            "teen" => Some(DifficultyLevel::Teen),
            "college" => Some(DifficultyLevel::College),
            _ => None,
        }
    }

    pub fn age_range(&self) -> &'static str {
        match self {
            DifficultyLevel::Kid => "8-12 years",
            DifficultyLevel::Teen => "13-17 years",
            DifficultyLevel::College => "18+ years",
        }
    }

    /// Fixed reading level per tier, independent of actual content
    pub fn reading_level(&self) -> &'static str {
        match self {
            DifficultyLevel::Kid => "Grade 3-5 (Elementary)",
            DifficultyLevel::Teen => "Grade 8-10 (High School)",
            DifficultyLevel::College => "Grade 13+ (College/University)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveResponse {
    pub original_query: String,
    pub difficulty_level: DifficultyLevel,
    pub adapted_response: String,
    pub key_concepts: Vec<String>,
    pub examples_used: Vec<String>,
    pub reading_level: String,
}

/// Rewrite instruction parameters for one tier
struct AdaptationTemplate {
    style: &'static str,
    vocabulary: &'static str,
    examples: &'static str,
    length: &'static str,
    tone: &'static str,
    prompt_suffix: &'static str,
}

fn template_for(level: DifficultyLevel) -> AdaptationTemplate {
    match level {
        DifficultyLevel::Kid => AdaptationTemplate {
            style: "Simple, fun, with stories and analogies",
            vocabulary: "Use everyday words, avoid jargon",
            examples: "Real-world examples kids can relate to",
            length: "Keep explanations short and engaging",
            tone: "Friendly, encouraging, like talking to a curious child",
            prompt_suffix: "Explain this like you're talking to a smart 10-year-old. Use:\n\
                            - Simple words they know\n\
                            - Fun comparisons (like comparing atoms to LEGO blocks)\n\
                            - Short sentences\n\
                            - Exciting examples from their world\n\
                            - Encouraging tone",
        },
        DifficultyLevel::Teen => AdaptationTemplate {
            style: "Clear, relatable, with practical applications",
            vocabulary: "Mix of everyday and academic terms with explanations",
            examples: "Technology, sports, social media analogies",
            length: "Moderate detail with good structure",
            tone: "Respectful, engaging, like a cool teacher",
            prompt_suffix: "Explain this for a teenager (13-17 years old). Use:\n\
                            - Clear, straightforward language\n\
                            - Examples from technology, games, or daily life\n\
                            - Explain why it matters to them\n\
                            - Good structure with main points\n\
                            - Respectful but engaging tone",
        },
        DifficultyLevel::College => AdaptationTemplate {
            style: "Technical, comprehensive, with depth",
            vocabulary: "Academic and scientific terminology",
            examples: "Research studies, real applications, case studies",
            length: "Detailed explanations with nuance",
            tone: "Professional, scholarly, intellectually stimulating",
            prompt_suffix: "Provide a college-level explanation. Include:\n\
                            - Proper scientific/academic terminology\n\
                            - Detailed mechanisms and processes\n\
                            - Current research and applications\n\
                            - Multiple perspectives or theories\n\
                            - Critical thinking prompts",
        },
    }
}

/// Pre-written tiered explanation for a commonly asked concept
fn concept_library(topic: &str, level: DifficultyLevel) -> Option<&'static str> {
    use DifficultyLevel::*;
    match (topic.to_lowercase().as_str(), level) {
        ("atom", Kid) => Some(
            "Atoms are like tiny LEGO blocks that make up everything around you - your toys, your food, even you! Just like you can build different things with different LEGO pieces, atoms stick together to make different stuff.",
        ),
        ("atom", Teen) => Some(
            "Atoms are the smallest units of matter that still keep the properties of an element. Think of them like the basic building blocks of everything - similar to how all your apps are made of basic code, everything physical is made of atoms.",
        ),
        ("atom", College) => Some(
            "Atoms are the fundamental units of matter consisting of a nucleus containing protons and neutrons, surrounded by electrons in quantum orbitals. They maintain the chemical properties of elements and combine through various bonding mechanisms.",
        ),
        ("photosynthesis", Kid) => Some(
            "Photosynthesis is how plants eat! They use sunlight like we use food for energy. Plants take in air and water, mix them with sunshine, and make their own food - plus they give us fresh air to breathe!",
        ),
        ("photosynthesis", Teen) => Some(
            "Photosynthesis is the process where plants convert sunlight, carbon dioxide, and water into glucose (sugar) for energy, releasing oxygen as a bonus. It's basically nature's solar power system that also cleans our air.",
        ),
        ("photosynthesis", College) => Some(
            "Photosynthesis is a complex biochemical process involving light-dependent reactions in thylakoids and the Calvin cycle in chloroplast stroma, converting light energy into chemical energy stored in glucose while releasing oxygen.",
        ),
        ("gravity", Kid) => Some(
            "Gravity is an invisible force that pulls things down to Earth. It's why when you drop your toy, it falls to the ground instead of floating away like in space!",
        ),
        ("gravity", Teen) => Some(
            "Gravity is a fundamental force that attracts objects with mass toward each other. The more massive an object, the stronger its gravitational pull - that's why planets orbit the sun and we stay stuck to Earth.",
        ),
        ("gravity", College) => Some(
            "Gravity is a fundamental interaction described by Einstein's General Relativity as the curvature of spacetime caused by mass and energy, governing planetary motion, stellar evolution, and cosmological structure.",
        ),
        _ => None,
    }
}

pub struct DifficultyAdapter {
    ai: Option<AiClient>,
    concept_re: Regex,
    example_res: Vec<Regex>,
}

impl DifficultyAdapter {
    pub fn new(ai: Option<AiClient>) -> Self {
        let concept_re = Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap();
        let example_res = [
            r"(?i)\blike ([^.,\n]+)",
            r"(?i)\bfor example[,:]? ([^.,\n]+)",
            r"(?i)\bsuch as ([^.,\n]+)",
            r"(?i)\bimagine ([^.,\n]+)",
            r"(?i)\bthink of ([^.,\n]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();

        DifficultyAdapter {
            ai,
            concept_re,
            example_res,
        }
    }

    /// Adapt content for a learner tier. Never fails: on any backend error
    /// the original content comes back verbatim with an unknown reading level.
    pub async fn adapt(
        &self,
        content: &str,
        level: DifficultyLevel,
        topic: &str,
    ) -> AdaptiveResponse {
        // Curated concepts skip the generation step entirely
        if let Some(canned) = concept_library(topic, level) {
            return AdaptiveResponse {
                original_query: content.to_string(),
                difficulty_level: level,
                adapted_response: canned.to_string(),
                key_concepts: vec![topic.to_string()],
                examples_used: self.extract_examples(canned),
                reading_level: level.reading_level().to_string(),
            };
        }

        if let Some(ai) = &self.ai {
            match self.ai_adapt(ai, content, level).await {
                Ok(adapted) => {
                    let key_concepts = self.extract_key_concepts(&adapted);
                    let examples_used = self.extract_examples(&adapted);
                    return AdaptiveResponse {
                        original_query: content.to_string(),
                        difficulty_level: level,
                        adapted_response: adapted,
                        key_concepts,
                        examples_used,
                        reading_level: level.reading_level().to_string(),
                    };
                }
                Err(e) => eprintln!("[Adapt] backend failed, returning original: {}", e),
            }
        }

        AdaptiveResponse {
            original_query: content.to_string(),
            difficulty_level: level,
            adapted_response: content.to_string(),
            key_concepts: vec![],
            examples_used: vec![],
            reading_level: "Unknown".to_string(),
        }
    }

    async fn ai_adapt(
        &self,
        ai: &AiClient,
        content: &str,
        level: DifficultyLevel,
    ) -> Result<String, String> {
        let template = template_for(level);
        let content_preview = ai_client::truncate_for_prompt(content, 3000);

        let prompt = format!(
            r#"Adapt this educational content for {} level students:

Original content: {}

{}

Guidelines:
- Style: {}
- Vocabulary: {}
- Examples: {}
- Length: {}
- Tone: {}

Provide the adapted explanation:"#,
            level.as_str(),
            content_preview,
            template.prompt_suffix,
            template.style,
            template.vocabulary,
            template.examples,
            template.length,
            template.tone,
        );

        ai.complete(&prompt, 800).await
    }

    /// Capitalized (multi-word) phrases, minus interrogatives/determiners,
    /// unique, capped at 5
    fn extract_key_concepts(&self, text: &str) -> Vec<String> {
        const STOPLIST: [&str; 8] = [
            "The", "This", "That", "When", "Where", "Why", "How", "What",
        ];

        let mut concepts: Vec<String> = Vec::new();
        for m in self.concept_re.find_iter(text) {
            let phrase = m.as_str();
            if STOPLIST.contains(&phrase) {
                continue;
            }
            if !concepts.iter().any(|c| c == phrase) {
                concepts.push(phrase.to_string());
            }
            if concepts.len() == 5 {
                break;
            }
        }
        concepts
    }

    /// Analogy-marker pattern search, capped at 3
    fn extract_examples(&self, text: &str) -> Vec<String> {
        let mut examples = Vec::new();
        for re in &self.example_res {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    examples.push(m.as_str().trim().to_string());
                    if examples.len() == 3 {
                        return examples;
                    }
                }
            }
        }
        examples
    }
}

/// Curated example sets per tier, with a generic default when the concept
/// is not covered
pub fn age_appropriate_examples(concept: &str, level: DifficultyLevel) -> Vec<&'static str> {
    use DifficultyLevel::*;

    let sets: [(&str, [&str; 3]); 3] = match level {
        Kid => [
            ("energy", ["running around the playground", "a toy car battery", "eating food for strength"]),
            ("molecules", ["LEGO blocks stuck together", "ingredients in a recipe", "puzzle pieces"]),
            ("ecosystem", ["a fish tank with fish and plants", "your backyard with birds and bugs", "a forest with animals and trees"]),
        ],
        Teen => [
            ("energy", ["phone battery power", "car engine fuel", "solar panels charging devices"]),
            ("molecules", ["apps made of code lines", "teams made of players", "songs made of notes"]),
            ("ecosystem", ["social media networks", "gaming communities", "school social groups"]),
        ],
        College => [
            ("energy", ["ATP in cellular respiration", "potential vs kinetic energy systems", "thermodynamic processes"]),
            ("molecules", ["protein folding mechanisms", "chemical bond formation", "molecular orbital theory"]),
            ("ecosystem", ["population dynamics models", "trophic cascade effects", "biodiversity indices"]),
        ],
    };

    let concept_lower = concept.to_lowercase();
    for (key, examples) in sets {
        if concept_lower.contains(key) || key.contains(concept_lower.as_str()) {
            return examples.to_vec();
        }
    }

    vec!["real-world applications", "everyday examples", "practical uses"]
}
