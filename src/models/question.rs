use serde::{Deserialize, Serialize};
use std::path::Path;

/// Position of the "how are you feeling" question in the built-in bank
pub const FEELING_QUESTION_INDEX: usize = 0;

/// Position of the production-quality question in the built-in bank
pub const PRODUCTION_QUESTION_INDEX: usize = 12;

/// A selectable answer: what the user sees and what the model receives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub value: String,
}

/// A quiz question with its ordered answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub answers: Vec<Answer>,
}

impl Question {
    /// Whether `value` is one of this question's answer values
    pub fn offers(&self, value: &str) -> bool {
        self.answers.iter().any(|a| a.value == value)
    }
}

type QuestionDef = (&'static str, &'static [(&'static str, &'static str)]);

const QUESTION_BANK: &[QuestionDef] = &[
    (
        "How are you feeling right now?",
        &[
            ("Happy and energetic", "seeking a joyful, upbeat movie"),
            ("Calm and thoughtful", "in the mood for a thought-provoking, deep film"),
            ("A bit down, need a pick-me-up", "wanting a heartwarming and inspiring story"),
            ("Stressed and need an escape", "looking for a total escape into another world"),
        ],
    ),
    (
        "What kind of world do you want to dive into?",
        &[
            ("A gritty, realistic city", "preferring a realistic, urban setting"),
            ("The vastness of outer space", "interested in science fiction and space"),
            ("A historical period", "wanting a film set in the past"),
            ("A magical, fantastical realm", "looking for a fantasy or magical world"),
        ],
    ),
    (
        "How much thinking do you want to do?",
        &[
            ("I want a complex, mind-bending plot", "desiring a complex plot that requires attention"),
            ("Something engaging but not overly complicated", "wanting a balanced, engaging story"),
            ("Pure entertainment, please!", "looking for an easy-to-watch, fun movie"),
            ("I'm open to an emotional journey", "ready for an emotionally deep experience"),
        ],
    ),
    (
        "What's your preferred pace?",
        &[
            ("Fast-paced and full of action", "preferring a high-octane, action-packed movie"),
            ("A slow-burn with building tension", "in the mood for a suspenseful, slow-burn film"),
            ("A steady, character-driven story", "wanting a story focused on character development"),
            ("Doesn't matter, as long as it's good", "open to any pace if the story is compelling"),
        ],
    ),
    (
        "Choose a dominant emotion for your movie:",
        &[
            ("Laughter", "wants a comedy"),
            ("Tension", "wants a thriller or horror"),
            ("Inspiration", "wants an uplifting story"),
            ("Nostalgia", "wants a classic or feel-good movie"),
        ],
    ),
    (
        "Are you watching alone or with company?",
        &[
            ("Alone, I can get fully immersed", "watching alone, open to intense or complex films"),
            ("With a partner", "looking for a movie suitable for a couple, perhaps a romance or drama"),
            ("With friends", "wanting a fun, crowd-pleasing movie for a group"),
            ("With family", "needing a family-friendly or universally appealing film"),
        ],
    ),
    (
        "Do you want a story that feels...",
        &[
            ("...larger than life and epic?", "prefers an epic-scale story"),
            ("...intimate and personal?", "prefers a small-scale, personal story"),
            ("...chaotic and unpredictable?", "enjoys chaotic and unpredictable plots"),
            ("...structured and classic?", "enjoys classic, well-structured storytelling"),
        ],
    ),
    (
        "How do you feel about endings?",
        &[
            ("I need a happy, satisfying ending", "prefers a happy ending"),
            ("A thought-provoking or ambiguous ending is great", "enjoys ambiguous or thoughtful endings"),
            ("I can handle a tragic or bittersweet ending", "is open to sad or bittersweet endings"),
            ("Surprise me with a twist!", "loves a good plot twist"),
        ],
    ),
    (
        "Pick a visual style:",
        &[
            ("Visually stunning with beautiful cinematography", "values strong cinematography and visual beauty"),
            ("Gritty and realistic", "prefers a raw, realistic visual style"),
            ("Colorful and imaginative animation", "is in the mood for an animated film"),
            ("Classic black and white", "appreciates black and white films"),
        ],
    ),
    (
        "What kind of protagonist are you looking for?",
        &[
            ("A heroic and inspiring figure", "wants a classic hero protagonist"),
            ("A morally complex anti-hero", "is interested in anti-heroes"),
            ("An ordinary person in extraordinary circumstances", "likes relatable, everyday protagonists"),
            ("A clever and witty character", "enjoys smart and witty characters"),
        ],
    ),
    (
        "Do you prefer dialogue-heavy or action-heavy films?",
        &[
            ("Sharp, witty dialogue is key", "prefers dialogue-driven movies"),
            ("Let the action tell the story", "prefers action-oriented storytelling"),
            ("A good balance of both", "wants a balance of action and dialogue"),
            ("More visual storytelling, less talk", "prefers visual storytelling with minimal dialogue"),
        ],
    ),
    (
        "What is your tolerance for on-screen intensity?",
        &[
            ("Bring on the intense action and drama", "has a high tolerance for intensity"),
            ("Some tension is fine, but not too graphic", "prefers moderate intensity"),
            ("I'd prefer something light and easygoing", "wants a low-intensity, lighthearted film"),
            ("I'm okay with emotional intensity, but not violence", "prefers emotional intensity over physical violence"),
        ],
    ),
    (
        "How important is modern production quality to you?",
        &[
            ("I want the latest high-resolution and amazing sound", "prefers modern, high-tech productions with top-tier visuals and sound"),
            ("I love the charm and grain of older movies", "enjoys classic films and is not concerned with modern technical specs"),
            ("Story is king, I don't care about production age", "is indifferent to production quality, focusing only on story and characters"),
        ],
    ),
    (
        "Do you want to laugh or cry?",
        &[
            ("Definitely laugh", "is explicitly looking for a comedy"),
            ("A good cry can be cathartic", "is open to a tearjerker or emotional drama"),
            ("A mix of both would be perfect", "wants a dramedy with both humor and emotion"),
            ("Neither, I'm looking for thrills", "prefers suspense and thrills over comedy or drama"),
        ],
    ),
    (
        "Finally, what's more important to you?",
        &[
            ("A powerful message or theme", "prioritizes a strong message or theme"),
            ("An intricate and clever plot", "prioritizes a well-crafted plot"),
            ("Deep and memorable characters", "prioritizes character development"),
            ("Pure cinematic style and spectacle", "prioritizes visual style and spectacle"),
        ],
    ),
];

/// The built-in question bank, in quiz order
pub fn default_questions() -> Vec<Question> {
    QUESTION_BANK
        .iter()
        .enumerate()
        .map(|(position, (text, answers))| Question {
            id: position as u32 + 1,
            text: text.to_string(),
            answers: answers
                .iter()
                .map(|(text, value)| Answer {
                    text: text.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        })
        .collect()
}

/// Loads a question bank from a JSON file containing an array of questions
pub fn load_questions(path: impl AsRef<Path>) -> anyhow::Result<Vec<Question>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read question bank {}: {}", path.display(), e))?;
    parse_questions(&raw)
}

/// Parses and checks a question bank
pub fn parse_questions(raw: &str) -> anyhow::Result<Vec<Question>> {
    let questions: Vec<Question> = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Invalid question bank: {}", e))?;

    if questions.is_empty() {
        anyhow::bail!("Question bank must contain at least one question");
    }
    if let Some(q) = questions.iter().find(|q| q.answers.is_empty()) {
        anyhow::bail!("Question {} has no answers", q.id);
    }

    Ok(questions)
}
