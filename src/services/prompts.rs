use crate::{
    models::{AnswerMatrix, FEELING_QUESTION_INDEX, PRODUCTION_QUESTION_INDEX},
    services::providers::GenerationOptions,
};

/// Sampling temperature when the user expressed preferences
pub const PREFERENCE_TEMPERATURE: f32 = 0.5;

/// Sampling temperature when every question was skipped
pub const OPEN_TEMPERATURE: f32 = 0.8;

const NOT_SPECIFIED: &str = "not specified";

/// Films the model must choose recommendations from
pub const MOVIE_CATALOG: &[&str] = &[
    "The Shawshank Redemption (1994)",
    "The Godfather (1972)",
    "The Dark Knight (2008)",
    "12 Angry Men (1957)",
    "Schindler's List (1993)",
    "The Lord of the Rings: The Return of the King (2003)",
    "Pulp Fiction (1994)",
    "The Good, the Bad and the Ugly (1966)",
    "Forrest Gump (1994)",
    "Fight Club (1999)",
    "Inception (2010)",
    "The Matrix (1999)",
    "Goodfellas (1990)",
    "Seven Samurai (1954)",
    "Se7en (1995)",
    "City of God (2002)",
    "Spirited Away (2001)",
    "The Silence of the Lambs (1991)",
    "It's a Wonderful Life (1946)",
    "Saving Private Ryan (1998)",
    "Interstellar (2014)",
    "The Green Mile (1999)",
    "Parasite (2019)",
    "Back to the Future (1985)",
    "Psycho (1960)",
    "Modern Times (1936)",
    "Casablanca (1942)",
    "Whiplash (2014)",
    "The Prestige (2006)",
    "The Lion King (1994)",
    "Spider-Man: Into the Spider-Verse (2018)",
    "Alien (1979)",
    "Rear Window (1954)",
    "Apocalypse Now (1979)",
    "WALL-E (2008)",
    "Amélie (2001)",
    "Grave of the Fireflies (1988)",
    "Singin' in the Rain (1952)",
    "Some Like It Hot (1959)",
    "The Grand Budapest Hotel (2014)",
    "Mad Max: Fury Road (2015)",
    "Eternal Sunshine of the Spotless Mind (2004)",
    "Toy Story (1995)",
    "Amadeus (1984)",
    "Blade Runner (1982)",
    "Paddington 2 (2017)",
    "The Princess Bride (1987)",
    "Everything Everywhere All at Once (2022)",
    "Before Sunrise (1995)",
    "Coco (2017)",
];

/// A ready-to-send prompt with the generation settings it expects
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan {
    pub prompt: String,
    pub options: GenerationOptions,
}

fn catalog_block(catalog: &[&str]) -> String {
    catalog.join("\n")
}

/// Builds the recommendation prompt for a finished quiz
///
/// A blank matrix asks for a diverse acclaimed selection. Otherwise every
/// answer is embedded, with the production (position 12) and feeling
/// (position 0) answers called out as ordered tie-breakers.
pub fn recommendation_prompt(answers: &AnswerMatrix, catalog: &[&str]) -> PromptPlan {
    if answers.is_blank() {
        return PromptPlan {
            prompt: format!(
                "You are a sophisticated movie recommendation expert called MoodFlix AI.
A user has not provided any preferences.
Your task is to select a diverse list of EXACTLY 5 popular, critically acclaimed films from the following list.

Here is the list of movies you MUST choose from:
{catalog}

For each movie provide: title, year (as a number), synopsis (one spoiler-free paragraph), director, and actors (an array of 3-4 main actors).
Your final output MUST be a single, valid JSON array of 5 movie objects.",
                catalog = catalog_block(catalog),
            ),
            options: GenerationOptions::json(OPEN_TEMPERATURE),
        };
    }

    let all_preferences = answers.flattened().join(", ");
    let production = answers
        .joined(PRODUCTION_QUESTION_INDEX)
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let feeling = answers
        .joined(FEELING_QUESTION_INDEX)
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());

    PromptPlan {
        prompt: format!(
            "You are a sophisticated movie recommendation expert called MoodFlix AI.
A user has answered a quiz about their current mood and preferences. Their collective preferences are: {all_preferences}.

Your task is to select EXACTLY 5 movies from the following list that best match these preferences. Follow this precise multi-step process:

1. Initial Analysis: For every movie in the list, determine how well it matches the user's collective preferences. A movie does not need to match every preference; aim for the highest number of matches.

2. Filtering: Shortlist the top contenders (the movies with the highest number of matching preferences). This list might be larger than 5.

3. Tie-Breaking: If the shortlist has more than 5 movies, apply these rules in order and stop as soon as you have 5 or fewer:
   * Tie-Breaker #1 (Production Era): The user's preference for production quality is: \"{production}\". Give strong priority to movies that best match it.
   * Tie-Breaker #2 (User's Feeling): The user's preference for emotional tone is: \"{feeling}\". Give strong priority to movies that match it.
   * Tie-Breaker #3 (Random Selection): If more than 5 remain, randomly select 5 of them.

Here is the list of movies you MUST choose from:
{catalog}

For each of the 5 movies provide the following details in JSON format:
- title: The full title of the movie.
- year: The release year as a number.
- synopsis: A compelling, spoiler-free, one-paragraph summary.
- director: The name of the director.
- actors: An array of 3-4 main actors.

Your final output MUST be a single, valid JSON array of 5 movie objects. Do not include any other text, explanation, or markdown formatting outside of the JSON array.",
            catalog = catalog_block(catalog),
        ),
        options: GenerationOptions::json(PREFERENCE_TEMPERATURE),
    }
}

/// Builds the spoiler-free "viewing tips" prompt for one film
pub fn viewing_tips_prompt(title: &str) -> String {
    format!(
        "For the movie \"{title}\", provide \"Viewing Tips\" in a short paragraph (2-4 sentences).
This is NOT a synopsis. Guide the viewer on which cinematic elements to pay attention to for an enhanced experience, without spoiling any plot points.
For example: \"Pay close attention to the use of the color red; it carries significant symbolic weight throughout the film.\" or \"The director uses long, uninterrupted takes to immerse you in the action.\"
These tips MUST BE SPOILER-FREE and focus on appreciating the film's artistry (cinematography, score, editing, color palette, recurring motifs)."
    )
}

/// Persona for the movie guru chat
pub const GURU_SYSTEM_INSTRUCTION: &str = "You are Kazo, a highly intelligent and passionately opinionated AI movie nerd. Your catchphrase is \"Budimo realni\" (which means \"Let's be real\"). Use it when you're about to make a strong point or give a detailed, honest take.
You have an encyclopedic knowledge of cinema, from obscure art-house to massive blockbusters, and you love sharing it. Provide insightful, detailed answers with a personal, nerdy flair. Don't be afraid to have strong opinions, but always back them up with facts or well-reasoned arguments.
When a user asks for something that could be a spoiler, always begin your response with a clear warning like, \"Budimo realni, that's a huge spoiler. If you haven't seen the movie, stop reading now...\".
Your goal is to be the ultimate, most knowledgeable, and most engaging movie-buff companion.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ResponseFormat;

    fn matrix(entries: Vec<Vec<&str>>) -> AnswerMatrix {
        let len = entries.len();
        AnswerMatrix::from_entries(
            entries
                .into_iter()
                .map(|e| e.into_iter().map(String::from).collect())
                .collect(),
            len,
        )
        .unwrap()
    }

    #[test]
    fn test_blank_answers_use_open_prompt() {
        let plan = recommendation_prompt(&AnswerMatrix::empty(15), &["Alien (1979)"]);
        assert!(plan.prompt.contains("has not provided any preferences"));
        assert!(plan.prompt.contains("Alien (1979)"));
        assert_eq!(plan.options.temperature, Some(OPEN_TEMPERATURE));
        assert_eq!(plan.options.response_format, ResponseFormat::Json);
    }

    #[test]
    fn test_tie_breakers_are_positional() {
        let mut entries = vec![vec![]; 15];
        entries[0] = vec!["seeking a joyful, upbeat movie"];
        entries[4] = vec!["wants a comedy"];
        entries[12] = vec!["enjoys classic films"];
        let plan = recommendation_prompt(&matrix(entries), MOVIE_CATALOG);

        assert!(plan.prompt.contains(
            "Their collective preferences are: seeking a joyful, upbeat movie, wants a comedy, enjoys classic films."
        ));
        assert!(plan
            .prompt
            .contains("production quality is: \"enjoys classic films\""));
        assert!(plan
            .prompt
            .contains("emotional tone is: \"seeking a joyful, upbeat movie\""));
        assert_eq!(plan.options.temperature, Some(PREFERENCE_TEMPERATURE));
    }

    #[test]
    fn test_missing_tie_breakers_are_not_specified() {
        let mut entries = vec![vec![]; 15];
        entries[3] = vec!["prefers moderate intensity"];
        let plan = recommendation_prompt(&matrix(entries), MOVIE_CATALOG);
        assert!(plan.prompt.contains("production quality is: \"not specified\""));
        assert!(plan.prompt.contains("emotional tone is: \"not specified\""));
    }

    #[test]
    fn test_short_question_bank_still_builds() {
        let plan = recommendation_prompt(&matrix(vec![vec!["x"]]), MOVIE_CATALOG);
        assert!(plan.prompt.contains("production quality is: \"not specified\""));
    }

    #[test]
    fn test_viewing_tips_prompt_names_the_film() {
        let prompt = viewing_tips_prompt("Blade Runner");
        assert!(prompt.starts_with("For the movie \"Blade Runner\""));
        assert!(prompt.contains("SPOILER-FREE"));
    }
}
