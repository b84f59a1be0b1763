use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{AnswerMatrix, MovieRecommendation},
    services::{
        prompts::{recommendation_prompt, MOVIE_CATALOG},
        providers::LanguageModel,
        response_parser::parse_model_json,
    },
};

/// Generates movie recommendations for a completed quiz
///
/// Matching, ranking and tie-breaking happen inside the model; this builds
/// the prompt, repairs the reply into JSON and checks its shape.
pub async fn get_recommendations(
    model: &dyn LanguageModel,
    answers: &AnswerMatrix,
) -> AppResult<Vec<MovieRecommendation>> {
    let plan = recommendation_prompt(answers, MOVIE_CATALOG);

    tracing::info!(
        provider = model.name(),
        answered = answers.flattened().len(),
        temperature = ?plan.options.temperature,
        "Requesting movie recommendations"
    );

    let text = model.generate_once(&plan.prompt, &plan.options).await?;
    let parsed = parse_model_json(&text)?;
    let recommendations = validate_recommendations(parsed)?;

    tracing::info!(
        count = recommendations.len(),
        "Movie recommendations received"
    );

    Ok(recommendations)
}

/// Checks that parsed model output is a non-empty array of movie records
///
/// Only the first element's `title` decides whether the shape is right; a
/// record that then fails to deserialize is still reported as a bad shape.
/// The number of records is not enforced.
pub fn validate_recommendations(value: Value) -> AppResult<Vec<MovieRecommendation>> {
    let records = match value {
        Value::Array(records) => records,
        other => {
            return Err(AppError::InvalidShape(format!(
                "expected a JSON array of movies, got {}",
                json_kind(&other)
            )))
        }
    };

    let has_title = records
        .first()
        .and_then(Value::as_object)
        .is_some_and(|record| record.contains_key("title"));
    if !has_title {
        return Err(AppError::InvalidShape(
            "expected a non-empty array whose first element has a title".to_string(),
        ));
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<MovieRecommendation>(record).map_err(|e| {
                AppError::InvalidShape(format!("movie record {} is malformed: {}", index, e))
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
