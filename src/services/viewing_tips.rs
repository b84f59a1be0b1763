use crate::{
    error::{AppError, AppResult},
    services::{
        prompts::viewing_tips_prompt,
        providers::{GenerationOptions, LanguageModel},
    },
};

/// Asks the model for spoiler-free tips on what to watch for in a film
pub async fn get_viewing_tips(model: &dyn LanguageModel, title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput(
            "Movie title cannot be empty".to_string(),
        ));
    }

    let tips = model
        .generate_once(&viewing_tips_prompt(title), &GenerationOptions::text())
        .await?;

    let tips = tips.trim();
    if tips.is_empty() {
        return Err(AppError::ExternalApi(format!(
            "Model returned no viewing tips for {}",
            title
        )));
    }

    tracing::debug!(title = %title, "Viewing tips generated");
    Ok(tips.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{MockLanguageModel, ResponseFormat};

    #[tokio::test]
    async fn test_tips_are_trimmed() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate_once()
            .withf(|prompt, options| {
                prompt.contains("\"Heat\"") && options.response_format == ResponseFormat::Text
            })
            .returning(|_, _| Ok("\n  Watch the diner scene's framing.  \n".to_string()));

        let tips = tokio_test::assert_ok!(get_viewing_tips(&model, " Heat ").await);
        assert_eq!(tips, "Watch the diner scene's framing.");
    }

    #[tokio::test]
    async fn test_blank_title_never_reaches_model() {
        let mut model = MockLanguageModel::new();
        model.expect_generate_once().times(0);

        let result = get_viewing_tips(&model, "  ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_external_error() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate_once()
            .returning(|_, _| Ok("   ".to_string()));

        let err = tokio_test::assert_err!(get_viewing_tips(&model, "Heat").await);
        assert!(matches!(err, AppError::ExternalApi(_)));
    }
}
