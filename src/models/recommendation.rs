use serde::{Deserialize, Deserializer, Serialize};

/// A single movie suggested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecommendation {
    pub title: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub director: String,
    /// Main cast in billing order; the model is asked for this as `actors`
    #[serde(default, alias = "actors")]
    pub cast: Vec<String>,
}

/// Accepts `1999` as well as `"1999"`, both of which the model produces
fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Number(i32),
        Text(String),
    }

    match RawYear::deserialize(deserializer)? {
        RawYear::Number(year) => Ok(year),
        RawYear::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid year: {}", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_model_record() {
        let movie: MovieRecommendation = serde_json::from_value(json!({
            "title": "Spirited Away",
            "year": 2001,
            "synopsis": "A girl wanders into a world of spirits.",
            "director": "Hayao Miyazaki",
            "actors": ["Rumi Hiiragi", "Miyu Irino"]
        }))
        .unwrap();

        assert_eq!(movie.title, "Spirited Away");
        assert_eq!(movie.year, 2001);
        assert_eq!(movie.cast, vec!["Rumi Hiiragi", "Miyu Irino"]);
    }

    #[test]
    fn test_year_as_string() {
        let movie: MovieRecommendation =
            serde_json::from_value(json!({"title": "Heat", "year": " 1995 "})).unwrap();
        assert_eq!(movie.year, 1995);
        assert!(movie.cast.is_empty());
    }

    #[test]
    fn test_year_garbage_rejected() {
        let result: Result<MovieRecommendation, _> =
            serde_json::from_value(json!({"title": "Heat", "year": "mid-nineties"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_cast_field() {
        let movie = MovieRecommendation {
            title: "Heat".to_string(),
            year: 1995,
            synopsis: String::new(),
            director: "Michael Mann".to_string(),
            cast: vec!["Al Pacino".to_string()],
        };
        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(value["cast"][0], "Al Pacino");
    }
}
