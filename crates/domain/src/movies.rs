use async_trait::async_trait;
use movie_backend_errors::BackendResult;
use serde::{Deserialize, Serialize};

/// OMDB 搜索结果中的一条记录，字段名保持 OMDB 原样
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Poster")]
    pub poster: String,
}

#[async_trait]
pub trait MovieSearch: Send + Sync {
    async fn search(&self, title: &str) -> BackendResult<Vec<MovieSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_summary_uses_omdb_field_names() {
        let raw = r#"{"Title":"Signs","Year":"2002","imdbID":"tt0286106","Type":"movie","Poster":"N/A"}"#;
        let movie: MovieSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(movie.title, "Signs");
        assert_eq!(movie.imdb_id, "tt0286106");

        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["imdbID"], "tt0286106");
        assert_eq!(json["Type"], "movie");
    }
}
