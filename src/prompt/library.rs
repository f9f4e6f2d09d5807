//! Built-in prompt templates served by the HTTP layer.

use super::template::PromptTemplate;

/// Movie recommendation prompt. Placeholders: `type`, `year`, `lang`.
pub const MOVIE_RECOMMENDATION: &str = r#"I want to watch a {type} movie tonight with good rating,
looking for movies released in {year} and in {lang} language.
Suggest me one specific movie and tell me the cast and length of the movie.

response should be in below format :
1. Movie name : <movie name>
2. Basic Plot : <basic plot of the movie in one line>
3. Cast : <cast of the movie in one line>
4. Length : <length of the movie in one line>
5. IMDB Rating : <IMDB rating of the movie in one line>

Don't Give any other information except above mentioned format and details.
"#;

pub fn movie_recommendation() -> PromptTemplate {
    PromptTemplate::new(MOVIE_RECOMMENDATION)
}
