use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MovieStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// ISO date (YYYY-MM-DD)
    pub release_date: String,
    /// Minutes
    pub runtime: i64,
    pub mpaa_rating: String,
    pub description: String,
    pub image: Option<String>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub genre: String,
    /// Whether the movie being edited has this genre
    #[sqlx(default)]
    pub checked: bool,
}

/// Input for inserting a movie.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub release_date: String,
    pub runtime: i64,
    pub mpaa_rating: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub genres_array: Vec<i64>,
}

const MOVIE_COLUMNS: &str = "id, title, release_date, runtime, mpaa_rating, description, image";

impl MovieStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All movies ordered by title, without genres.
    pub async fn list(&self) -> Result<Vec<Movie>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM movies ORDER BY title",
            MOVIE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// A movie with its genres.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Movie>, sqlx::Error> {
        let movie: Option<Movie> =
            sqlx::query_as(&format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(mut movie) = movie else {
            return Ok(None);
        };

        movie.genres = sqlx::query_as(
            "SELECT g.id, g.genre, 1 AS checked
             FROM genres g
             JOIN movies_genres mg ON mg.genre_id = g.id
             WHERE mg.movie_id = ?
             ORDER BY g.genre",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(movie))
    }

    /// All genres ordered by name, none checked.
    pub async fn genres(&self) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as("SELECT id, genre, 0 AS checked FROM genres ORDER BY genre")
            .fetch_all(&self.pool)
            .await
    }

    /// A movie plus every genre, with the movie's own genres checked.
    pub async fn edit_view(&self, id: i64) -> Result<Option<(Movie, Vec<Genre>)>, sqlx::Error> {
        let Some(movie) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let genres = sqlx::query_as(
            "SELECT g.id, g.genre,
                    EXISTS (SELECT 1 FROM movies_genres mg
                            WHERE mg.movie_id = ? AND mg.genre_id = g.id) AS checked
             FROM genres g
             ORDER BY g.genre",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((movie, genres)))
    }

    /// Insert a movie and attach its genres. Returns the movie ID.
    pub async fn insert(&self, movie: &NewMovie) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO movies (title, release_date, runtime, mpaa_rating, description, image)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&movie.title)
        .bind(&movie.release_date)
        .bind(movie.runtime)
        .bind(&movie.mpaa_rating)
        .bind(&movie.description)
        .bind(&movie.image)
        .execute(&mut *tx)
        .await?;
        let movie_id = result.last_insert_rowid();

        for genre_id in &movie.genres_array {
            sqlx::query("INSERT OR IGNORE INTO movies_genres (movie_id, genre_id) VALUES (?, ?)")
                .bind(movie_id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(movie_id)
    }
}
