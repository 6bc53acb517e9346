mod movies;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::auth::{Identity, UserLookup};

pub use movies::{Genre, Movie, MovieStore, NewMovie};
pub use user::{User, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let (url, max_connections) = if path == ":memory:" {
            // Every connection to sqlite::memory: is its own database.
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", path), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn movies(&self) -> MovieStore {
        MovieStore::new(self.pool.clone())
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE genres (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    genre TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE movies (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    release_date TEXT NOT NULL,
                    runtime INTEGER NOT NULL,
                    mpaa_rating TEXT NOT NULL,
                    description TEXT NOT NULL,
                    image TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE movies_genres (
                    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
                    genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                    PRIMARY KEY (movie_id, genre_id)
                )",
                "CREATE INDEX idx_movies_genres_genre_id ON movies_genres(genre_id)",
                "INSERT INTO genres (genre) VALUES
                    ('Action'), ('Adventure'), ('Animation'), ('Comedy'), ('Crime'),
                    ('Documentary'), ('Drama'), ('Fantasy'), ('Horror'), ('Mystery'),
                    ('Romance'), ('Sci-Fi'), ('Superhero'), ('Thriller')",
            ],
        )
        .await
    }
}

impl UserLookup for Database {
    async fn lookup_user_by_id(&self, id: i64) -> Result<Option<Identity>, sqlx::Error> {
        Ok(self.users().get_by_id(id).await?.map(|user| user.identity()))
    }

    async fn lookup_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Identity, String)>, sqlx::Error> {
        Ok(self
            .users()
            .get_by_email(email)
            .await?
            .map(|user| (user.identity(), user.password_hash)))
    }
}
