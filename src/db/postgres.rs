use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    error::AppResult,
    models::{CatalogEntry, ContentItem, Credit, Medium, Movie, NamedRef, Person, TvShow},
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Read access to catalog records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Loads one movie or show with its genres (primary first), countries and directors
    async fn find(&self, medium: Medium, id: i64) -> AppResult<Option<ContentItem>>;
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Relations shared by both media, as parallel arrays in join-row order
#[derive(Debug, FromRow)]
struct RelationColumns {
    genre_ids: Vec<i64>,
    genre_names: Vec<String>,
    country_ids: Vec<i64>,
    country_names: Vec<String>,
    director_credit_ids: Vec<i64>,
    director_person_ids: Vec<i64>,
    director_names: Vec<String>,
}

#[derive(Debug, FromRow)]
struct EntryColumns {
    id: i64,
    title: Option<String>,
    description: Option<String>,
    primary_image_url: Option<String>,
    content_rating: Option<String>,
    average_rating: Option<f64>,
    num_votes: Option<i64>,
}

#[derive(Debug, FromRow)]
struct MovieRow {
    #[sqlx(flatten)]
    entry: EntryColumns,
    #[sqlx(flatten)]
    relations: RelationColumns,
    release_year: Option<i32>,
    runtime_minutes: Option<i32>,
}

#[derive(Debug, FromRow)]
struct TvShowRow {
    #[sqlx(flatten)]
    entry: EntryColumns,
    #[sqlx(flatten)]
    relations: RelationColumns,
    start_year: Option<i32>,
    end_year: Option<i32>,
    total_seasons: Option<i32>,
    total_episodes: Option<i32>,
}

fn named_refs(ids: Vec<i64>, names: Vec<String>) -> Vec<NamedRef> {
    ids.into_iter()
        .zip(names)
        .map(|(id, name)| NamedRef { id, name })
        .collect()
}

fn catalog_entry(entry: EntryColumns, relations: RelationColumns) -> CatalogEntry {
    let directors = relations
        .director_credit_ids
        .into_iter()
        .zip(relations.director_person_ids)
        .zip(relations.director_names)
        .map(|((id, person_id), full_name)| Credit {
            id,
            person: Person {
                id: person_id,
                full_name,
            },
        })
        .collect();

    CatalogEntry {
        id: entry.id.to_string(),
        title: entry.title.unwrap_or_default(),
        description: entry.description,
        primary_image_url: entry.primary_image_url,
        content_rating: entry.content_rating,
        average_rating: entry.average_rating,
        num_votes: entry.num_votes,
        genres: named_refs(relations.genre_ids, relations.genre_names),
        countries: named_refs(relations.country_ids, relations.country_names),
        directors,
    }
}

/// Shared select list; `parent` is the join-table prefix and `t` the item alias
fn entry_and_relation_columns(parent: &str) -> String {
    format!(
        r#"
        t.id::int8 AS id, t.title, t.description, t.primary_image_url, t.content_rating,
        t.average_rating::float8 AS average_rating, t.num_votes::int8 AS num_votes,
        ARRAY(SELECT g.id::int8 FROM {p}_genres j JOIN genres g ON g.id = j.genre_id
              WHERE j.{p}_id = t.id AND g.name IS NOT NULL ORDER BY j.id) AS genre_ids,
        ARRAY(SELECT g.name::text FROM {p}_genres j JOIN genres g ON g.id = j.genre_id
              WHERE j.{p}_id = t.id AND g.name IS NOT NULL ORDER BY j.id) AS genre_names,
        ARRAY(SELECT c.id::int8 FROM {p}_countries j JOIN countries c ON c.id = j.country_id
              WHERE j.{p}_id = t.id AND c.name IS NOT NULL ORDER BY j.id) AS country_ids,
        ARRAY(SELECT c.name::text FROM {p}_countries j JOIN countries c ON c.id = j.country_id
              WHERE j.{p}_id = t.id AND c.name IS NOT NULL ORDER BY j.id) AS country_names,
        ARRAY(SELECT j.id::int8 FROM {p}_directors j JOIN people pe ON pe.id = j.person_id
              WHERE j.{p}_id = t.id ORDER BY j.id) AS director_credit_ids,
        ARRAY(SELECT j.person_id::int8 FROM {p}_directors j JOIN people pe ON pe.id = j.person_id
              WHERE j.{p}_id = t.id ORDER BY j.id) AS director_person_ids,
        ARRAY(SELECT COALESCE(pe.full_name, '')::text FROM {p}_directors j
              JOIN people pe ON pe.id = j.person_id
              WHERE j.{p}_id = t.id ORDER BY j.id) AS director_names
        "#,
        p = parent
    )
}

fn movie_query() -> String {
    format!(
        "SELECT {}, t.release_year::int4 AS release_year, t.runtime_minutes::int4 AS runtime_minutes \
         FROM movies t WHERE t.id = $1",
        entry_and_relation_columns("movie")
    )
}

fn tv_show_query() -> String {
    format!(
        "SELECT {}, t.start_year::int4 AS start_year, t.end_year::int4 AS end_year, \
         t.total_seasons::int4 AS total_seasons, t.total_episodes::int4 AS total_episodes \
         FROM tv_shows t WHERE t.id = $1",
        entry_and_relation_columns("tv_show")
    )
}

#[async_trait::async_trait]
impl CatalogRepository for PgCatalog {
    async fn find(&self, medium: Medium, id: i64) -> AppResult<Option<ContentItem>> {
        let item = match medium {
            Medium::Movie => {
                let sql = movie_query();
                sqlx::query_as::<_, MovieRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|row| {
                        ContentItem::Movie(Movie {
                            entry: catalog_entry(row.entry, row.relations),
                            release_year: row.release_year,
                            runtime_minutes: row.runtime_minutes,
                        })
                    })
            }
            Medium::TvShow => {
                let sql = tv_show_query();
                sqlx::query_as::<_, TvShowRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|row| {
                        ContentItem::TvShow(TvShow {
                            entry: catalog_entry(row.entry, row.relations),
                            start_year: row.start_year,
                            end_year: row.end_year,
                            total_seasons: row.total_seasons,
                            total_episodes: row.total_episodes,
                        })
                    })
            }
        };

        tracing::debug!(medium = %medium, id, found = item.is_some(), "Catalog lookup");

        Ok(item)
    }
}
