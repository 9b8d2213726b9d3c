//! # Catalog Repository
//!
//! Formats, titles and copies, plus the browse views built on them.
//!
//! ## Browse Query Flow
//! ```text
//! CatalogFilter { query, genre, format }
//!      │ normalized()
//!      ▼
//! SELECT titles WHERE LIKE / genre        ← SQL narrows by text and genre
//!      │
//!      ▼
//! SELECT copies JOIN formats for those titles
//!      │ grouped by title
//!      ▼
//! TitleSummary::from_copies()              ← reel-core computes availability
//!      │
//!      ▼
//! filter.accepts(summary)                  ← format needs an available copy
//! ```
//!
//! The home page rows ([`CatalogRepository::home_page`]) and search box
//! suggestions ([`CatalogRepository::autocomplete`]) are single queries.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::inventory::COPY_COLUMNS;
use reel_core::validation::{validate_price_cents, validate_search_query};
use reel_core::{
    CatalogFilter, CopyInfo, CoreError, HomePage, MediaCopy, MediaFormat, NewArrival, PopularTitle,
    StoreStats, Title, TitleDetails, TitleSuggestion, TitleSummary, AUTOCOMPLETE_LIMIT,
    NEW_ARRIVALS_LIMIT, POPULAR_TITLES_LIMIT,
};

const TITLE_COLUMNS: &str = "id, name, description, release_year, genre, director, \
                             duration_minutes, rating, cover_image_url, created_at";

const COPY_INFO_SELECT: &str = "SELECT c.title_id AS title_id, c.id AS copy_id, \
                                f.name AS format_name, c.condition AS condition, \
                                c.is_available AS is_available, \
                                f.daily_price_cents AS daily_price_cents, c.barcode AS barcode \
                                FROM media_copies c JOIN media_formats f ON f.id = c.format_id";

#[derive(FromRow)]
struct CopyRow {
    title_id: String,
    #[sqlx(flatten)]
    info: CopyInfo,
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Formats
    // -------------------------------------------------------------------------

    /// Adds a media format ("DVD", "Blu-Ray", ...).
    pub async fn insert_format(&self, name: &str, daily_price_cents: i64) -> DbResult<MediaFormat> {
        validate_price_cents(daily_price_cents)?;

        let format = MediaFormat {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            daily_price_cents,
        };

        debug!(id = %format.id, name = %format.name, "Inserting media format");

        sqlx::query("INSERT INTO media_formats (id, name, daily_price_cents) VALUES (?1, ?2, ?3)")
            .bind(&format.id)
            .bind(&format.name)
            .bind(format.daily_price_cents)
            .execute(&self.pool)
            .await?;

        Ok(format)
    }

    /// Every format, by name.
    pub async fn list_formats(&self) -> DbResult<Vec<MediaFormat>> {
        let formats = sqlx::query_as::<_, MediaFormat>(
            "SELECT id, name, daily_price_cents FROM media_formats ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(formats)
    }

    /// Distinct format names, sorted.
    pub async fn format_names(&self) -> DbResult<Vec<String>> {
        let names = sqlx::query_scalar("SELECT DISTINCT name FROM media_formats ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(names)
    }

    // -------------------------------------------------------------------------
    // Titles
    // -------------------------------------------------------------------------

    /// Adds a title.
    pub async fn insert_title(&self, title: &Title) -> DbResult<()> {
        debug!(id = %title.id, name = %title.name, "Inserting title");

        sqlx::query(
            r#"
            INSERT INTO titles (
                id, name, description, release_year, genre, director,
                duration_minutes, rating, cover_image_url, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&title.id)
        .bind(&title.name)
        .bind(&title.description)
        .bind(title.release_year)
        .bind(&title.genre)
        .bind(&title.director)
        .bind(title.duration_minutes)
        .bind(title.rating)
        .bind(&title.cover_image_url)
        .bind(title.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_title(&self, id: &str) -> DbResult<Option<Title>> {
        let sql = format!("SELECT {TITLE_COLUMNS} FROM titles WHERE id = ?1");
        let title = sqlx::query_as::<_, Title>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(title)
    }

    pub async fn count_titles(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM titles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Distinct non-empty genres, sorted.
    pub async fn genres(&self) -> DbResult<Vec<String>> {
        let genres = sqlx::query_scalar(
            "SELECT DISTINCT genre FROM titles \
             WHERE genre IS NOT NULL AND TRIM(genre) <> '' \
             ORDER BY genre",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    // -------------------------------------------------------------------------
    // Copies
    // -------------------------------------------------------------------------

    /// Adds a physical copy with no acquisition record; new copies start
    /// available.
    pub async fn insert_copy(
        &self,
        title_id: &str,
        format_id: &str,
        barcode: Option<&str>,
        condition: &str,
    ) -> DbResult<MediaCopy> {
        let copy = MediaCopy::new(title_id, format_id, barcode, condition);
        self.add_copy(&copy).await?;
        Ok(copy)
    }

    /// Stores a prepared copy, acquisition details included.
    pub async fn add_copy(&self, copy: &MediaCopy) -> DbResult<()> {
        if let Some(price) = copy.purchase_price_cents {
            validate_price_cents(price)?;
        }

        debug!(id = %copy.id, title_id = %copy.title_id, "Inserting media copy");

        let sql = format!(
            "INSERT INTO media_copies ({COPY_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        sqlx::query(&sql)
            .bind(&copy.id)
            .bind(&copy.title_id)
            .bind(&copy.format_id)
            .bind(&copy.barcode)
            .bind(copy.is_available)
            .bind(&copy.condition)
            .bind(copy.version)
            .bind(copy.purchase_date)
            .bind(copy.purchase_price_cents)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_copy(&self, id: &str) -> DbResult<Option<MediaCopy>> {
        let mut conn = self.pool.acquire().await?;
        super::inventory::fetch_copy(&mut conn, id).await
    }

    // -------------------------------------------------------------------------
    // Browse Views
    // -------------------------------------------------------------------------

    /// Catalog listing, by title name.
    pub async fn list_titles(&self, filter: &CatalogFilter) -> DbResult<Vec<TitleSummary>> {
        let filter = filter.normalized()?;

        debug!(?filter, "Listing titles");

        let sql = format!(
            "SELECT {TITLE_COLUMNS} FROM titles \
             WHERE (?1 IS NULL \
                    OR LOWER(name) LIKE ?1 \
                    OR LOWER(COALESCE(description, '')) LIKE ?1 \
                    OR LOWER(COALESCE(director, '')) LIKE ?1 \
                    OR LOWER(COALESCE(genre, '')) LIKE ?1) \
               AND (?2 IS NULL OR LOWER(genre) = LOWER(?2)) \
             ORDER BY name, id"
        );

        let titles = sqlx::query_as::<_, Title>(&sql)
            .bind(filter.like_pattern())
            .bind(&filter.genre)
            .fetch_all(&self.pool)
            .await?;

        let copy_rows = sqlx::query_as::<_, CopyRow>(&format!("{COPY_INFO_SELECT} ORDER BY f.name, c.barcode"))
            .fetch_all(&self.pool)
            .await?;

        let mut copies_by_title: HashMap<String, Vec<CopyInfo>> = HashMap::new();
        for row in copy_rows {
            copies_by_title.entry(row.title_id).or_default().push(row.info);
        }

        let summaries = titles
            .into_iter()
            .map(|title| {
                let copies = copies_by_title.remove(&title.id).unwrap_or_default();
                TitleSummary::from_copies(title, &copies)
            })
            .filter(|summary| filter.accepts(summary))
            .collect();

        Ok(summaries)
    }

    /// Title page: summary plus every copy.
    pub async fn title_details(&self, id: &str) -> DbResult<TitleDetails> {
        let title = self
            .get_title(id)
            .await?
            .ok_or_else(|| CoreError::TitleNotFound(id.to_string()))?;

        let rows = sqlx::query_as::<_, CopyRow>(&format!(
            "{COPY_INFO_SELECT} WHERE c.title_id = ?1 ORDER BY f.name, c.barcode"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TitleDetails::new(
            title,
            rows.into_iter().map(|row| row.info).collect(),
        ))
    }

    // -------------------------------------------------------------------------
    // Home Page
    // -------------------------------------------------------------------------

    /// Best rated titles first; unrated titles last.
    pub async fn popular(&self, limit: i64) -> DbResult<Vec<PopularTitle>> {
        let titles = sqlx::query_as::<_, PopularTitle>(
            r#"
            SELECT
                t.id AS title_id,
                t.name AS name,
                t.rating AS rating,
                t.genre AS genre,
                t.release_year AS release_year,
                t.cover_image_url AS cover_image_url,
                EXISTS (
                    SELECT 1 FROM media_copies c
                    WHERE c.title_id = t.id AND c.is_available = 1
                ) AS is_available
            FROM titles t
            ORDER BY t.rating IS NULL, t.rating DESC, t.name, t.id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(titles)
    }

    /// Most recently bought copies; copies without a purchase date last.
    pub async fn new_arrivals(&self, limit: i64) -> DbResult<Vec<NewArrival>> {
        let arrivals = sqlx::query_as::<_, NewArrival>(
            r#"
            SELECT
                t.id AS title_id,
                t.name AS name,
                f.name AS format_name,
                c.purchase_date AS purchase_date,
                t.cover_image_url AS cover_image_url
            FROM media_copies c
            JOIN titles t ON t.id = c.title_id
            JOIN media_formats f ON f.id = c.format_id
            ORDER BY c.purchase_date IS NULL, julianday(c.purchase_date) DESC, c.rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(arrivals)
    }

    pub async fn stats(&self) -> DbResult<StoreStats> {
        let stats = sqlx::query_as::<_, StoreStats>(
            "SELECT \
                (SELECT COUNT(*) FROM titles) AS total_titles, \
                (SELECT COUNT(*) FROM media_copies WHERE is_available = 1) AS available_copies, \
                (SELECT COUNT(*) FROM media_formats) AS total_formats",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Popular row, new arrivals row and counters, at their standard sizes.
    pub async fn home_page(&self) -> DbResult<HomePage> {
        Ok(HomePage {
            popular: self.popular(POPULAR_TITLES_LIMIT).await?,
            new_arrivals: self.new_arrivals(NEW_ARRIVALS_LIMIT).await?,
            stats: self.stats().await?,
        })
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Suggestions for a partly typed title name. A blank term suggests nothing.
    pub async fn autocomplete(&self, term: &str) -> DbResult<Vec<TitleSuggestion>> {
        let term = validate_search_query(term)?;
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let suggestions = sqlx::query_as::<_, TitleSuggestion>(
            "SELECT id, name, release_year, genre FROM titles \
             WHERE LOWER(name) LIKE ?1 \
             ORDER BY name, id \
             LIMIT ?2",
        )
        .bind(format!("%{}%", term.to_lowercase()))
        .bind(AUTOCOMPLETE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        debug!(term = %term, found = suggestions.len(), "Autocomplete");
        Ok(suggestions)
    }
}

/// A title with the common fields filled, for seeding and tests.
pub fn new_title(name: &str, genre: &str, director: &str, year: i64) -> Title {
    let mut title = Title::new(name, Utc::now());
    title.genre = Some(genre.to_string());
    title.director = Some(director.to_string());
    title.release_year = Some(year);
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use chrono::{DateTime, Duration};
    use crate::{Database, DbConfig};

    async fn catalog() -> (Database, MediaFormat, MediaFormat) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dvd = db.catalog().insert_format("DVD", 200).await.unwrap();
        let bluray = db.catalog().insert_format("Blu-Ray", 300).await.unwrap();
        (db, dvd, bluray)
    }

    #[tokio::test]
    async fn test_formats() {
        let (db, _, _) = catalog().await;

        assert_eq!(db.catalog().format_names().await.unwrap(), vec!["Blu-Ray", "DVD"]);
        assert_eq!(db.catalog().list_formats().await.unwrap().len(), 2);

        let err = db.catalog().insert_format("DVD", 250).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(db.catalog().insert_format("VHS", -1).await.is_err());
    }

    #[tokio::test]
    async fn test_title_and_copy_round_trip() {
        let (db, dvd, _) = catalog().await;
        let title = new_title("Alien", "Horror", "Ridley Scott", 1979);
        db.catalog().insert_title(&title).await.unwrap();

        let loaded = db.catalog().get_title(&title.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Alien");
        assert_eq!(loaded.release_year, Some(1979));

        let copy = db
            .catalog()
            .insert_copy(&title.id, &dvd.id, Some("ALN-001"), "Good")
            .await
            .unwrap();
        let loaded = db.catalog().get_copy(&copy.id).await.unwrap().unwrap();
        assert_eq!(loaded, copy);

        assert!(db.catalog().get_title("missing").await.unwrap().is_none());
        assert!(db
            .catalog()
            .insert_copy("missing", &dvd.id, None, "Good")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_titles_filters() {
        let (db, dvd, bluray) = catalog().await;
        let alien = new_title("Alien", "Horror", "Ridley Scott", 1979);
        let heat = new_title("Heat", "Crime", "Michael Mann", 1995);
        let mut thing = new_title("The Thing", "Horror", "John Carpenter", 1982);
        thing.description = Some("Antarctic research station".to_string());
        for t in [&alien, &heat, &thing] {
            db.catalog().insert_title(t).await.unwrap();
        }

        db.catalog().insert_copy(&alien.id, &dvd.id, None, "Good").await.unwrap();
        db.catalog().insert_copy(&alien.id, &bluray.id, None, "Good").await.unwrap();
        db.catalog().insert_copy(&heat.id, &bluray.id, None, "Worn").await.unwrap();

        let all = db.catalog().list_titles(&CatalogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title.name, "Alien");
        assert_eq!(all[0].available_formats, vec!["Blu-Ray", "DVD"]);
        assert_eq!(all[0].format_prices["DVD"], 200);
        assert!(!all[2].is_available);

        let horror = db
            .catalog()
            .list_titles(&CatalogFilter::default().genre("horror"))
            .await
            .unwrap();
        assert_eq!(horror.len(), 2);

        let by_text = db
            .catalog()
            .list_titles(&CatalogFilter::default().query("ANTARCTIC"))
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].title.id, thing.id);

        let by_director = db
            .catalog()
            .list_titles(&CatalogFilter::default().query("mann"))
            .await
            .unwrap();
        assert_eq!(by_director[0].title.id, heat.id);

        let dvds = db
            .catalog()
            .list_titles(&CatalogFilter::default().format("DVD"))
            .await
            .unwrap();
        assert_eq!(dvds.len(), 1);
        assert_eq!(dvds[0].title.id, alien.id);

        assert_eq!(db.catalog().genres().await.unwrap(), vec!["Crime", "Horror"]);
    }

    #[tokio::test]
    async fn test_title_details() {
        let (db, dvd, _) = catalog().await;
        let title = new_title("Heat", "Crime", "Michael Mann", 1995);
        db.catalog().insert_title(&title).await.unwrap();
        db.catalog().insert_copy(&title.id, &dvd.id, Some("HT-1"), "Good").await.unwrap();
        db.catalog().insert_copy(&title.id, &dvd.id, Some("HT-2"), "Worn").await.unwrap();

        let details = db.catalog().title_details(&title.id).await.unwrap();
        assert_eq!(details.copies.len(), 2);
        assert_eq!(details.summary.available_copies, 2);
        assert_eq!(details.copies[0].barcode.as_deref(), Some("HT-1"));
        assert_eq!(details.copies[1].condition, "Worn");

        let err = db.catalog().title_details("missing").await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::TitleNotFound(_))));
    }

    #[tokio::test]
    async fn test_copy_acquisition_round_trip() {
        let (db, dvd, _) = catalog().await;
        let title = new_title("Solaris", "Sci-Fi", "Andrei Tarkovsky", 1972);
        db.catalog().insert_title(&title).await.unwrap();

        let bought: DateTime<Utc> = "2025-11-03T09:30:00.25Z".parse().unwrap();
        let copy = MediaCopy::new(&title.id, &dvd.id, Some("SOL-001"), "Good").acquired(bought, Some(1499));
        db.catalog().add_copy(&copy).await.unwrap();

        let loaded = db.catalog().get_copy(&copy.id).await.unwrap().unwrap();
        assert_eq!(loaded.purchase_date, Some(bought));
        assert_eq!(loaded.purchase_price_cents, Some(1499));
        assert_eq!(loaded, copy);

        let bad = MediaCopy::new(&title.id, &dvd.id, None, "Good").acquired(bought, Some(-5));
        assert!(db.catalog().add_copy(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_home_page() {
        let (db, dvd, bluray) = catalog().await;
        let base: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();

        let mut titles = Vec::new();
        for (i, (name, rating)) in [
            ("Alien", Some(8.5)),
            ("Heat", Some(8.3)),
            ("Jaws", Some(8.1)),
            ("Fargo", Some(8.1)),
            ("Solaris", None),
            ("Stalker", Some(8.2)),
            ("The Thing", Some(8.2)),
            ("Casablanca", Some(8.6)),
        ]
        .into_iter()
        .enumerate()
        {
            let mut title = new_title(name, "Drama", "Someone", 1980 + i as i64);
            title.rating = rating;
            db.catalog().insert_title(&title).await.unwrap();
            titles.push(title);
        }

        // one copy each, bought a day apart; Alien's copy has no purchase date
        for (i, title) in titles.iter().enumerate() {
            let format = if i % 2 == 0 { &dvd.id } else { &bluray.id };
            let copy = MediaCopy::new(&title.id, format, None, "Good");
            let copy = if i == 0 {
                copy
            } else {
                copy.acquired(base + Duration::days(i as i64), None)
            };
            db.catalog().add_copy(&copy).await.unwrap();
        }
        let heat_copy = db.inventory().available_copies(&titles[1].id).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        crate::repository::inventory::claim(&mut conn, &heat_copy[0].id).await.unwrap();
        drop(conn);

        let home = db.catalog().home_page().await.unwrap();

        let popular: Vec<&str> = home.popular.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(popular, vec!["Casablanca", "Alien", "Heat", "Stalker", "The Thing", "Fargo"]);
        assert!(home.popular[0].is_available);
        assert!(!home.popular[2].is_available);
        assert_eq!(home.popular[0].cover_image(), reel_core::DEFAULT_COVER_IMAGE_URL);

        assert_eq!(home.new_arrivals.len(), 8);
        assert_eq!(home.new_arrivals[0].name, "Casablanca");
        assert_eq!(home.new_arrivals[0].format_name, "Blu-Ray");
        assert_eq!(home.new_arrivals[0].purchase_date, Some(base + Duration::days(7)));
        assert_eq!(home.new_arrivals[7].name, "Alien");
        assert_eq!(home.new_arrivals[7].purchase_date, None);

        let latest: Vec<String> = db
            .catalog()
            .new_arrivals(3)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(latest, vec!["Casablanca", "The Thing", "Stalker"]);

        assert_eq!(
            home.stats,
            StoreStats {
                total_titles: 8,
                available_copies: 7,
                total_formats: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_autocomplete() {
        let (db, _, _) = catalog().await;
        let mut matrix = new_title("The Matrix", "Sci-Fi", "Lana Wachowski", 1999);
        matrix.description = Some("Not a thing about alien ships".to_string());
        db.catalog().insert_title(&matrix).await.unwrap();
        for i in 0..12 {
            let title = new_title(&format!("Alien {i:02}"), "Horror", "Ridley Scott", 1979);
            db.catalog().insert_title(&title).await.unwrap();
        }

        let found = db.catalog().autocomplete("  ALIEN ").await.unwrap();
        assert_eq!(found.len(), 10);
        assert_eq!(found[0].name, "Alien 00");
        assert!(found.iter().all(|s| s.id != matrix.id));

        let found = db.catalog().autocomplete("matr").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].release_year, Some(1999));
        assert_eq!(found[0].genre.as_deref(), Some("Sci-Fi"));

        assert!(db.catalog().autocomplete("   ").await.unwrap().is_empty());
        assert!(db.catalog().autocomplete(&"x".repeat(101)).await.is_err());
    }
}
