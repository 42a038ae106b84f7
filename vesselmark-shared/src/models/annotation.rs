/// Vessel annotation trees
///
/// An annotation is a set of points and the segments connecting them, drawn
/// over one image and keyed by an image path string. Points carry the
/// client-assigned index that segments refer to; segments are stored in
/// submission order.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE vessel_annotations (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     image_path TEXT NOT NULL,
///     author_id INTEGER NOT NULL REFERENCES users(id),
///     created_at TEXT NOT NULL
/// );
///
/// CREATE TABLE vessel_points (
///     annotation_id INTEGER NOT NULL,
///     point_index INTEGER NOT NULL,
///     x REAL NOT NULL,
///     y REAL NOT NULL,
///     PRIMARY KEY (annotation_id, point_index)
/// );
///
/// CREATE TABLE vessel_segments (
///     annotation_id INTEGER NOT NULL,
///     segment_index INTEGER NOT NULL,
///     start_point INTEGER NOT NULL,
///     end_point INTEGER NOT NULL,
///     thickness REAL NOT NULL,
///     is_visible INTEGER NOT NULL DEFAULT 1,
///     PRIMARY KEY (annotation_id, segment_index)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Annotation header row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VesselAnnotation {
    pub id: i64,
    pub image_path: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A point of the vessel tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VesselPoint {
    /// Client-assigned index, unique within one annotation
    #[serde(rename = "index")]
    pub point_index: i64,
    pub x: f64,
    pub y: f64,
}

/// A segment connecting two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VesselSegment {
    pub start_point: i64,
    pub end_point: i64,
    pub thickness: f64,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Listing row for the annotations of one image
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnnotationSummary {
    pub id: i64,
    pub image_path: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub point_count: i64,
    pub segment_count: i64,
}

impl VesselAnnotation {
    /// Writes an annotation with all its points and segments
    ///
    /// Runs in one transaction and returns the header row together with the
    /// total number of rows written.
    pub async fn insert_tree(
        pool: &SqlitePool,
        image_path: &str,
        author_id: i64,
        points: &[VesselPoint],
        segments: &[VesselSegment],
    ) -> Result<(Self, u64), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let annotation = sqlx::query_as::<_, VesselAnnotation>(
            r#"
            INSERT INTO vessel_annotations (image_path, author_id, created_at)
            VALUES (?, ?, ?)
            RETURNING id, image_path, author_id, created_at
            "#,
        )
        .bind(image_path)
        .bind(author_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let mut rows: u64 = 1;

        for point in points {
            rows += sqlx::query(
                "INSERT INTO vessel_points (annotation_id, point_index, x, y) VALUES (?, ?, ?, ?)",
            )
            .bind(annotation.id)
            .bind(point.point_index)
            .bind(point.x)
            .bind(point.y)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for (index, segment) in segments.iter().enumerate() {
            rows += sqlx::query(
                r#"
                INSERT INTO vessel_segments
                    (annotation_id, segment_index, start_point, end_point, thickness, is_visible)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(annotation.id)
            .bind(index as i64)
            .bind(segment.start_point)
            .bind(segment.end_point)
            .bind(segment.thickness)
            .bind(segment.is_visible)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok((annotation, rows))
    }

    /// Finds an annotation header by id
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, VesselAnnotation>(
            "SELECT id, image_path, author_id, created_at FROM vessel_annotations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Points of an annotation ordered by index
    pub async fn points(pool: &SqlitePool, id: i64) -> Result<Vec<VesselPoint>, sqlx::Error> {
        sqlx::query_as::<_, VesselPoint>(
            "SELECT point_index, x, y FROM vessel_points WHERE annotation_id = ? ORDER BY point_index",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    /// Segments of an annotation in submission order
    pub async fn segments(pool: &SqlitePool, id: i64) -> Result<Vec<VesselSegment>, sqlx::Error> {
        sqlx::query_as::<_, VesselSegment>(
            r#"
            SELECT start_point, end_point, thickness, is_visible
            FROM vessel_segments
            WHERE annotation_id = ?
            ORDER BY segment_index
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    /// Summaries of every annotation drawn on `image_path`, newest first
    pub async fn list_for_image(
        pool: &SqlitePool,
        image_path: &str,
    ) -> Result<Vec<AnnotationSummary>, sqlx::Error> {
        sqlx::query_as::<_, AnnotationSummary>(
            r#"
            SELECT a.id, a.image_path, a.author_id, a.created_at,
                   (SELECT COUNT(*) FROM vessel_points p WHERE p.annotation_id = a.id) AS point_count,
                   (SELECT COUNT(*) FROM vessel_segments s WHERE s.annotation_id = a.id) AS segment_count
            FROM vessel_annotations a
            WHERE a.image_path = ?
            ORDER BY a.id DESC
            "#,
        )
        .bind(image_path)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_visibility_defaults_to_true() {
        let segment: VesselSegment =
            serde_json::from_str(r#"{"start_point":0,"end_point":1,"thickness":1.5}"#).unwrap();
        assert!(segment.is_visible);
    }

    #[test]
    fn test_point_uses_index_on_the_wire() {
        let point = VesselPoint {
            point_index: 3,
            x: 1.0,
            y: 2.0,
        };
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["index"], 3);
    }
}
