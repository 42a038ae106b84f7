/// Vessel annotation trees
///
/// A tree is saved whole, in one transaction. Segments refer to points by the
/// client-assigned point index, so every endpoint must name a point submitted
/// in the same request.

use super::{ServiceError, ServiceResult};
use crate::models::{
    annotation::{AnnotationSummary, VesselAnnotation, VesselPoint, VesselSegment},
    user::User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;

/// A vessel tree as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselTree {
    /// Image the tree was drawn on
    pub image_path: String,

    #[serde(default)]
    pub points: Vec<VesselPoint>,

    #[serde(default)]
    pub segments: Vec<VesselSegment>,
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SavedAnnotation {
    pub id: i64,
    pub rows_written: u64,
}

/// A stored tree with its header fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationDetail {
    pub id: i64,
    pub image_path: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub points: Vec<VesselPoint>,
    pub segments: Vec<VesselSegment>,
}

impl VesselTree {
    /// Checks the tree for structural problems
    ///
    /// Returns the first problem found as a message.
    pub fn check(&self) -> Result<(), String> {
        if self.image_path.trim().is_empty() {
            return Err("Image path is required".to_string());
        }

        let mut indices = HashSet::with_capacity(self.points.len());
        for point in &self.points {
            if !indices.insert(point.point_index) {
                return Err(format!("Point index {} appears more than once", point.point_index));
            }
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(format!("Point {} has non-finite coordinates", point.point_index));
            }
        }

        for (position, segment) in self.segments.iter().enumerate() {
            if !segment.thickness.is_finite() || segment.thickness < 0.0 {
                return Err(format!(
                    "Segment {} thickness must be a finite, non-negative number",
                    position
                ));
            }
            for endpoint in [segment.start_point, segment.end_point] {
                if !indices.contains(&endpoint) {
                    return Err(format!(
                        "Segment {} references unknown point {}",
                        position, endpoint
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Annotation operations over the database
#[derive(Debug, Clone)]
pub struct AnnotationService {
    db: SqlitePool,
}

impl AnnotationService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Persists a tree authored by `author`
    ///
    /// # Errors
    ///
    /// `BadRequest` if the tree fails [`VesselTree::check`]; nothing is
    /// written in that case.
    pub async fn save(&self, author: &User, tree: VesselTree) -> ServiceResult<SavedAnnotation> {
        tree.check().map_err(ServiceError::BadRequest)?;

        let (annotation, rows_written) = VesselAnnotation::insert_tree(
            &self.db,
            tree.image_path.trim(),
            author.id,
            &tree.points,
            &tree.segments,
        )
        .await?;

        info!(
            annotation_id = annotation.id,
            author_id = author.id,
            points = tree.points.len(),
            segments = tree.segments.len(),
            "Annotation saved"
        );

        Ok(SavedAnnotation {
            id: annotation.id,
            rows_written,
        })
    }

    /// A stored tree by id
    ///
    /// # Errors
    ///
    /// `NotFound` if no annotation has this id
    pub async fn get(&self, id: i64) -> ServiceResult<AnnotationDetail> {
        let annotation = VesselAnnotation::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Annotation {} not found", id)))?;

        let points = VesselAnnotation::points(&self.db, id).await?;
        let segments = VesselAnnotation::segments(&self.db, id).await?;

        Ok(AnnotationDetail {
            id: annotation.id,
            image_path: annotation.image_path,
            author_id: annotation.author_id,
            created_at: annotation.created_at,
            points,
            segments,
        })
    }

    /// Summaries of all trees drawn on `image_path`, newest first
    pub async fn list_for_image(&self, image_path: &str) -> ServiceResult<Vec<AnnotationSummary>> {
        let image_path = image_path.trim();
        if image_path.is_empty() {
            return Err(ServiceError::BadRequest("Image path is required".to_string()));
        }

        Ok(VesselAnnotation::list_for_image(&self.db, image_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(index: i64, x: f64, y: f64) -> VesselPoint {
        VesselPoint {
            point_index: index,
            x,
            y,
        }
    }

    fn segment(start: i64, end: i64, thickness: f64) -> VesselSegment {
        VesselSegment {
            start_point: start,
            end_point: end,
            thickness,
            is_visible: true,
        }
    }

    fn tree(points: Vec<VesselPoint>, segments: Vec<VesselSegment>) -> VesselTree {
        VesselTree {
            image_path: "retina/0001.png".to_string(),
            points,
            segments,
        }
    }

    #[test]
    fn test_valid_tree() {
        let tree = tree(
            vec![point(0, 0.0, 0.0), point(1, 10.0, 5.0), point(2, 12.0, 9.0)],
            vec![segment(0, 1, 2.0), segment(1, 2, 1.5)],
        );
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_empty_tree_is_valid() {
        assert!(tree(vec![], vec![]).check().is_ok());
    }

    #[test]
    fn test_blank_image_path() {
        let mut tree = tree(vec![], vec![]);
        tree.image_path = "   ".to_string();
        assert_eq!(tree.check().unwrap_err(), "Image path is required");
    }

    #[test]
    fn test_duplicate_point_index() {
        let tree = tree(vec![point(0, 0.0, 0.0), point(0, 1.0, 1.0)], vec![]);
        assert!(tree.check().unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_unknown_endpoint() {
        let tree = tree(vec![point(0, 0.0, 0.0)], vec![segment(0, 7, 1.0)]);
        assert_eq!(tree.check().unwrap_err(), "Segment 0 references unknown point 7");
    }

    #[test]
    fn test_bad_numbers() {
        let nan_point = tree(vec![point(0, f64::NAN, 0.0)], vec![]);
        assert!(nan_point.check().is_err());

        let negative = tree(
            vec![point(0, 0.0, 0.0), point(1, 1.0, 1.0)],
            vec![segment(0, 1, -0.5)],
        );
        assert!(negative.check().is_err());

        let infinite = tree(
            vec![point(0, 0.0, 0.0), point(1, 1.0, 1.0)],
            vec![segment(0, 1, f64::INFINITY)],
        );
        assert!(infinite.check().is_err());
    }
}
