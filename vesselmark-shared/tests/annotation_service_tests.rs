/// Integration tests for vessel annotation trees
///
/// Run with: cargo test --test annotation_service_tests

mod common;

use common::{create_user, test_pool};
use vesselmark_shared::models::annotation::{VesselPoint, VesselSegment};
use vesselmark_shared::services::{annotation::VesselTree, AnnotationService, ServiceError};

fn sample_tree(image_path: &str) -> VesselTree {
    VesselTree {
        image_path: image_path.to_string(),
        points: vec![
            VesselPoint { point_index: 0, x: 10.0, y: 10.0 },
            VesselPoint { point_index: 1, x: 42.5, y: 18.0 },
            VesselPoint { point_index: 2, x: 60.0, y: 33.25 },
        ],
        segments: vec![
            VesselSegment { start_point: 0, end_point: 1, thickness: 3.0, is_visible: true },
            VesselSegment { start_point: 1, end_point: 2, thickness: 1.5, is_visible: false },
        ],
    }
}

#[tokio::test]
async fn test_save_and_get_round_trip() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = AnnotationService::new(pool);

    let tree = sample_tree("retina/0001.png");
    let saved = service.save(&user, tree.clone()).await.unwrap();

    // header + 3 points + 2 segments
    assert_eq!(saved.rows_written, 6);

    let stored = service.get(saved.id).await.unwrap();
    assert_eq!(stored.image_path, "retina/0001.png");
    assert_eq!(stored.author_id, user.id);
    assert_eq!(stored.points, tree.points);
    assert_eq!(stored.segments, tree.segments);
}

#[tokio::test]
async fn test_save_empty_tree_writes_header_only() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = AnnotationService::new(pool);

    let saved = service
        .save(
            &user,
            VesselTree {
                image_path: "retina/0002.png".to_string(),
                points: vec![],
                segments: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.rows_written, 1);

    let stored = service.get(saved.id).await.unwrap();
    assert!(stored.points.is_empty());
    assert!(stored.segments.is_empty());
}

#[tokio::test]
async fn test_unknown_endpoint_is_rejected_and_nothing_written() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = AnnotationService::new(pool.clone());

    let mut tree = sample_tree("retina/0003.png");
    tree.segments.push(VesselSegment {
        start_point: 2,
        end_point: 9,
        thickness: 1.0,
        is_visible: true,
    });

    let result = service.save(&user, tree).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vessel_annotations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let pool = test_pool().await.unwrap();
    let service = AnnotationService::new(pool);

    let result = service.get(12345).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_list_for_image_newest_first() {
    let pool = test_pool().await.unwrap();
    let alice = create_user(&pool, "oidc|alice").await.unwrap();
    let bob = create_user(&pool, "oidc|bob").await.unwrap();
    let service = AnnotationService::new(pool);

    let first = service.save(&alice, sample_tree("retina/0004.png")).await.unwrap();
    let second = service.save(&bob, sample_tree("retina/0004.png")).await.unwrap();
    service.save(&bob, sample_tree("retina/0005.png")).await.unwrap();

    let summaries = service.list_for_image("retina/0004.png").await.unwrap();
    let ids: Vec<i64> = summaries.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(summaries[0].author_id, bob.id);
    assert_eq!(summaries[0].point_count, 3);
    assert_eq!(summaries[0].segment_count, 2);

    assert!(service.list_for_image("retina/none.png").await.unwrap().is_empty());

    let blank = service.list_for_image("  ").await;
    assert!(matches!(blank, Err(ServiceError::BadRequest(_))));
}
