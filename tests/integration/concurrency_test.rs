// Concurrent Composition Integration Tests
//
// One compositor shared between tasks:
// - Simultaneous compositions all succeed and match sequential output
// - Logo bitmaps are cached across compositions
// - Out-of-order preview results are arbitrated latest-wins

use super::test_harness::*;
use futures::future::join_all;
use photo_watermark::watermark::{
    CompositionRequest, CompositionResult, ImageWatermark, PlacementSpec, PreviewSession,
    TextWatermark, WatermarkPosition, WatermarkSpec,
};
use std::sync::Arc;

fn request_for(position: WatermarkPosition) -> CompositionRequest {
    CompositionRequest::new(
        WatermarkSpec::text(TextWatermark::new(position.as_str())),
        PlacementSpec::new(position, 2, 2),
    )
    .with_base_image(png_source(&gradient(160, 120)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_compositions_match_sequential() {
    let compositor = Arc::new(compositor());

    let mut sequential = Vec::new();
    for position in WatermarkPosition::ALL {
        let encoded = compositor.compose(&request_for(position)).await.unwrap();
        sequential.push(encoded);
    }

    let handles = WatermarkPosition::ALL.into_iter().map(|position| {
        let compositor = Arc::clone(&compositor);
        tokio::spawn(async move { compositor.compose(&request_for(position)).await })
    });
    let concurrent = join_all(handles).await;

    assert_eq!(concurrent.len(), sequential.len());
    for (joined, expected) in concurrent.into_iter().zip(sequential) {
        let encoded = joined.expect("task panicked").expect("composition failed");
        assert_eq!(encoded, expected);
    }
}

#[tokio::test]
async fn test_logo_is_cached_between_compositions() {
    let compositor = compositor_with_canvas(200, 200);
    let logo = png_source(&solid(12, 12, [0, 128, 0, 255]));

    assert!(!compositor.loader().is_cached(&logo).await);

    let request = CompositionRequest::new(
        WatermarkSpec::image(ImageWatermark::new(logo.clone())),
        PlacementSpec::single(WatermarkPosition::TopRight),
    );
    let first = compositor.compose(&request).await.unwrap();
    assert!(compositor.loader().is_cached(&logo).await);

    let second = compositor.compose(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_callback_invoked_once_per_composition() {
    let compositor = compositor_with_canvas(64, 64);
    let mut results: Vec<CompositionResult> = Vec::new();

    for text in ["one", "two"] {
        let request = CompositionRequest::new(
            WatermarkSpec::text(TextWatermark::new(text)),
            PlacementSpec::default(),
        );
        compositor
            .compose_with_callback(&request, |result| results.push(result))
            .await;
    }

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success && r.encoded_image.is_some()));
}

#[tokio::test]
async fn test_preview_session_discards_stale_results() {
    let compositor = Arc::new(compositor_with_canvas(64, 64));
    let session = PreviewSession::new();

    let slow_id = session.begin();
    let fast_id = session.begin();

    let slow_request = CompositionRequest::new(
        WatermarkSpec::text(TextWatermark::new("slow")),
        PlacementSpec::default(),
    );
    let fast_request = CompositionRequest::new(
        WatermarkSpec::text(TextWatermark::new("")),
        PlacementSpec::default(),
    );

    // The newer run finishes first
    let fast = CompositionResult::from(compositor.compose(&fast_request).await);
    let slow = CompositionResult::from(compositor.compose(&slow_request).await);

    assert!(session.complete(fast_id, fast.clone()));
    assert!(!session.complete(slow_id, slow));
    assert_eq!(session.latest(), Some(fast));
    assert_eq!(session.latest_id(), Some(fast_id));
}
