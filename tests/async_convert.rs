#![cfg(feature = "async")]

mod common;

use adftiff::adf::DecodeOptions;
use adftiff::encode::{EncodeOptions, GeoTiffReader};
use adftiff::pipeline::convert_dir_async;
use common::GridLayout;

#[tokio::test]
async fn converts_directory_on_blocking_pool() {
    let layout = GridLayout::float((5, 3), (4, 4));
    let values: Vec<f32> = (0..15).map(|v| v as f32).collect();
    let files = layout.build_float(&values, -f32::MAX);

    let dir = std::env::temp_dir().join(format!("adftiff-async-{}", std::process::id()));
    let _ = tokio::fs::remove_dir_all(&dir).await;
    tokio::fs::create_dir_all(&dir).await.unwrap();
    for name in files.names() {
        tokio::fs::write(dir.join(name), files.get(name).unwrap())
            .await
            .unwrap();
    }

    let output = convert_dir_async(
        &dir,
        DecodeOptions::new(),
        EncodeOptions::new().with_tile_size(4),
    )
    .await
    .unwrap();
    assert_eq!(output.tiles_written, 2);

    let reader = GeoTiffReader::open(&output.bytes).unwrap();
    assert_eq!(reader.dimensions(), (5, 3));
    assert_eq!(reader.read_tile((1, 0)).unwrap().get(0, 2), Some(14.0));
    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
