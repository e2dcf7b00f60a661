use crate::classifier::Classifier;
use crate::model::{Architecture, BundleConfig};
use axum::http::header;
use axum::routing::get;
use axum::Router;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

/// ResNet-18 with all-zero weights: every class scores the same.
pub fn zero_classifier(vocab: &[&str]) -> Classifier {
    let mut config = BundleConfig::new(
        Architecture::Resnet18,
        vocab.iter().map(|s| s.to_string()).collect(),
    );
    config.image_size = 32;
    Classifier::new(config, VarBuilder::zeros(DType::F32, &Device::Cpu)).unwrap()
}

/// Serves `/cat.png`, `/notes.txt`, `/big.bin` and `/slow.png` (answers
/// after two seconds) on an ephemeral port; everything else is 404.
/// Returns the base URL.
pub async fn spawn_image_host() -> String {
    let png = png_bytes(48, 48);
    let slow_png = png.clone();
    let app = Router::new()
        .route(
            "/cat.png",
            get(move || {
                let png = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], png) }
            }),
        )
        .route(
            "/notes.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "just some text") }),
        )
        .route("/big.bin", get(|| async { vec![0u8; 4096] }))
        .route(
            "/slow.png",
            get(move || {
                let png = slow_png.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    ([(header::CONTENT_TYPE, "image/png")], png)
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
