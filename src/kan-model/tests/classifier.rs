use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use kan_model::activations::Activation;
use kan_model::layers::{Conv2D, Dense, Flatten, MaxPooling2D, Padding};
use kan_model::model::{INPUT_SIZE, NUM_CLASSES};
use kan_model::{Error, KanModel, ModelSource, Sequential};
use ndarray::{Array, Array1, Array2, Array4};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn png(width: u32, height: u32) -> Vec<u8> {
    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Small network with the same input contract as the Kan CNN.
fn tiny_network() -> Sequential {
    let mut model = Sequential::new("tiny".to_string());

    let kernel = Array4::from_shape_fn((3, 3, 3, 1), |(kh, kw, c, _)| {
        0.05 * (kh as f32 - 1.0) + 0.02 * kw as f32 - 0.03 * c as f32
    });
    model.add(
        Conv2D::new(
            "conv".to_string(),
            (1, 1),
            Padding::Valid,
            kernel,
            Some(Array1::from_elem(1, 0.1)),
            Activation::ReLU,
        )
        .unwrap(),
    );
    model.add(MaxPooling2D::new("pool".to_string(), (8, 8), None, Padding::Valid).unwrap());
    model.add(Flatten::new("flatten".to_string()));

    let side = (INPUT_SIZE - 2) / 8;
    let weights: Array2<f32> = Array::from_shape_fn((side * side, NUM_CLASSES), |(i, j)| {
        ((i * 31 + j * 17) % 23) as f32 / 230.0 - 0.05
    });
    model.add(
        Dense::new(
            "classes".to_string(),
            weights,
            Some(Array1::zeros(NUM_CLASSES)),
            Activation::Softmax,
        )
        .unwrap(),
    );

    model
}

#[test]
fn falls_back_to_a_fresh_network_without_a_usable_path() {
    let model = KanModel::new(None).unwrap();
    assert_eq!(model.source(), Some(&ModelSource::Created));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.kan");
    let model = KanModel::new(Some(&missing)).unwrap();
    assert_eq!(model.source(), Some(&ModelSource::Created));
    assert!(model.is_initialized());
}

#[test]
fn fresh_network_classifies_into_ten_classes() {
    let mut rng = StdRng::seed_from_u64(42);
    let model = KanModel::create_with_rng(&mut rng).unwrap();

    let network = model.network().unwrap();
    assert_eq!(network.num_layers(), 7);
    assert_eq!(
        network.output_shape(&[1, INPUT_SIZE, INPUT_SIZE, 3]).unwrap(),
        vec![1, NUM_CLASSES]
    );

    let prediction = model.predict(&png(300, 200)).unwrap();
    assert!(prediction.class_index < NUM_CLASSES);
    assert!(prediction.confidence >= 1.0 / NUM_CLASSES as f32 - 1e-6);
    assert!(prediction.confidence <= 1.0);
}

#[test]
fn saved_network_is_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.kan");

    let original = KanModel::from_sequential(tiny_network()).unwrap();
    original.save(&path).unwrap();

    let loaded = KanModel::new(Some(&path)).unwrap();
    assert_eq!(loaded.source(), Some(&ModelSource::Loaded(path.clone())));

    let image = png(64, 48);
    assert_eq!(
        original.predict(&image).unwrap(),
        loaded.predict(&image).unwrap()
    );
}

#[test]
fn corrupt_model_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.kan");
    std::fs::write(&path, b"KANM but not really").unwrap();

    assert!(matches!(
        KanModel::new(Some(&path)),
        Err(Error::ModelLoad(_))
    ));
}

#[test]
fn undecodable_upload_is_reported() {
    let model = KanModel::from_sequential(tiny_network()).unwrap();
    assert!(matches!(
        model.predict(&[0xff, 0xd8, 0x00]),
        Err(Error::ImageDecode(_))
    ));
}

#[test]
fn prediction_serialises_with_snake_case_keys() {
    let model = KanModel::from_sequential(tiny_network()).unwrap();
    let prediction = model.predict(&png(10, 10)).unwrap();

    let json = serde_json::to_value(prediction).unwrap();
    assert_eq!(json["class_index"], prediction.class_index);
    assert!(json["confidence"].is_number());
}
