//! The fixed Kan image classifier.
//!
//! `Conv2D(32, 3x3) → MaxPool(2x2) → Conv2D(64, 3x3) → MaxPool(2x2) →
//! Flatten → Dense(128) → Dense(10, softmax)` over a `224x224x3` input.
//! Weights are Glorot-uniform and nothing is trained.

use ndarray::{Array, Array1, Dimension, ShapeBuilder};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use super::Sequential;
use crate::activations::Activation;
use crate::layers::{Conv2D, Dense, Flatten, MaxPooling2D, Padding};
use crate::Result;

pub const INPUT_SIZE: usize = 224;
pub const INPUT_CHANNELS: usize = 3;
pub const NUM_CLASSES: usize = 10;

const CONV1_FILTERS: usize = 32;
const CONV2_FILTERS: usize = 64;
const KERNEL: usize = 3;
const POOL: usize = 2;
const HIDDEN_UNITS: usize = 128;

/// Input shape the classifier is built for, batch dimension included.
pub fn input_shape() -> Vec<usize> {
    vec![1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS]
}

pub fn build_kan_cnn<R: Rng + ?Sized>(rng: &mut R) -> Result<Sequential> {
    let mut model = Sequential::new("kan_cnn".to_string());
    model.set_input_shape(input_shape());

    model.add(Conv2D::new(
        "conv2d".to_string(),
        (1, 1),
        Padding::Valid,
        glorot_uniform(
            rng,
            (KERNEL, KERNEL, INPUT_CHANNELS, CONV1_FILTERS),
            KERNEL * KERNEL * INPUT_CHANNELS,
            KERNEL * KERNEL * CONV1_FILTERS,
        ),
        Some(Array1::zeros(CONV1_FILTERS)),
        Activation::ReLU,
    )?);
    model.add(MaxPooling2D::new(
        "max_pooling2d".to_string(),
        (POOL, POOL),
        None,
        Padding::Valid,
    )?);

    model.add(Conv2D::new(
        "conv2d_1".to_string(),
        (1, 1),
        Padding::Valid,
        glorot_uniform(
            rng,
            (KERNEL, KERNEL, CONV1_FILTERS, CONV2_FILTERS),
            KERNEL * KERNEL * CONV1_FILTERS,
            KERNEL * KERNEL * CONV2_FILTERS,
        ),
        Some(Array1::zeros(CONV2_FILTERS)),
        Activation::ReLU,
    )?);
    model.add(MaxPooling2D::new(
        "max_pooling2d_1".to_string(),
        (POOL, POOL),
        None,
        Padding::Valid,
    )?);

    model.add(Flatten::new("flatten".to_string()));

    let flat = flattened_features();
    model.add(Dense::new(
        "dense".to_string(),
        glorot_uniform(rng, (flat, HIDDEN_UNITS), flat, HIDDEN_UNITS),
        Some(Array1::zeros(HIDDEN_UNITS)),
        Activation::ReLU,
    )?);
    model.add(Dense::new(
        "dense_1".to_string(),
        glorot_uniform(rng, (HIDDEN_UNITS, NUM_CLASSES), HIDDEN_UNITS, NUM_CLASSES),
        Some(Array1::zeros(NUM_CLASSES)),
        Activation::Softmax,
    )?);

    Ok(model)
}

/// Features entering the hidden dense layer: two valid 3x3 convolutions,
/// each followed by a 2x2 pool.
fn flattened_features() -> usize {
    let after_block = |size: usize| (size - (KERNEL - 1)) / POOL;
    let side = after_block(after_block(INPUT_SIZE));
    side * side * CONV2_FILTERS
}

fn glorot_uniform<R, Sh, D>(rng: &mut R, shape: Sh, fan_in: usize, fan_out: usize) -> Array<f32, D>
where
    R: Rng + ?Sized,
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
{
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array::from_shape_fn(shape, |_| dist.sample(&mut *rng))
}
