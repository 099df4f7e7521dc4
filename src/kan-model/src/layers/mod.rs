pub mod conv2d;
pub mod dense;
pub mod flatten;
pub mod pooling;

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Tensor};

pub use conv2d::Conv2D;
pub use dense::Dense;
pub use flatten::Flatten;
pub use pooling::{MaxPooling2D, Padding};

pub trait Layer: std::fmt::Debug + Send + Sync {
    fn forward(&self, input: &Tensor) -> Result<Tensor>;
    fn name(&self) -> &str;
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>>;
}

/// Closed set of layers a saved model may contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LayerKind {
    Conv2D(Conv2D),
    MaxPooling2D(MaxPooling2D),
    Flatten(Flatten),
    Dense(Dense),
}

impl LayerKind {
    fn inner(&self) -> &dyn Layer {
        match self {
            LayerKind::Conv2D(l) => l,
            LayerKind::MaxPooling2D(l) => l,
            LayerKind::Flatten(l) => l,
            LayerKind::Dense(l) => l,
        }
    }

    /// Re-checks the invariants the constructors enforce, for layers that
    /// were deserialized rather than built.
    pub fn validate(&self) -> Result<()> {
        match self {
            LayerKind::Conv2D(l) => l.validate(),
            LayerKind::MaxPooling2D(l) => l.validate(),
            LayerKind::Flatten(_) => Ok(()),
            LayerKind::Dense(l) => l.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LayerKind::Conv2D(_) => "Conv2D",
            LayerKind::MaxPooling2D(_) => "MaxPooling2D",
            LayerKind::Flatten(_) => "Flatten",
            LayerKind::Dense(_) => "Dense",
        }
    }
}

impl Layer for LayerKind {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        self.inner().forward(input)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        self.inner().output_shape(input_shape)
    }
}

impl From<Conv2D> for LayerKind {
    fn from(layer: Conv2D) -> Self {
        LayerKind::Conv2D(layer)
    }
}

impl From<MaxPooling2D> for LayerKind {
    fn from(layer: MaxPooling2D) -> Self {
        LayerKind::MaxPooling2D(layer)
    }
}

impl From<Flatten> for LayerKind {
    fn from(layer: Flatten) -> Self {
        LayerKind::Flatten(layer)
    }
}

impl From<Dense> for LayerKind {
    fn from(layer: Dense) -> Self {
        LayerKind::Dense(layer)
    }
}

/// Splits an NHWC shape into `(batch, height, width, channels, is_batched)`.
pub(crate) fn spatial_dims(
    layer: &str,
    shape: &[usize],
) -> Result<(usize, usize, usize, usize, bool)> {
    match *shape {
        [b, h, w, c] => Ok((b, h, w, c, true)),
        [h, w, c] => Ok((1, h, w, c, false)),
        _ => Err(Error::Layer(format!(
            "{} expects 3D or 4D input, got {:?}",
            layer, shape
        ))),
    }
}

/// Views the input as a 4D batch regardless of whether it carried one.
pub(crate) fn to_batched(input: &Tensor, dims: (usize, usize, usize, usize)) -> Result<Array4<f32>> {
    input
        .data()
        .clone()
        .into_shape_with_order(dims)
        .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))
}

/// Drops the batch dimension again for unbatched inputs.
pub(crate) fn from_batched(output: Array4<f32>, is_batched: bool) -> Result<Tensor> {
    let (b, h, w, c) = output.dim();
    let shape = if is_batched {
        vec![b, h, w, c]
    } else {
        vec![h, w, c]
    };

    let output = output
        .into_shape_with_order(ndarray::IxDyn(&shape))
        .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;
    Ok(Tensor::new(output))
}

/// Windows and strides must be non-empty along both axes.
pub(crate) fn check_window(
    layer: &str,
    window: (usize, usize),
    strides: (usize, usize),
) -> Result<()> {
    if window.0 == 0 || window.1 == 0 {
        return Err(Error::Layer(format!(
            "{}: window {:?} must be positive",
            layer, window
        )));
    }
    if strides.0 == 0 || strides.1 == 0 {
        return Err(Error::Layer(format!(
            "{}: strides {:?} must be positive",
            layer, strides
        )));
    }
    Ok(())
}

/// Output extent of a sliding window along one axis.
pub(crate) fn window_output(
    layer: &str,
    size: usize,
    window: usize,
    stride: usize,
    padding: Padding,
) -> Result<usize> {
    if stride == 0 {
        return Err(Error::Layer(format!("{}: stride must be positive", layer)));
    }

    match padding {
        Padding::Valid if size < window => Err(Error::Layer(format!(
            "{}: input extent {} is smaller than window {}",
            layer, size, window
        ))),
        Padding::Valid => Ok((size - window) / stride + 1),
        Padding::Same => Ok((size + stride - 1) / stride),
    }
}

/// Padding in front of the first window along one axis. `Same` splits the
/// total evenly and gives the odd pixel to the trailing side.
pub(crate) fn leading_padding(
    size: usize,
    window: usize,
    stride: usize,
    out: usize,
    padding: Padding,
) -> usize {
    match padding {
        Padding::Valid => 0,
        Padding::Same if out == 0 => 0,
        Padding::Same => ((out - 1) * stride + window).saturating_sub(size) / 2,
    }
}
