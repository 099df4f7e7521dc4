use ndarray::{Array1, Array2, Array4};
use serde::{Deserialize, Serialize};

use super::{
    check_window, from_batched, leading_padding, spatial_dims, to_batched, window_output, Padding,
};
use crate::{activations::Activation, Error, Result, Tensor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2D {
    name: String,
    filters: usize,
    kernel_size: (usize, usize),
    strides: (usize, usize),
    padding: Padding,
    /// Kernel laid out as `[kh, kw, in_channels, filters]`.
    weights: Array4<f32>,
    bias: Option<Array1<f32>>,
    activation: Activation,
}

impl Conv2D {
    pub fn new(
        name: String,
        strides: (usize, usize),
        padding: Padding,
        weights: Array4<f32>,
        bias: Option<Array1<f32>>,
        activation: Activation,
    ) -> Result<Self> {
        let (kh, kw, _in_channels, filters) = weights.dim();

        let layer = Self {
            name,
            filters,
            kernel_size: (kh, kw),
            strides,
            padding,
            weights,
            bias,
            activation,
        };
        layer.validate()?;

        Ok(layer)
    }

    pub fn validate(&self) -> Result<()> {
        let (kh, kw, _in_channels, filters) = self.weights.dim();

        if (kh, kw) != self.kernel_size || filters != self.filters {
            return Err(Error::Layer(format!(
                "{}: kernel {:?} doesn't match declared {:?} x {} filters",
                self.name,
                self.weights.shape(),
                self.kernel_size,
                self.filters
            )));
        }

        if let Some(ref b) = self.bias {
            if b.len() != filters {
                return Err(Error::Layer(format!(
                    "Bias size {} doesn't match filters {}",
                    b.len(),
                    filters
                )));
            }
        }

        check_window(&self.name, self.kernel_size, self.strides)
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    fn compute_output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        Ok((
            window_output(&self.name, height, self.kernel_size.0, self.strides.0, self.padding)?,
            window_output(&self.name, width, self.kernel_size.1, self.strides.1, self.padding)?,
        ))
    }

    /// Leading padding (top, left).
    fn compute_padding(&self, height: usize, width: usize, out: (usize, usize)) -> (usize, usize) {
        (
            leading_padding(height, self.kernel_size.0, self.strides.0, out.0, self.padding),
            leading_padding(width, self.kernel_size.1, self.strides.1, out.1, self.padding),
        )
    }
}

impl super::Layer for Conv2D {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let (batch_size, height, width, in_channels, is_batched) =
            spatial_dims("Conv2D", input.shape())?;

        let expected_channels = self.weights.dim().2;
        if in_channels != expected_channels {
            return Err(Error::ShapeMismatch {
                expected: vec![expected_channels],
                actual: vec![in_channels],
            });
        }

        let input_4d = to_batched(input, (batch_size, height, width, in_channels))?;
        let (out_height, out_width) = self.compute_output_size(height, width)?;
        let (pad_top, pad_left) = self.compute_padding(height, width, (out_height, out_width));

        let cols = im2col(
            &input_4d,
            self.kernel_size,
            self.strides,
            (pad_top, pad_left),
            (out_height, out_width),
        );

        let patch_len = self.kernel_size.0 * self.kernel_size.1 * in_channels;
        let kernel: Array2<f32> = self
            .weights
            .view()
            .into_shape_with_order((patch_len, self.filters))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?
            .to_owned();

        let mut product = cols.dot(&kernel);
        if let Some(ref bias) = self.bias {
            product += bias;
        }

        let output = product
            .into_shape_with_order((batch_size, out_height, out_width, self.filters))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;

        let mut tensor = from_batched(output, is_batched)?;
        self.activation.apply(&mut tensor);

        Ok(tensor)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let (batch_size, height, width, _channels, is_batched) =
            spatial_dims("Conv2D", input_shape)?;
        let (out_height, out_width) = self.compute_output_size(height, width)?;

        if is_batched {
            Ok(vec![batch_size, out_height, out_width, self.filters])
        } else {
            Ok(vec![out_height, out_width, self.filters])
        }
    }
}

/// Unrolls every receptive field into one row so the convolution becomes a
/// single matrix product. Row order is `(batch, oh, ow)`, column order is
/// `(kh, kw, channel)` to match the kernel layout.
fn im2col(
    input: &Array4<f32>,
    kernel: (usize, usize),
    strides: (usize, usize),
    pad: (usize, usize),
    out: (usize, usize),
) -> Array2<f32> {
    let (batch, height, width, channels) = input.dim();
    let mut cols = Array2::zeros((batch * out.0 * out.1, kernel.0 * kernel.1 * channels));

    for b in 0..batch {
        for oh in 0..out.0 {
            for ow in 0..out.1 {
                let row = b * (out.0 * out.1) + oh * out.1 + ow;
                let mut col = 0;

                for kh in 0..kernel.0 {
                    for kw in 0..kernel.1 {
                        // Underflow wraps past `height`/`width` and is skipped as padding.
                        let ih = (oh * strides.0 + kh).wrapping_sub(pad.0);
                        let iw = (ow * strides.1 + kw).wrapping_sub(pad.1);

                        if ih < height && iw < width {
                            for c in 0..channels {
                                cols[[row, col + c]] = input[[b, ih, iw, c]];
                            }
                        }

                        col += channels;
                    }
                }
            }
        }
    }

    cols
}

#[cfg(test)]
mod tests {
    use super::super::Layer;
    use super::*;

    #[test]
    fn im2col_orders_columns_by_kernel_then_channel() {
        let input = Array4::from_shape_vec(
            (1, 2, 2, 2),
            vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0, 4.0, 8.0],
        )
        .unwrap();

        let cols = im2col(&input, (2, 2), (1, 1), (0, 0), (1, 1));

        assert_eq!(cols.shape(), &[1, 8]);
        assert_eq!(
            cols.row(0).to_vec(),
            vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0, 4.0, 8.0]
        );
    }

    #[test]
    fn im2col_zero_fills_padding() {
        let input = Array4::from_shape_vec((1, 2, 2, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let cols = im2col(&input, (3, 3), (1, 1), (1, 1), (2, 2));

        assert_eq!(cols.shape(), &[4, 9]);
        assert_eq!(
            cols.row(0).to_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 3.0, 4.0]
        );
    }

    #[test]
    fn valid_convolution_sums_each_window() {
        let weights = Array4::from_elem((2, 2, 1, 1), 1.0);
        let layer = Conv2D::new(
            "conv".to_string(),
            (1, 1),
            Padding::Valid,
            weights,
            Some(Array1::from_elem(1, 0.5)),
            Activation::Linear,
        )
        .unwrap();

        let input = Tensor::from_vec((1..=9).map(|v| v as f32).collect(), &[3, 3, 1]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[2, 2, 1]);
        assert_eq!(output.to_vec(), vec![12.5, 16.5, 24.5, 28.5]);
    }

    #[test]
    fn same_padding_keeps_spatial_size() {
        let weights = Array4::from_elem((3, 3, 1, 2), 1.0);
        let layer = Conv2D::new(
            "conv".to_string(),
            (1, 1),
            Padding::Same,
            weights,
            None,
            Activation::Linear,
        )
        .unwrap();

        let input = Tensor::from_vec(vec![1.0; 16], &[1, 4, 4, 1]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 4, 4, 2]);
        // Corner sees four pixels, centre sees nine.
        assert_eq!(output.data()[[0, 0, 0, 0]], 4.0);
        assert_eq!(output.data()[[0, 1, 1, 1]], 9.0);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let weights = Array4::from_elem((3, 3, 3, 4), 0.1);
        let layer = Conv2D::new(
            "conv".to_string(),
            (1, 1),
            Padding::Valid,
            weights,
            None,
            Activation::ReLU,
        )
        .unwrap();

        let input = Tensor::zeros(&[1, 8, 8, 1]);
        assert!(matches!(
            layer.forward(&input),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_mismatched_bias() {
        let weights = Array4::from_elem((3, 3, 3, 4), 0.1);
        let result = Conv2D::new(
            "conv".to_string(),
            (1, 1),
            Padding::Valid,
            weights,
            Some(Array1::zeros(3)),
            Activation::ReLU,
        );
        assert!(result.is_err());
    }
}
