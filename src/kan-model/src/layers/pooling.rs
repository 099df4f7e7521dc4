use ndarray::Array4;
use serde::{Deserialize, Serialize};

use super::{check_window, from_batched, leading_padding, spatial_dims, to_batched, window_output};
use crate::{Result, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    Valid,
    Same,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxPooling2D {
    name: String,
    pool_size: (usize, usize),
    strides: (usize, usize),
    padding: Padding,
}

impl MaxPooling2D {
    pub fn new(
        name: String,
        pool_size: (usize, usize),
        strides: Option<(usize, usize)>,
        padding: Padding,
    ) -> Result<Self> {
        let strides = strides.unwrap_or(pool_size);
        let layer = Self {
            name,
            pool_size,
            strides,
            padding,
        };
        layer.validate()?;

        Ok(layer)
    }

    pub fn validate(&self) -> Result<()> {
        check_window(&self.name, self.pool_size, self.strides)
    }

    fn compute_output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        Ok((
            window_output(&self.name, height, self.pool_size.0, self.strides.0, self.padding)?,
            window_output(&self.name, width, self.pool_size.1, self.strides.1, self.padding)?,
        ))
    }
}

impl super::Layer for MaxPooling2D {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let (batch_size, height, width, channels, is_batched) =
            spatial_dims("MaxPooling2D", input.shape())?;
        let input_4d = to_batched(input, (batch_size, height, width, channels))?;

        let (out_height, out_width) = self.compute_output_size(height, width)?;
        let pad_top = leading_padding(
            height,
            self.pool_size.0,
            self.strides.0,
            out_height,
            self.padding,
        );
        let pad_left = leading_padding(
            width,
            self.pool_size.1,
            self.strides.1,
            out_width,
            self.padding,
        );
        let mut output = Array4::zeros((batch_size, out_height, out_width, channels));

        for b in 0..batch_size {
            for oh in 0..out_height {
                for ow in 0..out_width {
                    // Padded cells never win a max, so windows are clipped to the input.
                    let h_origin = oh * self.strides.0;
                    let w_origin = ow * self.strides.1;
                    let h_start = h_origin.saturating_sub(pad_top);
                    let w_start = w_origin.saturating_sub(pad_left);
                    let h_end = (h_origin + self.pool_size.0).saturating_sub(pad_top).min(height);
                    let w_end = (w_origin + self.pool_size.1).saturating_sub(pad_left).min(width);

                    for c in 0..channels {
                        let mut max_val = f32::NEG_INFINITY;
                        for h in h_start..h_end {
                            for w in w_start..w_end {
                                max_val = max_val.max(input_4d[[b, h, w, c]]);
                            }
                        }
                        output[[b, oh, ow, c]] = max_val;
                    }
                }
            }
        }

        from_batched(output, is_batched)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let (batch_size, height, width, channels, is_batched) =
            spatial_dims("MaxPooling2D", input_shape)?;
        let (out_height, out_width) = self.compute_output_size(height, width)?;

        if is_batched {
            Ok(vec![batch_size, out_height, out_width, channels])
        } else {
            Ok(vec![out_height, out_width, channels])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Layer;
    use super::*;

    #[test]
    fn floor_division_drops_trailing_row_and_column() {
        let layer = MaxPooling2D::new("pool".to_string(), (2, 2), None, Padding::Valid).unwrap();
        let input = Tensor::from_vec((0..9).map(|v| v as f32).collect(), &[3, 3, 1]).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 1]);
        assert_eq!(output.to_vec(), vec![4.0]);
        assert_eq!(layer.output_shape(&[1, 222, 222, 32]).unwrap(), vec![1, 111, 111, 32]);
    }

    #[test]
    fn same_padding_centres_the_window() {
        let layer =
            MaxPooling2D::new("pool".to_string(), (1, 3), Some((1, 1)), Padding::Same).unwrap();
        let input = Tensor::from_vec((0..5).map(|v| v as f32).collect(), &[1, 5, 1]).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 5, 1]);
        assert_eq!(output.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn same_padding_with_stride_two() {
        let layer = MaxPooling2D::new("pool".to_string(), (2, 2), None, Padding::Same).unwrap();
        let input = Tensor::from_vec((0..9).map(|v| v as f32).collect(), &[3, 3, 1]).unwrap();

        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[2, 2, 1]);
        assert_eq!(output.to_vec(), vec![4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn rejects_empty_windows_and_strides() {
        assert!(MaxPooling2D::new("pool".to_string(), (2, 2), Some((0, 1)), Padding::Valid).is_err());
        assert!(MaxPooling2D::new("pool".to_string(), (0, 2), None, Padding::Valid).is_err());
    }
}
