use ndarray::{Array1, Array2, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{activations::Activation, Error, Result, Tensor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    name: String,
    /// `[inputs, units]`
    weights: Array2<f32>,
    bias: Option<Array1<f32>>,
    activation: Activation,
}

impl Dense {
    pub fn new(
        name: String,
        weights: Array2<f32>,
        bias: Option<Array1<f32>>,
        activation: Activation,
    ) -> Result<Self> {
        let layer = Self {
            name,
            weights,
            bias,
            activation,
        };
        layer.validate()?;

        Ok(layer)
    }

    pub fn validate(&self) -> Result<()> {
        let units = self.units();

        if let Some(ref b) = self.bias {
            if b.len() != units {
                return Err(Error::Layer(format!(
                    "Bias size {} doesn't match units {}",
                    b.len(),
                    units
                )));
            }
        }

        Ok(())
    }

    pub fn units(&self) -> usize {
        self.weights.ncols()
    }
}

impl super::Layer for Dense {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let input_shape = input.shape();

        let (batch_size, features, is_batched) = match *input_shape {
            [features] => (1, features, false),
            [batch_size, features] => (batch_size, features, true),
            _ => {
                return Err(Error::Layer(format!(
                    "Dense layer expects 1D or 2D input, got {:?}",
                    input_shape
                )))
            }
        };

        if features != self.weights.nrows() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.weights.nrows()],
                actual: vec![features],
            });
        }

        let input_2d = input
            .data()
            .view()
            .into_shape_with_order((batch_size, features))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;

        let mut output = input_2d.dot(&self.weights);
        if let Some(ref bias) = self.bias {
            output += bias;
        }

        let output_shape = if is_batched {
            vec![batch_size, self.units()]
        } else {
            vec![self.units()]
        };

        let output = output
            .into_shape_with_order(IxDyn(&output_shape))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;

        let mut tensor = Tensor::new(output);
        self.activation.apply(&mut tensor);

        Ok(tensor)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match *input_shape {
            [features] | [_, features] if features != self.weights.nrows() => {
                Err(Error::ShapeMismatch {
                    expected: vec![self.weights.nrows()],
                    actual: vec![features],
                })
            }
            [_] => Ok(vec![self.units()]),
            [batch_size, _] => Ok(vec![batch_size, self.units()]),
            _ => Err(Error::Layer(format!(
                "Dense layer expects 1D or 2D input, got {:?}",
                input_shape
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Layer;
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_dense_forward() {
        let weights = array![[1.0, 2.0], [3.0, 4.0]];
        let bias = Some(array![0.1, 0.2]);

        let layer =
            Dense::new("test_dense".to_string(), weights, bias, Activation::Linear).unwrap();

        let input = Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap();
        let result = layer.forward(&input).unwrap().to_vec();

        assert_eq!(result.len(), 2);
        assert_abs_diff_eq!(result[0], 4.1, epsilon = 1e-6);
        assert_abs_diff_eq!(result[1], 6.2, epsilon = 1e-6);
    }

    #[test]
    fn test_dense_with_relu() {
        let weights = array![[1.0, -2.0], [-3.0, 4.0]];
        let layer = Dense::new("test_dense".to_string(), weights, None, Activation::ReLU).unwrap();

        let input = Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.to_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn batched_input_keeps_batch_dimension() {
        let weights = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let layer = Dense::new("dense".to_string(), weights, None, Activation::Linear).unwrap();

        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[2, 3]);
        assert_eq!(output.to_vec(), vec![1.0, 2.0, 3.0, 3.0, 4.0, 7.0]);
        assert!(layer.output_shape(&[2, 5]).is_err());
    }
}
