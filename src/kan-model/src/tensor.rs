use ndarray::{Array, ArrayD, IxDyn};

use crate::{Error, Result};

/// Dense `f32` tensor in NHWC layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    pub fn from_vec(vec: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let actual = vec.len();
        let data = Array::from_shape_vec(IxDyn(shape), vec).map_err(|_| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![actual],
        })?;
        Ok(Self { data })
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        self.clone().into_reshape(new_shape)
    }

    pub fn into_reshape(self, new_shape: &[usize]) -> Result<Self> {
        let total: usize = new_shape.iter().product();
        if total != self.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![total],
                actual: vec![self.len()],
            });
        }

        let reshaped = self
            .data
            .into_shape_with_order(IxDyn(new_shape))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;
        Ok(Self { data: reshaped })
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]).unwrap_err();
        match err {
            Error::ShapeMismatch { expected, actual } => {
                assert_eq!(expected, vec![2, 2]);
                assert_eq!(actual, vec![3]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn reshape_keeps_element_order() {
        let tensor = Tensor::from_vec((0..6).map(|v| v as f32).collect(), &[2, 3]).unwrap();
        let reshaped = tensor.reshape(&[3, 2]).unwrap();

        assert_eq!(reshaped.shape(), &[3, 2]);
        assert_eq!(reshaped.to_vec(), tensor.to_vec());
        assert!(tensor.reshape(&[4, 2]).is_err());
    }
}
