use serde::{Deserialize, Serialize};

use crate::{Result, Tensor};

/// Collapses everything after the batch dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flatten {
    name: String,
}

impl Flatten {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl super::Layer for Flatten {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let new_shape = self.output_shape(input.shape())?;
        input.reshape(&new_shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match input_shape {
            [] => Ok(vec![1]),
            [len] => Ok(vec![*len]),
            [batch_size, rest @ ..] => Ok(vec![*batch_size, rest.iter().product()]),
        }
    }
}
