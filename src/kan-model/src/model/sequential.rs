use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layers::{Layer, LayerKind};
use crate::{Error, Result, Tensor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequential {
    name: String,
    layers: Vec<LayerKind>,
    input_shape: Option<Vec<usize>>,
}

impl Sequential {
    pub fn new(name: String) -> Self {
        Self {
            name,
            layers: Vec::new(),
            input_shape: None,
        }
    }

    pub fn add<L: Into<LayerKind>>(&mut self, layer: L) {
        self.layers.push(layer.into());
    }

    pub fn set_input_shape(&mut self, shape: Vec<usize>) {
        self.input_shape = Some(shape);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_shape(&self) -> Option<&[usize]> {
        self.input_shape.as_deref()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn predict(&self, input: &Tensor) -> Result<Tensor> {
        let (first, rest) = self
            .layers
            .split_first()
            .ok_or_else(|| Error::ModelLoad("Cannot predict with empty model".to_string()))?;

        let mut current = run_layer(0, first, input)?;
        for (idx, layer) in rest.iter().enumerate() {
            current = run_layer(idx + 1, layer, &current)?;
        }

        Ok(current)
    }

    /// Checks every layer's invariants, naming the first one that fails.
    pub fn validate(&self) -> Result<()> {
        for (idx, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|e| Error::Layer(format!("Layer {} ({}): {}", idx, layer.name(), e)))?;
        }
        Ok(())
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let mut current_shape = input_shape.to_vec();

        for layer in &self.layers {
            current_shape = layer.output_shape(&current_shape)?;
        }

        Ok(current_shape)
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Model: {}\n", self.name));
        s.push_str("_________________________________________________________________\n");
        s.push_str("Layer (type)                          Output Shape\n");
        s.push_str("=================================================================\n");

        let mut current_shape = self.input_shape.clone().unwrap_or_default();

        for layer in &self.layers {
            if !current_shape.is_empty() {
                current_shape = layer.output_shape(&current_shape).unwrap_or_default();
            }

            let label = format!("{} ({})", layer.name(), layer.kind());
            s.push_str(&format!("{:37} {:?}\n", label, current_shape));
        }

        s.push_str("=================================================================\n");
        s.push_str(&format!("Total layers: {}\n", self.layers.len()));

        s
    }

    pub fn load(path: &Path) -> Result<Self> {
        super::persist::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        super::persist::save(self, path)
    }
}

fn run_layer(idx: usize, layer: &LayerKind, input: &Tensor) -> Result<Tensor> {
    layer
        .forward(input)
        .map_err(|e| Error::Layer(format!("Layer {} ({}): {}", idx, layer.name(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{activations::Activation, layers::Dense};
    use ndarray::array;

    #[test]
    fn test_sequential_predict() {
        let mut model = Sequential::new("test_model".to_string());

        let layer1 = Dense::new(
            "dense1".to_string(),
            array![[1.0, 0.5], [0.5, 1.0]],
            Some(array![0.0, 0.0]),
            Activation::ReLU,
        )
        .unwrap();
        let layer2 = Dense::new(
            "dense2".to_string(),
            array![[1.0], [1.0]],
            None,
            Activation::Linear,
        )
        .unwrap();

        model.add(layer1);
        model.add(layer2);

        let input = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let output = model.predict(&input).unwrap();

        assert_eq!(output.shape(), &[1]);
        assert_eq!(output.to_vec(), vec![4.5]);
        assert_eq!(model.layer_names(), vec!["dense1", "dense2"]);
    }

    #[test]
    fn empty_model_cannot_predict() {
        let model = Sequential::new("empty".to_string());
        let input = Tensor::zeros(&[2]);
        assert!(matches!(model.predict(&input), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn layer_errors_name_the_failing_layer() {
        let mut model = Sequential::new("broken".to_string());
        model.add(
            Dense::new("narrow".to_string(), array![[1.0]], None, Activation::Linear).unwrap(),
        );

        let err = model.predict(&Tensor::zeros(&[3])).unwrap_err();
        assert!(err.to_string().contains("Layer 0 (narrow)"));
    }
}
