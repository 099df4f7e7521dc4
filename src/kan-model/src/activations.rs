use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    ReLU,
    Softmax,
}

impl Activation {
    pub fn apply(&self, tensor: &mut Tensor) {
        match self {
            Activation::Linear => {}
            Activation::ReLU => tensor.data_mut().mapv_inplace(|x| x.max(0.0)),
            Activation::Softmax => apply_softmax(tensor),
        }
    }
}

/// Softmax over the last axis, shifted by the lane maximum.
fn apply_softmax(tensor: &mut Tensor) {
    let data = tensor.data_mut();
    if data.ndim() == 0 {
        return;
    }

    let last = Axis(data.ndim() - 1);
    for mut lane in data.lanes_mut(last) {
        let max_val = lane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        lane.mapv_inplace(|x| (x - max_val).exp());
        let sum = lane.sum();
        if sum > 0.0 {
            lane.mapv_inplace(|x| x / sum);
        }
    }
}
