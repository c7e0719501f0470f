//! Pixel-wise binary cross-entropy on probabilities.

use std::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::{backend::Backend, ElementConversion, Tensor},
};

/// Binary cross-entropy over probability inputs in [0, 1].
#[derive(Module, Debug)]
pub struct BceLoss<B: Backend> {
    log_floor: f64,
    _phantom: PhantomData<B>,
}

#[derive(Config, Debug)]
pub struct BceLossConfig {
    /// Lower clamp applied to both log terms, keeping the loss finite when a
    /// probability saturates at exactly 0 or 1.
    #[config(default = -100.0)]
    pub log_floor: f64,
}

impl BceLossConfig {
    pub const fn init<B: Backend>(&self) -> BceLoss<B> {
        BceLoss {
            log_floor: self.log_floor,
            _phantom: PhantomData,
        }
    }
}

impl<B: Backend> BceLoss<B> {
    /// Computes `mean(-(y * log(p) + (1 - y) * log(1 - p)))`.
    ///
    /// `input` must already be a probability (post-sigmoid); `target` holds
    /// binary labels of the same shape.
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
        target: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        assert_eq!(
            input.shape(),
            target.shape(),
            "input and target must have the same shape, got {:?} and {:?}",
            input.shape(),
            target.shape()
        );

        let floor = self.log_floor.elem::<B::FloatElem>();
        let log_p = input.clone().log().clamp_min(floor);
        let log_not_p = (Tensor::ones_like(&input) - input).log().clamp_min(floor);

        let one = Tensor::ones_like(&target);
        (-(target.clone() * log_p + (one - target) * log_not_p)).mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn known_value_at_half_probability() {
        let device = Default::default();
        let loss = BceLossConfig::new().init::<TestBackend>();

        let input = Tensor::<TestBackend, 1>::from_floats([0.5, 0.5, 0.5, 0.5], &device);
        let target = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0, 1.0, 0.0], &device);

        let value = loss.forward(input, target).into_scalar();
        let expected = -(0.5f32.ln());
        assert!((value - expected).abs() < 1e-5);
    }

    #[test]
    fn confident_correct_predictions_cost_less() {
        let device = Default::default();
        let loss = BceLossConfig::new().init::<TestBackend>();

        let target = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let confident = Tensor::<TestBackend, 1>::from_floats([0.95, 0.05], &device);
        let hesitant = Tensor::<TestBackend, 1>::from_floats([0.6, 0.4], &device);

        let low = loss.forward(confident, target.clone()).into_scalar();
        let high = loss.forward(hesitant, target).into_scalar();
        assert!(low < high);
    }

    #[test]
    fn saturated_probabilities_stay_finite() {
        let device = Default::default();
        let loss = BceLossConfig::new().init::<TestBackend>();

        let input = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0], &device);
        let target = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);

        let value = loss.forward(input, target).into_scalar();
        assert!(value.is_finite());
    }

    #[test]
    fn works_on_segmentation_shaped_tensors() {
        let device = Default::default();
        let loss = BceLossConfig::new().init::<TestBackend>();

        let input = Tensor::<TestBackend, 4>::full([1, 1, 8, 8], 0.3, &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 1, 8, 8], &device);

        let value = loss.forward(input, target).into_scalar();
        assert!(value > 0.0);
        assert_eq!(value, value); // not NaN
    }
}
