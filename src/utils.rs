use candle_core::{DType, Device, Tensor};

use crate::error::{Error, Result};

pub fn mask_to_index(mask: &[bool], device: &Device) -> candle_core::Result<Tensor> {
    Tensor::from_iter(
        mask.iter()
            .enumerate()
            .filter_map(|(idx, &m)| if m { Some(idx as u32) } else { None }),
        device,
    )
}

/// Reads a scalar tensor, failing on NaN or infinity.
pub fn finite_scalar(t: &Tensor, what: &str) -> Result<f32> {
    let value = t.to_dtype(DType::F32)?.to_scalar::<f32>()?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NumericFailure(format!("{what} is {value}")))
    }
}
