use candle_core::{DType, Result, Tensor, D};
use candle_nn::ops;

/// Mean softmax cross-entropy over the rows in `index`.
pub fn masked_softmax_cross_entropy(
    logits: &Tensor,
    labels: &Tensor,
    index: &Tensor,
) -> Result<Tensor> {
    let log_probs = ops::log_softmax(&logits.index_select(index, 0)?, D::Minus1)?;
    let targets = labels.index_select(index, 0)?.to_dtype(log_probs.dtype())?;
    log_probs.mul(&targets)?.sum(D::Minus1)?.mean_all()?.neg()
}

/// Share of rows in `index` whose top logit matches the label.
pub fn masked_accuracy(logits: &Tensor, labels: &Tensor, index: &Tensor) -> Result<Tensor> {
    let predicted = logits.index_select(index, 0)?.argmax(D::Minus1)?;
    let expected = labels.index_select(index, 0)?.argmax(D::Minus1)?;
    predicted.eq(&expected)?.to_dtype(DType::F32)?.mean_all()
}

/// `sum(t^2) / 2`
pub fn l2_loss(t: &Tensor) -> Result<Tensor> {
    t.sqr()?.sum_all()? * 0.5
}
