use crate::errors::EngineError;
use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix1, Ix2, IxDyn};

/// The four output tensors of an SSD-style detector for one frame.
///
/// `boxes` holds normalized `[ymin, xmin, ymax, xmax]` values either flat
/// (`[4N]`) or nested (`[N, 4]`), optionally behind leading batch axes of
/// length 1. `class_ids` and `scores` hold up to N values, `count` holds the
/// declared number of valid rows in its first element.
#[derive(Debug, Clone)]
pub struct RawModelOutput {
    pub boxes: ArrayD<f32>,
    pub class_ids: ArrayD<f32>,
    pub scores: ArrayD<f32>,
    pub count: ArrayD<f32>,
}

impl RawModelOutput {
    pub fn new(
        boxes: ArrayD<f32>,
        class_ids: ArrayD<f32>,
        scores: ArrayD<f32>,
        count: ArrayD<f32>,
    ) -> Self {
        Self {
            boxes,
            class_ids,
            scores,
            count,
        }
    }

    /// Output with zero declared detections.
    pub fn empty() -> Self {
        Self {
            boxes: ArrayD::zeros(IxDyn(&[0, 4])),
            class_ids: ArrayD::zeros(IxDyn(&[0])),
            scores: ArrayD::zeros(IxDyn(&[0])),
            count: ArrayD::zeros(IxDyn(&[1])),
        }
    }
}

/// One decoded row, box still normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandidate {
    pub class_id: i64,
    pub score: f32,
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
}

/// Box tensor layout, chosen from the tensor shape.
#[derive(Debug)]
enum BoxLayout<'a> {
    Flat(ArrayView1<'a, f32>),
    Rows(ArrayView2<'a, f32>),
}

impl<'a> BoxLayout<'a> {
    fn inspect(boxes: &'a ArrayD<f32>) -> Result<Self, EngineError> {
        let malformed = || EngineError::malformed("boxes", boxes.shape());
        let view = strip_batch_axes(boxes.view(), 2);
        let shape = view.shape().to_vec();

        match shape.as_slice() {
            [_] => view
                .into_dimensionality::<Ix1>()
                .map(BoxLayout::Flat)
                .map_err(|_| malformed()),
            [_, 4] => view
                .into_dimensionality::<Ix2>()
                .map(BoxLayout::Rows)
                .map_err(|_| malformed()),
            [1, _] => view
                .index_axis_move(Axis(0), 0)
                .into_dimensionality::<Ix1>()
                .map(BoxLayout::Flat)
                .map_err(|_| malformed()),
            _ => Err(malformed()),
        }
    }

    /// `[ymin, xmin, ymax, xmax]` of row `i`; absent values read as 0.
    fn coords(&self, i: usize) -> [f32; 4] {
        match self {
            BoxLayout::Flat(flat) => {
                std::array::from_fn(|k| flat.get(i * 4 + k).copied().unwrap_or(0.0))
            }
            BoxLayout::Rows(rows) => {
                std::array::from_fn(|k| rows.get((i, k)).copied().unwrap_or(0.0))
            }
        }
    }
}

fn strip_batch_axes(mut view: ArrayViewD<'_, f32>, target_ndim: usize) -> ArrayViewD<'_, f32> {
    while view.ndim() > target_ndim && view.shape()[0] == 1 {
        view = view.index_axis_move(Axis(0), 0);
    }
    view
}

fn vector<'a>(tensor: &'a ArrayD<f32>, name: &'static str) -> Result<ArrayView1<'a, f32>, EngineError> {
    strip_batch_axes(tensor.view(), 1)
        .into_dimensionality::<Ix1>()
        .map_err(|_| EngineError::malformed(name, tensor.shape()))
}

pub struct TensorDecoder {
    max_detections: usize,
}

impl TensorDecoder {
    pub fn new(max_detections: usize) -> Self {
        Self { max_detections }
    }

    /// Declared count, clamped to the model maximum. A missing or non-finite
    /// count means "all rows".
    fn declared_count(&self, count: &ArrayD<f32>) -> usize {
        match count.iter().next() {
            Some(&value) if value.is_finite() => {
                (value.max(0.0).floor() as usize).min(self.max_detections)
            }
            _ => self.max_detections,
        }
    }

    /// Decode raw tensors into candidates.
    ///
    /// Rows with a non-finite field, a score outside `[0, 1]`, or a box that
    /// is inverted after clamping are dropped; the rest of the frame is kept.
    #[tracing::instrument(skip_all)]
    pub fn decode(&self, output: &RawModelOutput) -> Result<Vec<RawCandidate>, EngineError> {
        let layout = BoxLayout::inspect(&output.boxes)?;
        let class_ids = vector(&output.class_ids, "class_ids")?;
        let scores = vector(&output.scores, "scores")?;
        let count = self.declared_count(&output.count);

        let mut candidates = Vec::with_capacity(count);
        for i in 0..count {
            let score = scores.get(i).copied().unwrap_or(0.0);
            let class_id = class_ids.get(i).copied().unwrap_or(0.0);
            let coords = layout.coords(i);

            match sanitize(class_id, score, coords) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    tracing::trace!(row = i, score, class_id, ?coords, "Dropping malformed row");
                }
            }
        }

        Ok(candidates)
    }
}

fn sanitize(class_id: f32, score: f32, coords: [f32; 4]) -> Option<RawCandidate> {
    if !class_id.is_finite() || !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return None;
    }
    if coords.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let [ymin, xmin, ymax, xmax] = coords.map(|c| c.clamp(0.0, 1.0));
    if ymax < ymin || xmax < xmin {
        return None;
    }

    Some(RawCandidate {
        class_id: class_id.round() as i64,
        score,
        ymin,
        xmin,
        ymax,
        xmax,
    })
}
