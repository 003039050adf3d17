use crate::errors::EngineError;
use crate::types::Color;

/// COCO class names, dense 0-based.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// SSD-style COCO models emit 1-based ids over the original 91-id space;
/// these ids have no label.
pub const COCO_GAP_IDS: [i64; 10] = [12, 26, 29, 30, 45, 66, 68, 69, 71, 83];

pub const DEFAULT_PALETTE: [Color; 6] = [
    Color::rgb(0xFF, 0x6B, 0x6B),
    Color::rgb(0x4E, 0xCD, 0xC4),
    Color::rgb(0x95, 0xE1, 0xD3),
    Color::rgb(0xFF, 0xD9, 0x3D),
    Color::rgb(0xA8, 0xE6, 0xCF),
    Color::rgb(0x2A, 0x7D, 0xE1),
];

/// Resolved label and overlay color for a raw class id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub index: Option<usize>,
    pub label: String,
    pub color: Color,
}

/// Dense label table plus the gap ids of the model's sparse class-id space.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
    gap_ids: Vec<i64>,
    palette: Vec<Color>,
}

impl LabelTable {
    pub fn new(
        labels: Vec<String>,
        mut gap_ids: Vec<i64>,
        palette: Vec<Color>,
    ) -> Result<Self, EngineError> {
        if labels.is_empty() {
            return Err(EngineError::InvalidLabelTable(
                "label list is empty".to_string(),
            ));
        }
        if palette.is_empty() {
            return Err(EngineError::InvalidLabelTable(
                "palette is empty".to_string(),
            ));
        }
        gap_ids.sort_unstable();
        gap_ids.dedup();

        Ok(Self {
            labels,
            gap_ids,
            palette,
        })
    }

    pub fn coco() -> Self {
        Self {
            labels: COCO_LABELS.iter().map(|s| s.to_string()).collect(),
            gap_ids: COCO_GAP_IDS.to_vec(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn gap_ids(&self) -> &[i64] {
        &self.gap_ids
    }

    /// Dense index for a 1-based model class id: `class_id - 1` minus the
    /// number of gap ids at or below `class_id`. `None` when the result falls
    /// outside the table, including ids too large in magnitude to offset.
    pub fn map_class_id(&self, class_id: i64) -> Option<usize> {
        let gaps_at_or_below = self.gap_ids.partition_point(|&gap| gap <= class_id) as i64;
        let index = class_id.checked_sub(1)?.checked_sub(gaps_at_or_below)?;
        let index = usize::try_from(index).ok()?;

        (index < self.labels.len()).then_some(index)
    }

    pub fn resolve(&self, class_id: i64) -> ClassInfo {
        match self.map_class_id(class_id) {
            Some(index) => ClassInfo {
                index: Some(index),
                label: self.labels[index].clone(),
                color: self.palette[index % self.palette.len()],
            },
            None => ClassInfo {
                index: None,
                label: format!("Class {}", class_id),
                color: self.palette[0],
            },
        }
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco()
    }
}
