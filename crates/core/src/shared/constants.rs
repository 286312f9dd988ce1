/// File name looked up in the model cache when no explicit model path is given.
pub const DEFAULT_MODEL_NAME: &str = "yolov5n.onnx";

/// Capture device opened when none is configured.
pub const DEFAULT_DEVICE: &str = "/dev/video1";

/// Display refresh period in milliseconds.
pub const DEFAULT_REFRESH_MS: u64 = 50;

pub const DEFAULT_LINE_THICKNESS: u32 = 2;

/// Model input resolution used when the model does not declare one.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_MAX_DETECTIONS: usize = 1000;

/// Grey level used for letterbox padding (YOLO convention).
pub const LETTERBOX_FILL: u8 = 114;

/// How long shutdown waits for the pipeline loops to confirm they stopped.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;

/// The 80 COCO class labels, in model output order.
pub const COCO_CLASS_NAMES: [&str; 80] = [
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
