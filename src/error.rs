use thiserror::Error;

/// Failure of a single image operation. Returned by `Command::execute` and
/// passed through `Controller::apply` untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("crop rectangle {width}x{height}+{x}+{y} exceeds image bounds {image_width}x{image_height}")]
    CropOutOfBounds {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("cannot blend {left:?} with {right:?}: image sizes differ")]
    SizeMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("perspective quad is degenerate")]
    DegenerateQuad,

    #[error("image is empty")]
    EmptyImage,
}

/// A malformed edit step such as `rotate=abc` or `crop=1,2`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty edit step")]
    Empty,

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("'{op}' expects {expected} argument(s), got {got}")]
    ArgumentCount { op: String, expected: usize, got: usize },

    #[error("'{op}': invalid value '{value}'")]
    InvalidValue { op: String, value: String },
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Operation failed: {0}")]
    Op(#[from] OpError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Upload failed: {0}")]
    Upload(#[from] crate::upload::UploadError),

    #[error("No image is open")]
    NoImage,
}

/// Convenience type alias for Results with EditorError
pub type Result<T> = std::result::Result<T, EditorError>;
