//! Capture export and import
//!
//! Captures are saved as a single JSON document holding the capture
//! snapshot and every ingested timer, so a saved capture can be replayed
//! into a fresh time graph.

pub mod capture_serializer;

pub use capture_serializer::{
    capture_data_from_info, capture_file_name, generate_capture_info, include_capture_extension,
    load_capture, read_capture, save_capture, write_capture, CallstackInfo, CaptureFile,
    CaptureFileHeader, CaptureInfo, CAPTURE_FILE_EXTENSION, CAPTURE_FORMAT_VERSION,
};
