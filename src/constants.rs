//! Global constants for the QC canvas engine

/// Minimum zoom level (100%, image fits the element)
pub const MIN_ZOOM: f64 = 1.0;

/// Maximum zoom level
pub const MAX_ZOOM: f64 = 3.0;

/// Default zoom increment per wheel notch
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;

/// Aspect ratio band outside of which the image is fitted with `cover` instead of `contain`
pub const COVER_RATIO_HIGH: f64 = 1.2;
pub const COVER_RATIO_LOW: f64 = 0.8;

/// Minimum box width/height (display pixels) while moving or resizing
pub const MIN_BOX_SIZE: f64 = 20.0;

/// Minimum rubber-band size (display pixels) for a new box to be committed
pub const MIN_CREATE_SIZE: f64 = 10.0;

/// Minimum number of vertices a polygon keeps
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Handle grab radius in screen pixels (converted to display space through the zoom)
pub const HANDLE_HIT_RADIUS: f64 = 8.0;

/// Clicks closer than this (display pixels) to the last collected polygon point are ignored
pub const DUPLICATE_POINT_DISTANCE: f64 = 2.0;

/// Default interval between drag preview updates (~60 updates per second)
pub const DEFAULT_DRAG_THROTTLE_MS: u64 = 16;

/// Default time the `saved`/`failed` indicator stays visible
pub const DEFAULT_SAVE_STATUS_MS: u64 = 1500;
