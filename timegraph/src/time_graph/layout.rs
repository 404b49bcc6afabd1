//! Vertical layout parameters (world units)

/// Smallest and largest vertical zoom factors
const MIN_SCALE: f64 = 0.05;
const MAX_SCALE: f64 = 20.0;

/// Sizes used to stack tracks vertically.
///
/// Every getter returns the size multiplied by the current vertical zoom
/// scale, except the slider width which is screen furniture.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGraphLayout {
    text_box_height: f64,
    core_height: f64,
    event_track_height: f64,
    graph_track_height: f64,
    track_top_margin: f64,
    track_bottom_margin: f64,
    space_between_cores: f64,
    space_between_tracks: f64,
    space_between_tracks_and_thread: f64,
    scheduler_track_offset: f64,
    top_margin: f64,
    bottom_margin: f64,
    slider_width: f64,
    scale: f64,
}

impl Default for TimeGraphLayout {
    fn default() -> Self {
        Self {
            text_box_height: 20.0,
            core_height: 10.0,
            event_track_height: 10.0,
            graph_track_height: 20.0,
            track_top_margin: 20.0,
            track_bottom_margin: 5.0,
            space_between_cores: 2.0,
            space_between_tracks: 10.0,
            space_between_tracks_and_thread: 5.0,
            scheduler_track_offset: 10.0,
            top_margin: 5.0,
            bottom_margin: 5.0,
            slider_width: 15.0,
            scale: 1.0,
        }
    }
}

impl TimeGraphLayout {
    #[must_use]
    pub fn text_box_height(&self) -> f64 {
        self.text_box_height * self.scale
    }

    #[must_use]
    pub fn core_height(&self) -> f64 {
        self.core_height * self.scale
    }

    #[must_use]
    pub fn event_track_height(&self) -> f64 {
        self.event_track_height * self.scale
    }

    #[must_use]
    pub fn graph_track_height(&self) -> f64 {
        self.graph_track_height * self.scale
    }

    /// Room reserved above a track's content for its label tab
    #[must_use]
    pub fn track_top_margin(&self) -> f64 {
        self.track_top_margin * self.scale
    }

    /// Room below a track's last row
    #[must_use]
    pub fn track_bottom_margin(&self) -> f64 {
        self.track_bottom_margin * self.scale
    }

    #[must_use]
    pub fn space_between_cores(&self) -> f64 {
        self.space_between_cores * self.scale
    }

    #[must_use]
    pub fn space_between_tracks(&self) -> f64 {
        self.space_between_tracks * self.scale
    }

    /// Gap between a thread's event strip and its first timer row
    #[must_use]
    pub fn space_between_tracks_and_thread(&self) -> f64 {
        self.space_between_tracks_and_thread * self.scale
    }

    /// Y of the first track
    #[must_use]
    pub fn scheduler_track_offset(&self) -> f64 {
        self.scheduler_track_offset * self.scale
    }

    #[must_use]
    pub fn top_margin(&self) -> f64 {
        self.top_margin * self.scale
    }

    #[must_use]
    pub fn bottom_margin(&self) -> f64 {
        self.bottom_margin * self.scale
    }

    #[must_use]
    pub fn slider_width(&self) -> f64 {
        self.slider_width
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the vertical zoom factor (clamped to a sane range)
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }
}
