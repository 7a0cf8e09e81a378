//! Pitch flight time, expressed in video frames.

/// Feet per second in one mile per hour.
const FPS_PER_MPH: f64 = 5280.0 / 3600.0;

/// Maps a pitch velocity to the number of frames the ball spends in flight.
pub trait DurationModel {
    fn duration_frames(&self, velocity_mph: f64) -> u64;
}

/// Constant-velocity flight from the release point to the plate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightTimeModel {
    /// Video frame rate.
    pub fps: f64,
    /// Distance the ball travels after release, in feet.
    pub release_distance_ft: f64,
}

impl FlightTimeModel {
    pub const DEFAULT_FPS: f64 = 30.0;
    /// 60.5 ft rubber-to-plate minus a typical stride extension.
    pub const DEFAULT_RELEASE_DISTANCE_FT: f64 = 55.0;

    pub fn new(fps: f64, release_distance_ft: f64) -> Self {
        Self {
            fps,
            release_distance_ft,
        }
    }

    /// Seconds between release and the ball reaching the plate.
    pub fn flight_seconds(&self, velocity_mph: f64) -> Option<f64> {
        if !velocity_mph.is_finite() || velocity_mph <= 0.0 {
            return None;
        }
        Some(self.release_distance_ft / (velocity_mph * FPS_PER_MPH))
    }
}

impl Default for FlightTimeModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FPS, Self::DEFAULT_RELEASE_DISTANCE_FT)
    }
}

impl DurationModel for FlightTimeModel {
    fn duration_frames(&self, velocity_mph: f64) -> u64 {
        match self.flight_seconds(velocity_mph) {
            Some(seconds) if self.fps > 0.0 => (seconds * self.fps).ceil() as u64,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_mph_at_thirty_fps() {
        let model = FlightTimeModel::default();
        // 55 ft / 139.33 ft/s = 0.3947 s -> 11.84 frames
        assert_eq!(model.duration_frames(95.0), 12);
    }

    #[test]
    fn faster_pitches_take_fewer_frames() {
        let model = FlightTimeModel::new(240.0, 55.0);
        assert!(model.duration_frames(100.0) < model.duration_frames(80.0));
    }

    #[test]
    fn invalid_velocity_has_no_duration() {
        let model = FlightTimeModel::default();
        assert_eq!(model.duration_frames(0.0), 0);
        assert_eq!(model.duration_frames(-90.0), 0);
        assert_eq!(model.duration_frames(f64::NAN), 0);
    }
}
