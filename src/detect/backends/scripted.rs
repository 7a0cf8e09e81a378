use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;

/// Backend that replays pre-programmed detections, keyed by call number.
///
/// Call numbers start at 0 and count every `predict` invocation, so with a
/// window starting at frame `s` the call for frame `f` is `f - s`. Calls with
/// no programmed response return no boxes.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: HashMap<u64, Vec<RawDetection>>,
    fail_on: Option<u64>,
    calls: Rc<Cell<u64>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `detections` (in this order) from call number `call`.
    pub fn on_call(mut self, call: u64, detections: Vec<RawDetection>) -> Self {
        self.responses.insert(call, detections);
        self
    }

    /// Fail call number `call` with a backend error.
    pub fn fail_on_call(mut self, call: u64) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Shared counter of `predict` calls, readable after the backend is boxed.
    pub fn call_counter(&self) -> Rc<Cell<u64>> {
        Rc::clone(&self.calls)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn predict(
        &mut self,
        _image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        let call = self.calls.get();
        self.calls.set(call + 1);

        if self.fail_on == Some(call) {
            return Err(anyhow!("scripted failure on call {}", call));
        }

        Ok(self
            .responses
            .get(&call)
            .map(|detections| {
                detections
                    .iter()
                    .filter(|d| d.confidence >= confidence_threshold)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_responses_in_call_order() {
        let first = RawDetection::new(1.0, 2.0, 3.0, 4.0, 0.5);
        let second = RawDetection::new(5.0, 6.0, 7.0, 8.0, 0.2);
        let mut backend = ScriptedBackend::new().on_call(1, vec![first, second]);
        let counter = backend.call_counter();
        let image = RgbImage::new(1, 1);

        assert!(backend.predict(&image, 0.0).unwrap().is_empty());
        assert_eq!(backend.predict(&image, 0.0).unwrap(), vec![first, second]);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn applies_threshold_and_scripted_failures() {
        let low = RawDetection::new(0.0, 0.0, 1.0, 1.0, 0.01);
        let mut backend = ScriptedBackend::new()
            .on_call(0, vec![low])
            .fail_on_call(1);
        let image = RgbImage::new(1, 1);

        assert!(backend.predict(&image, 0.03).unwrap().is_empty());
        assert!(backend.predict(&image, 0.03).is_err());
    }
}
