use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::OpError;
use crate::ops::Command;

/// Number of versions kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Room for the baseline plus at least one edit.
const MIN_CAPACITY: usize = 2;

// ============================================================================
// VERSION - one applied edit and the image it produced
// ============================================================================

/// A recorded edit: the command and the image that resulted from running it.
#[derive(Clone, Debug)]
pub struct Version {
    command: Command,
    image: RgbaImage,
}

impl Version {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn description(&self) -> String {
        self.command.label()
    }

    /// Bytes held by the stored image.
    pub fn memory_size(&self) -> usize {
        self.image.as_raw().len()
    }
}

// ============================================================================
// CONTROLLER - bounded linear undo/redo over applied commands
// ============================================================================

/// Edit history with a cursor.
///
/// Holds at most `capacity` versions, the opening baseline included. Applying
/// an edit after an undo drops everything past the cursor; applying one when
/// full evicts the oldest version, so the baseline is the first to go.
///
/// `undo`/`redo` panic when called without a matching `can_undo`/`can_redo`.
pub struct Controller {
    versions: VecDeque<Version>,
    current: usize,
    capacity: usize,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Controller {
    /// `capacity` below 2 is raised to 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            versions: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY + 1)),
            current: 0,
            capacity,
        }
    }

    /// Start a fresh history with `image` as the baseline at cursor 0.
    pub fn open(&mut self, image: &RgbaImage) {
        self.versions.clear();
        self.current = 0;
        self.versions.push_back(Version {
            command: Command::Identity,
            image: image.clone(),
        });
        crate::log_info!("History: opened {}x{} image", image.width(), image.height());
    }

    /// Run `command` on `image`, record the result and return it.
    ///
    /// Errors from the command are returned as-is and leave the history
    /// untouched.
    pub fn apply(&mut self, command: Command, image: &RgbaImage) -> Result<RgbaImage, OpError> {
        let result = command.execute(image)?;
        self.record(Version {
            command,
            image: result.clone(),
        });
        Ok(result)
    }

    fn record(&mut self, version: Version) {
        if !self.versions.is_empty() {
            let keep = self.current + 1;
            if keep < self.versions.len() {
                crate::log_info!("History: discarding {} redo step(s)", self.versions.len() - keep);
                self.versions.truncate(keep);
            }
        }

        self.versions.push_back(version);

        while self.versions.len() > self.capacity {
            if let Some(evicted) = self.versions.pop_front() {
                crate::log_info!("History: evicted oldest version '{}'", evicted.description());
            }
        }

        self.current = self.versions.len() - 1;
    }

    /// Step back one version and return its image.
    ///
    /// # Panics
    /// If `can_undo()` is false.
    pub fn undo(&mut self) -> RgbaImage {
        assert!(self.can_undo(), "undo() called with nothing to undo; check can_undo() first");
        self.current -= 1;
        self.versions[self.current].image().clone()
    }

    /// Step forward one version and return its image.
    ///
    /// # Panics
    /// If `can_redo()` is false.
    pub fn redo(&mut self) -> RgbaImage {
        assert!(self.can_redo(), "redo() called with nothing to redo; check can_redo() first");
        self.current += 1;
        self.versions[self.current].image().clone()
    }

    /// True when the cursor is past the oldest retained version.
    pub fn can_undo(&self) -> bool {
        !self.versions.is_empty() && self.current > 0
    }

    /// True when versions exist after the cursor.
    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.versions.len()
    }

    // ------------------------------------------------------------------
    // One entry point per operation
    // ------------------------------------------------------------------

    pub fn saturate(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Saturate { value }, image)
    }

    pub fn crop(&mut self, image: &RgbaImage, width: u32, height: u32, x: u32, y: u32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Crop { width, height, x, y }, image)
    }

    pub fn rotate_in_frame(&mut self, image: &RgbaImage, angle: f64) -> Result<RgbaImage, OpError> {
        self.apply(Command::RotateInFrame { angle }, image)
    }

    pub fn brighten(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Brighten { value }, image)
    }

    pub fn hue(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Hue { value }, image)
    }

    pub fn contrast(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Contrast { value }, image)
    }

    pub fn lighten(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Lighten { value }, image)
    }

    pub fn gray(&mut self, image: &RgbaImage) -> Result<RgbaImage, OpError> {
        self.apply(Command::Gray, image)
    }

    /// `other` is kept by the recorded command, so the caller may drop or
    /// replace its own copy freely.
    pub fn blend(
        &mut self,
        image: &RgbaImage,
        other: impl Into<Arc<RgbaImage>>,
        alpha: f32,
    ) -> Result<RgbaImage, OpError> {
        self.apply(Command::Blend { other: other.into(), alpha }, image)
    }

    pub fn tint(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Tint { value }, image)
    }

    pub fn temperature(&mut self, image: &RgbaImage, value: i32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Temperature { value }, image)
    }

    pub fn blur(&mut self, image: &RgbaImage, sigma: f32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Blur { sigma }, image)
    }

    pub fn sharpen(&mut self, image: &RgbaImage, amount: f32) -> Result<RgbaImage, OpError> {
        self.apply(Command::Sharpen { amount }, image)
    }

    pub fn transform_perspective(&mut self, image: &RgbaImage, quad: [(f32, f32); 4]) -> Result<RgbaImage, OpError> {
        self.apply(Command::TransformPerspective { quad }, image)
    }

    pub fn apply_color(&mut self, image: &RgbaImage, r: u8, g: u8, b: u8, alpha: f32) -> Result<RgbaImage, OpError> {
        self.apply(Command::ApplyColor { r, g, b, alpha }, image)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Image at the cursor, `None` before the first `open`.
    pub fn current_image(&self) -> Option<&RgbaImage> {
        self.versions.get(self.current).map(Version::image)
    }

    /// Cursor position, `None` before the first `open`.
    pub fn current_index(&self) -> Option<usize> {
        (!self.versions.is_empty()).then_some(self.current)
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Label of the edit `undo()` would revert.
    pub fn undo_description(&self) -> Option<String> {
        self.can_undo().then(|| self.versions[self.current].description())
    }

    /// Label of the edit `redo()` would reapply.
    pub fn redo_description(&self) -> Option<String> {
        self.can_redo().then(|| self.versions[self.current + 1].description())
    }

    /// Labels of all retained versions, oldest first.
    pub fn descriptions(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.description()).collect()
    }

    /// Bytes held by all retained images.
    pub fn memory_usage(&self) -> usize {
        self.versions.iter().map(|v| v.memory_size()).sum()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn base() -> RgbaImage {
        RgbaImage::from_fn(6, 4, |x, y| Rgba([40 + x as u8 * 10, 60 + y as u8 * 10, 90, 255]))
    }

    fn tint_values(c: &Controller) -> Vec<i32> {
        c.versions()
            .filter_map(|v| match v.command() {
                Command::Tint { value } => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Opens `base()` and applies `Tint { value: i }` for i in 1..=n.
    fn with_edits(capacity: usize, n: i32) -> (Controller, Vec<RgbaImage>) {
        let mut c = Controller::new(capacity);
        let mut img = base();
        c.open(&img);
        let mut images = vec![img.clone()];
        for i in 1..=n {
            img = c.tint(&img, i).unwrap();
            images.push(img.clone());
        }
        (c, images)
    }

    #[test]
    fn test_open_sets_baseline() {
        let mut c = Controller::default();
        assert!(c.is_empty());
        assert_eq!(c.current_index(), None);
        assert!(!c.can_undo());
        assert!(!c.can_redo());

        c.open(&base());
        assert_eq!(c.len(), 1);
        assert_eq!(c.current_index(), Some(0));
        assert_eq!(c.current_image(), Some(&base()));
        assert_eq!(c.versions().next().map(|v| v.command()), Some(&Command::Identity));
        assert!(!c.can_undo());
        assert!(!c.can_redo());
    }

    #[test]
    fn test_open_resets_history() {
        let (mut c, _) = with_edits(10, 3);
        let fresh = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        c.open(&fresh);
        assert_eq!(c.len(), 1);
        assert_eq!(c.current_image(), Some(&fresh));
        assert!(!c.can_undo());
    }

    #[test]
    fn test_stored_image_is_result_not_input() {
        let mut c = Controller::default();
        let img = base();
        c.open(&img);
        let out = c.gray(&img).unwrap();
        assert_ne!(out, img);
        assert_eq!(c.current_image(), Some(&out));
    }

    #[test]
    fn test_undo_k_times_returns_to_baseline() {
        for k in 1..=9 {
            let (mut c, images) = with_edits(10, k);
            assert!(c.can_undo());
            let mut last = None;
            for _ in 0..k {
                last = Some(c.undo());
            }
            assert_eq!(last.as_ref(), Some(&images[0]));
            assert!(!c.can_undo());
        }
    }

    #[test]
    fn test_undo_then_redo_is_idempotent() {
        let (mut c, images) = with_edits(10, 4);
        c.undo();
        let before = c.current_image().cloned();
        assert_eq!(before.as_ref(), Some(&images[3]));
        c.undo();
        let redone = c.redo();
        assert_eq!(Some(redone), before);
        assert!(c.can_redo());
    }

    #[test]
    fn test_apply_after_undo_discards_redo() {
        let (mut c, images) = with_edits(10, 3);
        let prev = c.undo();
        assert_eq!(prev, images[2]);
        assert!(c.can_redo());

        c.brighten(&prev, 10).unwrap();
        assert!(!c.can_redo());
        assert_eq!(c.len(), 4);
        assert_eq!(tint_values(&c), vec![1, 2]);
    }

    #[test]
    fn test_capacity_plus_one_evicts_oldest() {
        let (mut c, images) = with_edits(10, 11);
        assert_eq!(c.len(), 10);
        assert_eq!(c.current_index(), Some(9));
        assert_eq!(tint_values(&c), (2..=11).collect::<Vec<_>>());
        assert!(c.versions().all(|v| v.command() != &Command::Identity));

        let mut last = images[11].clone();
        while c.can_undo() {
            last = c.undo();
        }
        assert_eq!(last, images[2]);
        assert_ne!(last, images[0]);
    }

    #[test]
    fn test_twelve_edits_leave_ten_addressable() {
        let (mut c, images) = with_edits(10, 12);
        assert_eq!(c.len(), 10);
        let mut undos = 0;
        while c.can_undo() {
            c.undo();
            undos += 1;
        }
        assert_eq!(undos, 9);
        assert_eq!(c.current_image(), Some(&images[3]));
        let mut redos = 0;
        while c.can_redo() {
            c.redo();
            redos += 1;
        }
        assert_eq!(redos, 9);
        assert_eq!(c.current_image(), Some(&images[12]));
    }

    #[test]
    fn test_cursor_pins_at_capacity() {
        let (c, _) = with_edits(3, 7);
        assert_eq!(c.len(), 3);
        assert_eq!(c.current_index(), Some(2));
        assert_eq!(tint_values(&c), vec![5, 6, 7]);
    }

    #[test]
    fn test_rotate_gray_scenario() {
        let mut c = Controller::default();
        let a = base();
        c.open(&a);
        let b = c.rotate_in_frame(&a, 90.0).unwrap();
        let cc = c.gray(&b).unwrap();
        assert_ne!(b, cc);

        assert_eq!(c.undo(), b);
        assert_eq!(c.undo(), a);
        assert!(!c.can_undo());
        assert_eq!(c.redo(), b);

        let d = c.blur(&b, 2.0).unwrap();
        assert!(!c.can_redo());
        assert_eq!(c.len(), 3);
        assert_eq!(c.current_image(), Some(&d));
        assert_eq!(c.undo(), b);
    }

    #[test]
    fn test_failed_command_leaves_history_untouched() {
        let (mut c, images) = with_edits(10, 2);
        c.undo();
        let img = images[1].clone();
        let err = c.crop(&img, 100, 100, 0, 0).unwrap_err();
        assert!(matches!(err, OpError::CropOutOfBounds { .. }));
        assert_eq!(c.len(), 3);
        assert_eq!(c.current_index(), Some(1));
        assert!(c.can_redo());
    }

    #[test]
    fn test_blend_owns_second_image() {
        let mut c = Controller::default();
        let img = base();
        c.open(&img);
        let other = RgbaImage::from_pixel(6, 4, Rgba([0, 0, 0, 255]));
        let out = c.blend(&img, other, 0.5).unwrap();
        match c.versions().last().map(|v| v.command()) {
            Some(Command::Blend { other, alpha }) => {
                assert_eq!(other.dimensions(), (6, 4));
                assert_eq!(*alpha, 0.5);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(c.current_image(), Some(&out));
    }

    #[test]
    fn test_descriptions_and_memory() {
        let mut c = Controller::default();
        let img = base();
        c.open(&img);
        let a = c.saturate(&img, 10).unwrap();
        c.contrast(&a, 20).unwrap();
        assert_eq!(c.descriptions(), vec!["Open", "Saturation +10", "Contrast +20"]);
        assert_eq!(c.undo_description().as_deref(), Some("Contrast +20"));
        assert_eq!(c.redo_description(), None);
        c.undo();
        assert_eq!(c.redo_description().as_deref(), Some("Contrast +20"));
        assert_eq!(c.memory_usage(), 3 * 6 * 4 * 4);
    }

    #[test]
    fn test_minimum_capacity() {
        let (c, _) = with_edits(0, 3);
        assert_eq!(c.capacity(), 2);
        assert_eq!(c.len(), 2);
        assert!(c.can_undo());
    }

    #[test]
    fn test_blur_with_huge_sigma_is_recorded() {
        let mut c = Controller::default();
        let img = base();
        c.open(&img);
        let out = c.blur(&img, 1e9).unwrap();
        assert_eq!(out.dimensions(), img.dimensions());
        assert_eq!(c.len(), 2);
        assert_eq!(c.undo(), img);
    }

    #[test]
    fn test_unbounded_capacity_does_not_preallocate() {
        let mut c = Controller::new(usize::MAX);
        assert_eq!(c.capacity(), usize::MAX);
        let img = base();
        c.open(&img);
        let a = c.tint(&img, 1).unwrap();
        let b = c.tint(&a, 2).unwrap();
        c.tint(&b, 3).unwrap();
        assert_eq!(c.len(), 4);
        assert_eq!(c.undo(), b);
        assert_eq!(c.undo(), a);
        assert_eq!(c.undo(), img);
        assert!(!c.can_undo());
    }

    #[test]
    #[should_panic(expected = "nothing to undo")]
    fn test_undo_at_baseline_panics() {
        let mut c = Controller::default();
        c.open(&base());
        c.undo();
    }

    #[test]
    #[should_panic(expected = "nothing to redo")]
    fn test_redo_at_tail_panics() {
        let (mut c, _) = with_edits(10, 2);
        c.redo();
    }
}
