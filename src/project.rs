use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::components::Controller;
use crate::error::{EditorError, Result};
use crate::io::{SaveFormat, encode_and_write, load_image};
use crate::ops::{Command, EditStep};
use crate::upload::{ImageHost, UploadTask};

/// What running one edit step did.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Applied(String),
    Undone,
    Redone,
    NothingToUndo,
    NothingToRedo,
}

/// Single open document: the image on screen plus its edit history.
pub struct Project {
    image: Option<RgbaImage>,
    pub history: Controller,
    /// `None` until a file is opened or saved.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
    /// Display name (derived from path, or "Untitled")
    pub name: String,
}

impl Project {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            image: None,
            history: Controller::new(history_capacity),
            path: None,
            is_dirty: false,
            name: "Untitled".to_string(),
        }
    }

    /// Load `path` and make it the history baseline.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let image = load_image(path)?;
        self.open_image(image, display_name(path));
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Start editing an in-memory image.
    pub fn open_image(&mut self, image: RgbaImage, name: String) {
        self.history.open(&image);
        self.image = Some(image);
        self.path = None;
        self.name = name;
        self.is_dirty = false;
    }

    pub fn image(&self) -> Result<&RgbaImage> {
        self.image.as_ref().ok_or(EditorError::NoImage)
    }

    /// Run one command against the current image and record it.
    pub fn apply(&mut self, command: Command) -> Result<String> {
        let label = command.label();
        let current = self.image.as_ref().ok_or(EditorError::NoImage)?;
        let next = self.history.apply(command, current)?;
        self.image = Some(next);
        self.is_dirty = true;
        Ok(label)
    }

    /// Run a parsed step. Undo/redo with nothing to step to are reported,
    /// not treated as errors.
    pub fn run_step(&mut self, step: &EditStep) -> Result<StepOutcome> {
        self.image()?;
        match step {
            EditStep::Apply(command) => self.apply(command.clone()).map(StepOutcome::Applied),
            EditStep::Blend { path, alpha } => {
                let other = load_image(path)?;
                let command = Command::Blend { other: Arc::new(other), alpha: *alpha };
                self.apply(command).map(StepOutcome::Applied)
            }
            EditStep::Undo => {
                if !self.history.can_undo() {
                    return Ok(StepOutcome::NothingToUndo);
                }
                self.image = Some(self.history.undo());
                self.is_dirty = true;
                Ok(StepOutcome::Undone)
            }
            EditStep::Redo => {
                if !self.history.can_redo() {
                    return Ok(StepOutcome::NothingToRedo);
                }
                self.image = Some(self.history.redo());
                self.is_dirty = true;
                Ok(StepOutcome::Redone)
            }
        }
    }

    /// Write the current image. The format follows `format`, else the
    /// extension of `path`, else PNG.
    pub fn save(&mut self, path: &Path, format: Option<SaveFormat>, quality: u8) -> Result<()> {
        let format = format.or_else(|| SaveFormat::from_path(path)).unwrap_or_default();
        encode_and_write(self.image()?, path, format, quality)?;
        self.path = Some(path.to_path_buf());
        self.name = display_name(path);
        self.is_dirty = false;
        Ok(())
    }

    /// Upload the current image on a background thread.
    pub fn upload<H: ImageHost>(&self, host: H) -> Result<UploadTask> {
        Ok(UploadTask::spawn(host, self.image()?.clone()))
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::parse_step;
    use image::Rgba;

    fn project_with(image: RgbaImage) -> Project {
        let mut project = Project::new(10);
        project.open_image(image, "test".into());
        project
    }

    #[test]
    fn test_steps_need_an_image() {
        let mut project = Project::new(10);
        assert!(matches!(project.run_step(&EditStep::Undo), Err(EditorError::NoImage)));
        assert!(matches!(project.apply(Command::Gray), Err(EditorError::NoImage)));
    }

    #[test]
    fn test_run_steps_and_gated_undo() {
        let original = RgbaImage::from_pixel(4, 4, Rgba([200, 50, 50, 255]));
        let mut project = project_with(original.clone());

        assert_eq!(project.run_step(&EditStep::Undo).unwrap(), StepOutcome::NothingToUndo);
        assert_eq!(
            project.run_step(&parse_step("gray").unwrap()).unwrap(),
            StepOutcome::Applied("Black & White".into())
        );
        assert!(project.is_dirty);
        assert_eq!(project.display_title(), "test*");
        assert_ne!(project.image().unwrap(), &original);

        assert_eq!(project.run_step(&EditStep::Undo).unwrap(), StepOutcome::Undone);
        assert_eq!(project.image().unwrap(), &original);
        assert_eq!(project.run_step(&EditStep::Redo).unwrap(), StepOutcome::Redone);
        assert_eq!(project.run_step(&EditStep::Redo).unwrap(), StepOutcome::NothingToRedo);
    }

    #[test]
    fn test_failed_step_keeps_image() {
        let original = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let mut project = project_with(original.clone());
        let err = project.run_step(&parse_step("crop=10,10,0,0").unwrap()).unwrap_err();
        assert!(matches!(err, EditorError::Op(_)));
        assert_eq!(project.image().unwrap(), &original);
        assert_eq!(project.history.len(), 1);
    }

    #[test]
    fn test_blend_step_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let other_path = dir.path().join("black.png");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])).save(&other_path).unwrap();

        let mut project = project_with(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255])));
        let step = EditStep::Blend { path: other_path, alpha: 0.5 };
        assert!(matches!(project.run_step(&step).unwrap(), StepOutcome::Applied(_)));
        assert_eq!(project.image().unwrap().get_pixel(0, 0).0, [100, 50, 25, 255]);

        let missing = EditStep::Blend { path: dir.path().join("missing.png"), alpha: 0.5 };
        assert!(project.run_step(&missing).is_err());
    }

    #[test]
    fn test_open_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255])).save(&input).unwrap();

        let mut project = Project::new(10);
        project.open(&input).unwrap();
        assert_eq!(project.name, "in.png");
        assert_eq!(project.history.len(), 1);

        project.apply(Command::Tint { value: 10 }).unwrap();
        let output = dir.path().join("out.bmp");
        project.save(&output, None, 90).unwrap();
        assert!(!project.is_dirty);
        assert_eq!(project.path.as_deref(), Some(output.as_path()));
        assert_eq!(load_image(&output).unwrap().get_pixel(1, 1).0, [9, 19, 9, 255]);
    }
}
