// ============================================================================
// INTERACTIVE SHELL — line-oriented editing session over stdin/stdout
// ============================================================================

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::{EditorError, Result};
use crate::io::SaveFormat;
use crate::ops::parse_step;
use crate::project::{Project, StepOutcome};
use crate::settings::Settings;
use crate::upload::{ImageHost, ImgurHost, UploadError, UploadTask};

const HELP: &str = "\
Commands:
  open FILE            load an image and start a new history
  save [FILE] [FMT]    write the current image (png, jpeg, webp, bmp, tga, tiff)
  undo | redo          step through the history
  history              list retained versions
  info                 show image and history details
  upload               upload the current image to Imgur in the background
  help                 show this text
  quit                 leave (waits for a running upload)

Edit steps:
  rotate=DEG  crop=W,H,X,Y  saturate=N  brighten=N  hue=N  contrast=N
  lighten=N  gray  tint=N  temperature=N  blur=SIGMA  sharpen=AMOUNT
  color=R,G,B,ALPHA  blend=FILE,ALPHA  perspective=X0,Y0,X1,Y1,X2,Y2,X3,Y3";

type HostFactory = Box<dyn Fn(&Settings) -> std::result::Result<Box<dyn ImageHost>, UploadError>>;

enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    project: Project,
    settings: Settings,
    make_host: HostFactory,
    pending_upload: Option<UploadTask>,
}

impl Shell {
    pub fn new(settings: Settings) -> Self {
        Self::with_host_factory(
            settings,
            Box::new(|s: &Settings| Ok(Box::new(ImgurHost::from_settings(s)?) as Box<dyn ImageHost>)),
        )
    }

    pub fn with_host_factory(settings: Settings, make_host: HostFactory) -> Self {
        Self {
            project: Project::new(settings.history_capacity),
            settings,
            make_host,
            pending_upload: None,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Read commands until EOF or `quit`. Command errors are printed and the
    /// session continues; only I/O failures on `input`/`out` end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "PhotoFE shell. Type 'help' for commands.")?;
        let mut lines = input.lines();

        loop {
            self.report_upload(out, false)?;
            write!(out, "{}> ", self.project.display_title())?;
            out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            crate::log_info!("Shell: {}", line);
            match self.execute(line, out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(EditorError::Io(e)) => return Err(e),
                Err(e) => {
                    crate::log_err!("Shell: '{}' failed: {}", line, e);
                    writeln!(out, "error: {}", e)?;
                }
            }
        }

        self.report_upload(out, true)
    }

    fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => return Ok(Flow::Quit),
            "help" | "?" => writeln!(out, "{}", HELP)?,
            "open" => {
                if rest.is_empty() {
                    writeln!(out, "usage: open FILE")?;
                } else {
                    self.project.open(Path::new(rest))?;
                    let (w, h) = self.project.image()?.dimensions();
                    writeln!(out, "opened {} ({}x{})", self.project.name, w, h)?;
                }
            }
            "save" => self.save(rest, out)?,
            "history" => self.print_history(out)?,
            "info" => self.print_info(out)?,
            "upload" => self.start_upload(out)?,
            _ => {
                let step = parse_step(line)?;
                match self.project.run_step(&step)? {
                    StepOutcome::Applied(label) => writeln!(out, "applied {}", label)?,
                    StepOutcome::Undone => writeln!(out, "undone")?,
                    StepOutcome::Redone => writeln!(out, "redone")?,
                    StepOutcome::NothingToUndo => writeln!(out, "nothing to undo")?,
                    StepOutcome::NothingToRedo => writeln!(out, "nothing to redo")?,
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn save<W: Write>(&mut self, args: &str, out: &mut W) -> Result<()> {
        let mut parts = args.split_whitespace();
        let path = match parts.next() {
            Some(p) => Path::new(p).to_path_buf(),
            None => match &self.project.path {
                Some(p) => p.clone(),
                None => {
                    writeln!(out, "usage: save FILE [FORMAT]")?;
                    return Ok(());
                }
            },
        };
        let format = match parts.next() {
            Some(name) => match SaveFormat::from_name(name) {
                Some(f) => Some(f),
                None => {
                    writeln!(out, "unknown format '{}'", name)?;
                    return Ok(());
                }
            },
            None => None,
        };
        self.project.save(&path, format, self.settings.jpeg_quality)?;
        writeln!(out, "saved {}", path.display())?;
        Ok(())
    }

    fn print_history<W: Write>(&self, out: &mut W) -> Result<()> {
        let history = &self.project.history;
        if history.is_empty() {
            writeln!(out, "history is empty")?;
            return Ok(());
        }
        let current = history.current_index();
        for (i, description) in history.descriptions().iter().enumerate() {
            let marker = if Some(i) == current { '>' } else { ' ' };
            writeln!(out, "{} {:>2}  {}", marker, i, description)?;
        }
        Ok(())
    }

    fn print_info<W: Write>(&self, out: &mut W) -> Result<()> {
        let image = self.project.image()?;
        let history = &self.project.history;
        writeln!(out, "name:     {}", self.project.display_title())?;
        writeln!(out, "size:     {}x{}", image.width(), image.height())?;
        writeln!(out, "history:  {}/{} versions", history.len(), history.capacity())?;
        writeln!(
            out,
            "undo:     {}",
            history.undo_description().unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(
            out,
            "redo:     {}",
            history.redo_description().unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(out, "memory:   {:.1} MiB", history.memory_usage() as f64 / (1024.0 * 1024.0))?;
        match crate::logger::log_path() {
            Some(path) => writeln!(out, "log:      {}", path.display())?,
            None => writeln!(out, "log:      -")?,
        }
        Ok(())
    }

    fn start_upload<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.pending_upload.is_some() {
            writeln!(out, "an upload is already running")?;
            return Ok(());
        }
        let host = (self.make_host)(&self.settings)?;
        self.pending_upload = Some(self.project.upload(host)?);
        writeln!(out, "uploading in the background...")?;
        Ok(())
    }

    /// Print a finished upload. With `block`, wait for a running one first.
    fn report_upload<W: Write>(&mut self, out: &mut W, block: bool) -> io::Result<()> {
        let Some(task) = self.pending_upload.take() else { return Ok(()) };
        let result = if block {
            task.wait()
        } else {
            match task.poll() {
                Some(result) => result,
                None => {
                    self.pending_upload = Some(task);
                    return Ok(());
                }
            }
        };
        match result {
            Ok(response) => {
                writeln!(out, "uploaded: {}", response.link)?;
                writeln!(out, "delete:   {}", response.delete_url())?;
            }
            Err(e) => writeln!(out, "upload failed: {}", e)?,
        }
        Ok(())
    }
}
