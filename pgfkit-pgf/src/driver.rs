//! The scene driver: one render, start to finish.
//!
//! A render writes the picture header, replays the scene into a
//! [`RenderSession`], places the post-hoc texts and writes the footer. The
//! metrics oracle belongs to the session: it starts on the first text
//! measurement and is stopped when the session ends, whether the render
//! succeeded or not.

use std::io::{BufWriter, IntoInnerError, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kurbo::Point;
use pgfkit_graphics::{Device, GraphicsState, Inches, Path as GraphicsPath, TexPoint};
use pgfkit_oracle::{CancelToken, MetricsOracle, SystemTex, TexEngine};
use pgfkit_tex::preamble::setup_lines;
use pgfkit_tex::{FontDescriptor, FontLookup, FontTranslator, SystemFonts, TexConfig, texify};

use crate::compile::{CommandRunner, FIGURE_STEM, SystemRunner, compile_in, standalone_document};
use crate::emit::Emitter;
use crate::error::RenderError;
use crate::image::RasterImage;
use crate::scene::{DrawSink, Scene, TextExtent, TextItem};
use crate::writer::PgfWriter;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Output options that do not affect TeX itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Decimal places for every number; trailing zeros are trimmed.
    pub precision: usize,
    /// Emit text draw calls from the draw stream. Post-hoc texts are
    /// always emitted.
    pub draw_texts: bool,
    /// Named in the header comment.
    pub creator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            draw_texts: true,
            creator: format!("pgfkit {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Where raster images of a fragment are written: `<dir>/<stem>-img<N>.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub dir: PathBuf,
    pub stem: String,
}

impl ImageTarget {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Images next to the output file `path`, named after it.
    pub fn beside(path: &Path) -> Self {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
            _ => PathBuf::from("."),
        };
        let stem = path
            .file_stem()
            .map_or_else(|| FIGURE_STEM.to_owned(), |s| s.to_string_lossy().into_owned());
        Self { dir, stem }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders scenes to PGF fragments or compiled PDFs.
pub struct Renderer {
    config: TexConfig,
    options: RenderOptions,
    lookup: Arc<dyn FontLookup>,
    engine: Arc<dyn TexEngine>,
    cancel: CancelToken,
}

impl Renderer {
    /// A renderer using the system fonts and the configured TeX binary.
    pub fn new(config: TexConfig) -> Self {
        let engine = SystemTex::new(config.texsystem);
        Self::with_parts(config, Arc::new(SystemFonts::load()), Arc::new(engine))
    }

    pub fn with_parts(
        config: TexConfig,
        lookup: Arc<dyn FontLookup>,
        engine: Arc<dyn TexEngine>,
    ) -> Self {
        Self {
            config,
            options: RenderOptions::default(),
            lookup,
            engine,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `cancel` to abort pending text measurements from another thread.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn config(&self) -> &TexConfig {
        &self.config
    }

    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Write `scene` as a PGF fragment to `out` and hand `out` back.
    ///
    /// Images go to `images`; a scene with images and no target fails with
    /// [`RenderError::NoImageTarget`].
    pub fn render_fragment<W: Write>(
        &self,
        scene: &dyn Scene,
        out: W,
        images: Option<&ImageTarget>,
    ) -> Result<W, RenderError> {
        let resolution = scene.resolution();
        let emitter = Emitter::new(PgfWriter::new(out, self.options.precision), resolution);
        let mut session = RenderSession {
            renderer: self,
            emitter,
            translator: FontTranslator::new(Arc::clone(&self.lookup), self.config.texsystem),
            oracle: None,
            images,
            image_count: 0,
        };

        let (width, height) = scene.size();
        let name = images.map_or(FIGURE_STEM, |t| t.stem.as_str());
        session.header(width, height, name)?;
        scene.draw(&mut session)?;
        for item in scene.texts() {
            session.place_text(&item)?;
        }
        session.footer()?;
        session.finish()
    }

    /// Compile `scene` into a standalone PDF at `dest`.
    ///
    /// TeX runs in a scratch directory that is removed afterwards, whether
    /// the compile succeeded or not.
    pub fn render_document(
        &self,
        scene: &dyn Scene,
        dest: &Path,
        runner: &dyn CommandRunner,
    ) -> Result<(), RenderError> {
        let scratch = tempfile::Builder::new().prefix("pgfkit-compile").tempdir()?;
        let target = ImageTarget::new(scratch.path(), FIGURE_STEM);

        let result = self
            .render_fragment(scene, Vec::new(), Some(&target))
            .and_then(|bytes| {
                let fragment = String::from_utf8_lossy(&bytes);
                let (width, height) = scene.size();
                let document =
                    standalone_document(&self.config, self.lookup.as_ref(), width, height);
                compile_in(
                    scratch.path(),
                    runner,
                    self.config.texsystem.program(),
                    &fragment,
                    &document,
                    dest,
                )
            });

        if let Err(e) = scratch.close() {
            log::warn!("cannot remove the compile directory: {e}");
        }
        result
    }

    /// Save `scene` to `path`, as a fragment (`.pgf`) or a PDF (`.pdf`).
    pub fn save(&self, scene: &dyn Scene, path: &Path) -> Result<(), RenderError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pgf" => {
                // A failed render must not leave a truncated file at `path`.
                let target = ImageTarget::beside(path);
                let tmp = tempfile::Builder::new()
                    .prefix(".pgfkit")
                    .suffix(".pgf")
                    .tempfile_in(&target.dir)?;
                let mut file = self.render_fragment(scene, BufWriter::new(tmp), Some(&target))?;
                file.flush()?;
                let tmp = file.into_inner().map_err(IntoInnerError::into_error)?;
                tmp.persist(path).map_err(|e| e.error)?;
                Ok(())
            }
            "pdf" => self.render_document(scene, path, &SystemRunner),
            _ => Err(RenderError::UnsupportedFormat(extension)),
        }
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("engine", &self.engine.program())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RenderSession
// ---------------------------------------------------------------------------

/// State of one render in progress.
struct RenderSession<'a, W> {
    renderer: &'a Renderer,
    emitter: Emitter<W>,
    translator: FontTranslator,
    oracle: Option<MetricsOracle>,
    images: Option<&'a ImageTarget>,
    image_count: usize,
}

impl<W: Write> RenderSession<'_, W> {
    fn header(&mut self, width: Inches, height: Inches, name: &str) -> Result<(), RenderError> {
        let renderer = self.renderer;
        let out = self.emitter.writer();
        out.comment(&format!("Creator: {}", renderer.options.creator))?;
        out.comment("")?;
        out.comment("Include this figure in a LaTeX document with")?;
        out.comment(&format!("  \\input{{{name}.pgf}}"))?;
        out.comment("")?;
        out.comment("The document preamble needs")?;
        out.comment("  \\usepackage{pgf}")?;
        out.comment("")?;
        out.comment("Raster images are referenced relative to the main document. To input")?;
        out.comment("the figure from another directory, load the import package")?;
        out.comment("  \\usepackage{import}")?;
        out.comment("and include the figure with")?;
        out.comment(&format!("  \\import{{<path to file>}}{{{name}.pgf}}"))?;
        let preamble = setup_lines(&renderer.config, renderer.lookup.as_ref());
        if !preamble.is_empty() {
            out.comment("")?;
            out.comment("Text was measured and should be typeset with this preamble")?;
            for line in &preamble {
                out.comment(&format!("  {line}"))?;
            }
        }
        out.comment("")?;

        out.line(r"\begingroup")?;
        out.line(r"\makeatletter")?;
        out.line(r"\begin{pgfpicture}")?;
        let size = out.point(TexPoint::new(width.to_tex(), height.to_tex()));
        out.line(&format!(r"\pgfpathrectangle{{\pgfpointorigin}}{{{size}}}"))?;
        out.line(r"\pgfusepath{use as bounding box, clip}")?;

        // one device pixel along each axis
        let unit = self.emitter.resolution.to_tex(Device(1.0));
        let out = self.emitter.writer();
        let unit = out.dim(unit);
        out.line(&format!(r"\pgfsetxvec{{\pgfqpoint{{{unit}}}{{0pt}}}}"))?;
        out.line(&format!(r"\pgfsetyvec{{\pgfqpoint{{0pt}}{{{unit}}}}}"))?;
        Ok(())
    }

    fn footer(&mut self) -> Result<(), RenderError> {
        let out = self.emitter.writer();
        out.line(r"\end{pgfpicture}")?;
        out.line(r"\makeatother")?;
        out.line(r"\endgroup")?;
        Ok(())
    }

    /// Stop the oracle and return the output.
    fn finish(mut self) -> Result<W, RenderError> {
        if let Some(mut oracle) = self.oracle.take() {
            log::debug!(
                "render finished after {} text measurements",
                oracle.round_trips()
            );
            oracle.terminate();
        }
        let mut out = self.emitter.into_writer();
        out.flush()?;
        Ok(out.into_inner())
    }

    /// Emit `item` unless it is invisible or empty.
    fn place_text(&mut self, item: &TextItem) -> Result<(), RenderError> {
        if !item.visible || item.text.is_empty() {
            return Ok(());
        }
        let body = texify(&item.text, self.renderer.config.display_math);
        let fonts = self.translator.commands(&item.font);
        self.emitter.text(item, &fonts, &body)?;
        Ok(())
    }

    fn oracle(&mut self) -> Result<&mut MetricsOracle, RenderError> {
        let oracle = match self.oracle.take() {
            Some(oracle) => oracle,
            None => {
                log::debug!("starting {} for text metrics", self.renderer.engine.program());
                MetricsOracle::start_with_cancel(
                    &self.renderer.config,
                    self.translator.clone(),
                    self.renderer.engine.as_ref(),
                    self.renderer.cancel.clone(),
                )?
            }
        };
        Ok(self.oracle.insert(oracle))
    }
}

impl<W: Write> DrawSink for RenderSession<'_, W> {
    fn draw_path(&mut self, gc: &GraphicsState, path: &GraphicsPath) -> Result<(), RenderError> {
        gc.validate()?;
        self.emitter.path(gc, path)?;
        Ok(())
    }

    fn draw_markers(
        &mut self,
        gc: &GraphicsState,
        marker: &GraphicsPath,
        path: &GraphicsPath,
    ) -> Result<(), RenderError> {
        gc.validate()?;
        let placed = self.emitter.markers(gc, marker, path)?;
        log::debug!("placed {placed} markers");
        Ok(())
    }

    fn draw_text(&mut self, item: &TextItem) -> Result<(), RenderError> {
        if !self.renderer.options.draw_texts {
            return Ok(());
        }
        self.place_text(item)
    }

    fn draw_image(
        &mut self,
        gc: &GraphicsState,
        origin: Point,
        image: &RasterImage,
    ) -> Result<(), RenderError> {
        if image.is_empty() {
            log::debug!("skipping an empty image");
            return Ok(());
        }
        let target = self.images.ok_or(RenderError::NoImageTarget)?;
        let name = format!("{}-img{}.png", target.stem, self.image_count);
        image.write_png(&target.dir.join(&name))?;
        self.image_count += 1;
        self.emitter
            .image(gc, origin, image.width(), image.height(), &name)?;
        Ok(())
    }

    fn text_extent(
        &mut self,
        text: &str,
        font: &FontDescriptor,
    ) -> Result<TextExtent, RenderError> {
        let body = texify(text, self.renderer.config.display_math);
        let resolution = self.emitter.resolution;
        let metrics = self.oracle()?.measure(&body, font)?;
        let (width, height, descent) = metrics.to_device(resolution);
        Ok(TextExtent {
            width,
            height,
            descent,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
