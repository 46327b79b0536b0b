//! Minimal Typst `World`: one in-memory main source plus a fixed font set.
//!
//! - The embedded `typst-assets` fonts are always loaded first, so the math font is
//!   the same on every machine and glyph shapes are reproducible.
//! - System fonts (via `fontdb`) can be appended for text in other scripts.
//! - No packages, imports or binary assets. `today()` is `None`.
//!
//! `typst` wants a `LazyHash<Library>`, a `LazyHash<FontBook>` and
//! `font(index)` with indices consistent with the book; fonts are kept in a `Vec`
//! in book order.

use std::{fs, path::PathBuf};

use anyhow::Context;
use fontdb::{Database, Source as FontSource};
use typst::{
    Library, LibraryExt,
    diag::{FileError, FileResult},
    foundations::{Bytes, Datetime},
    layout::PagedDocument,
    syntax::{FileId, Source as TypstSource, VirtualPath},
    text::{Font, FontBook},
    utils::LazyHash,
};

/// Which fonts a [`TypstWorld`] provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontOptions {
    /// Append system fonts after the embedded set.
    pub system_fonts: bool,
}

pub struct TypstWorld {
    main: FileId,
    source: TypstSource,
    library: LazyHash<Library>,
    book: LazyHash<FontBook>,
    /// In the exact order of `book`.
    fonts: Vec<Font>,
}

impl TypstWorld {
    pub fn new(options: FontOptions) -> anyhow::Result<Self> {
        let main = FileId::new(None, VirtualPath::new("<stepcast>"));
        let fonts = load_fonts(options).context("loading fonts for the Typst world")?;
        let book = FontBook::from_fonts(fonts.iter());
        log::info!(
            "typst world ready: {} font face(s), system fonts {}",
            fonts.len(),
            if options.system_fonts { "on" } else { "off" }
        );

        Ok(Self {
            main,
            source: TypstSource::new(main, String::new()),
            library: LazyHash::new(Library::default()),
            book: LazyHash::new(book),
            fonts,
        })
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Replace the main document.
    pub fn set_main_source(&mut self, text: String) {
        self.source = TypstSource::new(self.main, text);
    }

    /// Compile the current main document.
    pub fn compile(&self) -> anyhow::Result<PagedDocument> {
        let warned = typst::compile::<PagedDocument>(self);
        for warning in &warned.warnings {
            log::debug!("typst warning: {}", warning.message);
        }
        warned.output.map_err(|errs| {
            let messages: Vec<&str> = errs.iter().map(|e| e.message.as_str()).collect();
            anyhow::anyhow!(
                "typst compile failed with {} error(s): {}",
                errs.len(),
                messages.join("; ")
            )
        })
    }
}

fn load_fonts(options: FontOptions) -> anyhow::Result<Vec<Font>> {
    let mut fonts: Vec<Font> = typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data)))
        .collect();

    if options.system_fonts {
        let mut db = Database::new();
        db.load_system_fonts();
        let before = fonts.len();
        for face in db.faces() {
            let path = match &face.source {
                FontSource::File(p) => p.clone(),
                _ => continue,
            };
            let Ok(bytes) = fs::read(&path) else {
                log::debug!("skipping unreadable font file {}", path.display());
                continue;
            };
            if let Some(font) = Font::new(Bytes::new(bytes), face.index) {
                fonts.push(font);
            }
        }
        log::debug!("loaded {} system font face(s)", fonts.len() - before);
    }

    if fonts.is_empty() {
        anyhow::bail!("no fonts could be loaded (embedded set and system fonts are empty)");
    }
    Ok(fonts)
}

impl typst::World for TypstWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main
    }

    fn source(&self, id: FileId) -> FileResult<TypstSource> {
        if id == self.main {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(PathBuf::from("<memory>")))
        }
    }

    fn file(&self, _id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(PathBuf::from("<memory>")))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        None
    }
}
