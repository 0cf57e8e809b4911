//! Segmentation of a compiled document into display units.
//!
//! - [`split_chapters`] cuts the source at `---` lines
//! - [`split_slides`] cuts rendered HTML at `<hr>`
//! - [`paginate`] lays chapters out on fixed-capacity pages
//!
//! Footnotes are extracted once per document and redistributed into every
//! unit with [`apply_footnotes`].
pub mod chapter;
pub mod footnote;
pub mod pagination;
pub mod slide;

pub use self::{
  chapter::{ChapterSource, chapter_title, split_chapters},
  footnote::{
    FootnoteMap,
    FootnotedUnit,
    apply_footnotes,
    extract_footnote_definitions,
  },
  pagination::{LineMeasure, Measure, Page, Pagination, Parity, paginate},
  slide::split_slides,
};
