//! Annotated byte-range records.
//!
//! Every decoded structure that can be shown to a user implements
//! [`Translation`]: a lazily enumerated, indexable sequence of
//! [`TranslationItem`]s, each describing one range of bytes in the original
//! file. Enumeration is grouped into sections of items. Some producers use one
//! item per section, others a single section holding every item; consumers
//! can ignore the grouping and use the flat accessors instead.

use std::borrow::Cow;
use std::ops::Range;

/// A decoded, human readable description of one byte range of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationItem {
    source_range: Range<u64>,
    description: Cow<'static, str>,
    explanation: String,
    extra_description: Option<Cow<'static, str>>,
    extra_explanation: Option<String>,
    has_divider: bool,
}

impl TranslationItem {
    /// Create an item with a label and the display form of its value.
    pub fn new(
        source_range: Range<u64>,
        description: impl Into<Cow<'static, str>>,
        explanation: impl Into<String>,
    ) -> Self {
        TranslationItem {
            source_range,
            description: description.into(),
            explanation: explanation.into(),
            extra_description: None,
            extra_explanation: None,
            has_divider: false,
        }
    }

    /// Attach a secondary label and value, such as a resolved symbol name.
    pub fn with_extra(
        mut self,
        description: impl Into<Cow<'static, str>>,
        explanation: impl Into<String>,
    ) -> Self {
        self.extra_description = Some(description.into());
        self.extra_explanation = Some(explanation.into());
        self
    }

    /// Mark the item as the last of a visual group.
    pub fn with_divider(mut self) -> Self {
        self.has_divider = true;
        self
    }

    /// The absolute byte range of the input that this item describes.
    #[inline]
    pub fn source_range(&self) -> Range<u64> {
        self.source_range.clone()
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[inline]
    pub fn extra_description(&self) -> Option<&str> {
        self.extra_description.as_deref()
    }

    #[inline]
    pub fn extra_explanation(&self) -> Option<&str> {
        self.extra_explanation.as_deref()
    }

    #[inline]
    pub fn has_divider(&self) -> bool {
        self.has_divider
    }
}

/// The position of an item within a sectioned translation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    #[inline]
    pub fn new(section: usize, item: usize) -> Self {
        IndexPath { section, item }
    }
}

/// A lazily enumerated sequence of translation items.
///
/// Implementations must be pure: items may be requested repeatedly and in
/// any order, and each request returns the same item.
pub trait Translation {
    /// The number of sections.
    fn section_count(&self) -> usize;

    /// The number of items in `section`, or 0 if there is no such section.
    fn item_count(&self, section: usize) -> usize;

    /// The item at `path`, or `None` if the path is out of bounds.
    fn item(&self, path: IndexPath) -> Option<TranslationItem>;

    /// The total number of items across all sections.
    fn total_item_count(&self) -> usize {
        (0..self.section_count())
            .map(|section| self.item_count(section))
            .sum()
    }

    /// The item at a flat index across all sections.
    fn item_at(&self, mut index: usize) -> Option<TranslationItem> {
        for section in 0..self.section_count() {
            let count = self.item_count(section);
            if index < count {
                return self.item(IndexPath::new(section, index));
            }
            index -= count;
        }
        None
    }

    /// Iterate over every item in order.
    fn items(&self) -> TranslationItems<'_, Self>
    where
        Self: Sized,
    {
        TranslationItems::new(self)
    }
}

/// An iterator over the items of a [`Translation`].
#[derive(Debug)]
pub struct TranslationItems<'a, T: ?Sized> {
    translation: &'a T,
    path: IndexPath,
}

impl<'a, T: Translation + ?Sized> TranslationItems<'a, T> {
    /// Iterate over the items of any translation, including trait objects.
    pub fn new(translation: &'a T) -> Self {
        TranslationItems {
            translation,
            path: IndexPath::default(),
        }
    }
}

impl<'a, T: Translation + ?Sized> Iterator for TranslationItems<'a, T> {
    type Item = TranslationItem;

    fn next(&mut self) -> Option<TranslationItem> {
        while self.path.section < self.translation.section_count() {
            if self.path.item < self.translation.item_count(self.path.section) {
                let item = self.translation.item(self.path);
                self.path.item += 1;
                return item;
            }
            self.path.section += 1;
            self.path.item = 0;
        }
        None
    }
}

/// Format a value the way translation items display raw numbers.
pub fn hex<T: Into<u64>>(value: T) -> String {
    format!("0x{:X}", value.into())
}
