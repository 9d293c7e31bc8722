use std::{fmt, ops::Range};

use serde::{Deserialize, Serialize};

/// Separator between segments of a raw input string.
pub const DELIMITER: char = '*';

const QUOTE: char = '"';

/// An ordered, parsed sequence of input segments.
///
/// Equality only considers the segments, never the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentSequence {
    segments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl SegmentSequence {
    /// Parse a raw delimited string.
    ///
    /// A `*` only splits when an even number of `"` follow it, so quoted
    /// segments may contain the delimiter. Segments wrapped in quotes are
    /// unquoted once. An empty string yields a single empty segment.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: split_segments(raw),
            name: None,
        }
    }

    /// Build from already separated segments. Nothing is re-parsed.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            name: None,
        }
    }

    /// Names the sequence after a partition.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Partition name, if this sequence is one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// First segment, the usual menu choice.
    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    /// Iterates over the segments.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Segments handed to a screen as arguments.
    ///
    /// A lone empty segment (the parse of an empty string) means "no argument".
    pub fn args(&self) -> &[String] {
        match self.segments.as_slice() {
            [only] if only.is_empty() => &[],
            all => all,
        }
    }

    /// Join the segments back with the delimiter. Quotes are not restored.
    pub fn as_raw(&self) -> String {
        self.segments.join(&DELIMITER.to_string())
    }

    /// Segment-wise equality.
    pub fn equals(&self, other: impl IntoSegments) -> bool {
        self.segments == other.into_segments()
    }

    /// Whether `other` is a segment prefix.
    pub fn starts_with(&self, other: impl IntoSegments) -> bool {
        self.starts_with_in(other, None, None)
    }

    /// `starts_with` restricted to `self[start..end]` with Python-style bounds.
    pub fn starts_with_in(
        &self,
        other: impl IntoSegments,
        start: Option<isize>,
        end: Option<isize>,
    ) -> bool {
        let other = other.into_segments();
        let target = &self.segments[slice_range(self.len(), start, end)];
        target.len() >= other.len() && target[..other.len()] == other[..]
    }

    /// Whether `other` is a segment suffix.
    pub fn ends_with(&self, other: impl IntoSegments) -> bool {
        self.ends_with_in(other, None, None)
    }

    /// `ends_with` restricted to `self[start..end]` with Python-style bounds.
    pub fn ends_with_in(
        &self,
        other: impl IntoSegments,
        start: Option<isize>,
        end: Option<isize>,
    ) -> bool {
        let other = other.into_segments();
        let target = &self.segments[slice_range(self.len(), start, end)];
        target.len() >= other.len() && target[target.len() - other.len()..] == other[..]
    }

    /// Substring test on the joined representations.
    pub fn contains(&self, other: impl IntoSegments) -> bool {
        let needle = other.into_segments().join(&DELIMITER.to_string());
        self.as_raw().contains(&needle)
    }

    pub(crate) fn drain_front(&mut self, len: usize) -> Vec<String> {
        self.segments.drain(..len).collect()
    }
}

impl PartialEq for SegmentSequence {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for SegmentSequence {}

impl fmt::Display for SegmentSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_raw())
    }
}

impl From<&str> for SegmentSequence {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Anything comparable against a [`SegmentSequence`].
///
/// Strings are parsed with the same rules as [`SegmentSequence::parse`];
/// lists are taken verbatim.
pub trait IntoSegments {
    /// Converts into owned segments.
    fn into_segments(self) -> Vec<String>;
}

impl IntoSegments for &str {
    fn into_segments(self) -> Vec<String> {
        split_segments(self)
    }
}

impl IntoSegments for &String {
    fn into_segments(self) -> Vec<String> {
        split_segments(self)
    }
}

impl IntoSegments for String {
    fn into_segments(self) -> Vec<String> {
        split_segments(&self)
    }
}

impl IntoSegments for &SegmentSequence {
    fn into_segments(self) -> Vec<String> {
        self.segments.clone()
    }
}

impl IntoSegments for SegmentSequence {
    fn into_segments(self) -> Vec<String> {
        self.segments
    }
}

impl IntoSegments for Vec<String> {
    fn into_segments(self) -> Vec<String> {
        self
    }
}

impl IntoSegments for Vec<&str> {
    fn into_segments(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoSegments for &[String] {
    fn into_segments(self) -> Vec<String> {
        self.to_vec()
    }
}

impl IntoSegments for &[&str] {
    fn into_segments(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoSegments for [&str; N] {
    fn into_segments(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

fn split_segments(raw: &str) -> Vec<String> {
    let total_quotes = raw.chars().filter(|ch| *ch == QUOTE).count();
    let mut seen_quotes = 0;
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in raw.chars() {
        if ch == QUOTE {
            seen_quotes += 1;
            current.push(ch);
        } else if ch == DELIMITER && (total_quotes - seen_quotes) % 2 == 0 {
            segments.push(unquote(std::mem::take(&mut current)));
        } else {
            current.push(ch);
        }
    }
    segments.push(unquote(current));
    segments
}

fn unquote(segment: String) -> String {
    if segment.len() >= 2 && segment.starts_with(QUOTE) && segment.ends_with(QUOTE) {
        segment[1..segment.len() - 1].to_string()
    } else {
        segment
    }
}

fn slice_range(len: usize, start: Option<isize>, end: Option<isize>) -> Range<usize> {
    let clamp = |index: isize| -> usize {
        if index < 0 {
            len.saturating_sub(index.unsigned_abs())
        } else {
            (index as usize).min(len)
        }
    };
    let start = start.map(clamp).unwrap_or(0);
    let end = end.map(clamp).unwrap_or(len);
    start..end.max(start)
}
