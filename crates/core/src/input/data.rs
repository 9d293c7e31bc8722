use serde::{Deserialize, Serialize};

use super::sequence::{IntoSegments, SegmentSequence};
use crate::error::InputError;

/// Name under which the unconsumed suffix is always addressable.
pub const HEAD: &str = "head";

/// Request input split into named leading partitions and the remaining `head`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData {
    partitions: Vec<SegmentSequence>,
    head: SegmentSequence,
}

impl RequestData {
    /// Parses raw input with no partitions.
    pub fn parse(raw: &str) -> Self {
        Self {
            partitions: Vec::new(),
            head: SegmentSequence::parse(raw).named(HEAD),
        }
    }

    /// The unconsumed suffix.
    pub fn head(&self) -> &SegmentSequence {
        &self.head
    }

    /// Partitions in capture order.
    pub fn partitions(&self) -> &[SegmentSequence] {
        &self.partitions
    }

    /// Look up a partition by name; `"head"` returns the head.
    pub fn get(&self, name: &str) -> Option<&SegmentSequence> {
        if name == HEAD {
            return Some(&self.head);
        }
        self.partitions
            .iter()
            .find(|partition| partition.name() == Some(name))
    }

    /// Remove a literal prefix from the head and record it as a partition.
    pub fn partition(
        &mut self,
        prefix: impl IntoSegments,
        name: Option<&str>,
    ) -> Result<&SegmentSequence, InputError> {
        let prefix = SegmentSequence::from_segments(prefix.into_segments());
        if !self.head.starts_with(&prefix) {
            return Err(InputError::NotAPrefix {
                prefix: prefix.as_raw(),
                head: self.head.as_raw(),
            });
        }
        self.partition_len(prefix.len(), name)
    }

    /// Remove the first `len` head segments and record them as a partition.
    pub fn partition_len(
        &mut self,
        len: usize,
        name: Option<&str>,
    ) -> Result<&SegmentSequence, InputError> {
        if let Some(name) = name.filter(|name| *name == HEAD) {
            return Err(InputError::ReservedName(name.to_string()));
        }
        if len > self.head.len() {
            return Err(InputError::OutOfRange {
                requested: len,
                available: self.head.len(),
            });
        }

        let mut chunk = SegmentSequence::from_segments(self.head.drain_front(len));
        chunk.set_name(name.map(str::to_string));
        self.partitions.push(chunk);
        Ok(&self.partitions[self.partitions.len() - 1])
    }

    /// Every segment, partitions first, in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.partitions
            .iter()
            .chain(std::iter::once(&self.head))
            .flat_map(|chunk| chunk.iter())
    }

    /// The whole input as one sequence.
    pub fn to_sequence(&self) -> SegmentSequence {
        SegmentSequence::from_segments(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_by_prefix_and_length() {
        let mut data = RequestData::parse(r#"123*4*3*"my input"*00"#);
        let service = data.partition("123", Some("service_code")).unwrap();
        assert!(service.equals("123"));
        data.partition_len(1, Some("initial_code")).unwrap();

        assert!(data.get("initial_code").unwrap().equals("4"));
        assert!(data.head().equals(["3", "my input", "00"]));
        assert_eq!(data.get(HEAD), Some(data.head()));
        assert!(data.get("missing").is_none());
    }

    #[test]
    fn rejects_non_prefix_and_reserved_names() {
        let mut data = RequestData::parse("123*4");
        assert!(matches!(
            data.partition("4", None),
            Err(InputError::NotAPrefix { .. })
        ));
        assert_eq!(
            data.partition_len(1, Some("head")).unwrap_err(),
            InputError::ReservedName("head".into())
        );
        assert_eq!(
            data.partition_len(3, None).unwrap_err(),
            InputError::OutOfRange {
                requested: 3,
                available: 2
            }
        );
        assert!(data.head().equals("123*4"));
    }

    #[test]
    fn partitions_plus_head_reproduce_input() {
        for raw in ["123*4*3*00", r#"1*"a*b"*c"#, "", "9"] {
            let original = SegmentSequence::parse(raw);
            for len in 0..=original.len() {
                let mut data = RequestData::parse(raw);
                let prefix = data.partition_len(len, Some("prefix")).unwrap().clone();
                let mut rebuilt: Vec<String> = prefix.segments().to_vec();
                rebuilt.extend(data.head().segments().iter().cloned());
                assert!(original.equals(rebuilt), "{raw:?} split at {len}");
                assert_eq!(data.to_sequence(), original);
            }
        }
    }
}
