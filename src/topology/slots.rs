use std::fmt;
use std::str::FromStr;

use crate::constants::CLUSTER_SLOT_COUNT;
use crate::constants::MAX_SLOT;
use crate::Error;
use crate::ProtocolError;
use crate::Result;
use crate::TopologyError;

/// Inclusive range of hash slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotRange {
    pub start: u16,
    pub end: u16,
}

impl SlotRange {
    pub fn new(
        start: u16,
        end: u16,
    ) -> Result<Self> {
        if start > end || end > MAX_SLOT {
            return Err(TopologyError::SlotCoverage(format!(
                "invalid slot range {start}-{end}"
            ))
            .into());
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Never true: a range holds at least one slot.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn slots(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl fmt::Display for SlotRange {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parses the node table notation: `5461-10922` or a single slot `42`.
impl FromStr for SlotRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            v.parse::<u16>()
                .map_err(|_| ProtocolError::Malformed(format!("invalid slot entry {s:?}")))
        };
        match s.split_once('-') {
            Some((start, end)) => SlotRange::new(parse(start)?, parse(end)?),
            None => {
                let slot = parse(s)?;
                SlotRange::new(slot, slot)
            }
        }
    }
}

/// Splits the slot space into `masters` contiguous ranges. The first
/// `16384 % masters` ranges hold one extra slot.
pub fn partition_slots(masters: usize) -> Result<Vec<SlotRange>> {
    let total = CLUSTER_SLOT_COUNT as usize;
    if masters == 0 || masters > total {
        return Err(TopologyError::SlotCoverage(format!(
            "cannot split {total} slots across {masters} masters"
        ))
        .into());
    }

    let base = total / masters;
    let extra = total % masters;
    let mut ranges = Vec::with_capacity(masters);
    let mut start = 0usize;
    for i in 0..masters {
        let len = base + usize::from(i < extra);
        let end = start + len - 1;
        ranges.push(SlotRange::new(start as u16, end as u16)?);
        start = end + 1;
    }

    check_full_coverage(&ranges)?;
    Ok(ranges)
}

/// Every slot owned exactly once: no gap, no overlap, full space.
pub fn check_full_coverage(ranges: &[SlotRange]) -> Result<()> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    let mut next = 0u32;
    for range in &sorted {
        let start = range.start as u32;
        if start > next {
            return Err(TopologyError::SlotCoverage(format!(
                "slots {next}-{} are not assigned",
                start - 1
            ))
            .into());
        }
        if start < next {
            return Err(TopologyError::SlotCoverage(format!(
                "slot range {range} overlaps a previous range"
            ))
            .into());
        }
        next = range.end as u32 + 1;
    }

    if next != CLUSTER_SLOT_COUNT {
        return Err(TopologyError::SlotCoverage(format!(
            "slots {next}-{MAX_SLOT} are not assigned"
        ))
        .into());
    }
    Ok(())
}
