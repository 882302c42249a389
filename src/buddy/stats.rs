//! Statistics and debugging for buddy allocator
//!
//! Provides the per-order free block report, statistics tracking and
//! failure reporting.

use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "tracking")]
use crate::MAX_ORDER_LIMIT;

/// Free block count per order, lowest order first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    entries: Vec<(usize, usize)>,
}

impl DumpReport {
    pub(crate) fn new(entries: Vec<(usize, usize)>) -> Self {
        Self { entries }
    }

    /// `(order, free_block_count)` pairs
    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    /// Free block count at `order`, zero for orders outside the report
    pub fn count(&self, order: usize) -> usize {
        self.entries
            .iter()
            .find(|(o, _)| *o == order)
            .map_or(0, |(_, count)| *count)
    }

    /// Total free bytes described by the report
    pub fn free_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(order, count)| count << order)
            .sum()
    }
}

/// Renders `<count>:<size>K` per order, e.g. `0:4K 1:8K ... 1:1024K`.
impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (order, count)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}K", count, (1usize << order) / 1024)?;
        }
        Ok(())
    }
}

/// Buddy system statistics
#[cfg(feature = "tracking")]
#[derive(Debug, Clone, Copy)]
pub struct BuddyStats {
    pub total_pages: usize,
    pub free_pages: usize,
    pub used_pages: usize,
    pub free_blocks_by_order: [usize; MAX_ORDER_LIMIT + 1],
}

#[cfg(feature = "tracking")]
impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tracking")]
impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_pages: 0,
            free_pages: 0,
            used_pages: 0,
            free_blocks_by_order: [0; MAX_ORDER_LIMIT + 1],
        }
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(
        min_order: usize,
        report: &DumpReport,
        request_size: usize,
        request_order: usize,
    ) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!(
            "Request: {} bytes (order {}, {} KB block)",
            request_size,
            request_order,
            (1usize << request_order) / 1024
        );
        error!(
            "  Free: {} KB in {} pages",
            report.free_bytes() / 1024,
            report.free_bytes() >> min_order
        );
        error!("  Free blocks by order:");
        for &(order, count) in report.entries().iter().rev() {
            if count > 0 {
                let block_size = 1usize << order;
                error!(
                    "    Order {}: {} blocks ({} KB each, {} KB total)",
                    order,
                    count,
                    block_size / 1024,
                    (count * block_size) / 1024
                );
            }
        }
        error!("========================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;

    #[test]
    fn test_report_display_matches_classic_dump() {
        let report = DumpReport::new(vec![(12, 0), (13, 1), (14, 2), (20, 1)]);
        assert_eq!(format!("{}", report), "0:4K 1:8K 2:16K 1:1024K");
    }

    #[test]
    fn test_report_counts() {
        let report = DumpReport::new(vec![(12, 3), (13, 1)]);
        assert_eq!(report.count(12), 3);
        assert_eq!(report.count(13), 1);
        assert_eq!(report.count(19), 0);
        assert_eq!(report.free_bytes(), 3 * 0x1000 + 0x2000);
    }
}
