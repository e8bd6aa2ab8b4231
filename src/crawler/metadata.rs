//! Metadata extracted from a crawled page

/// Number of `<h1>`..`<h6>` elements on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadingCounts {
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub h5: u32,
    pub h6: u32,
}

impl HeadingCounts {
    /// Increments the counter for a heading level (1..=6)
    ///
    /// Levels outside that range are ignored.
    pub fn increment(&mut self, level: u8) {
        match level {
            1 => self.h1 += 1,
            2 => self.h2 += 1,
            3 => self.h3 += 1,
            4 => self.h4 += 1,
            5 => self.h5 += 1,
            6 => self.h6 += 1,
            _ => {}
        }
    }

    /// Counts in level order, h1 first
    pub fn as_array(&self) -> [u32; 6] {
        [self.h1, self.h2, self.h3, self.h4, self.h5, self.h6]
    }

    /// Builds counts from an array in level order, h1 first
    pub fn from_array(counts: [u32; 6]) -> Self {
        Self {
            h1: counts[0],
            h2: counts[1],
            h3: counts[2],
            h4: counts[3],
            h5: counts[4],
            h6: counts[5],
        }
    }

    pub fn total(&self) -> u32 {
        self.as_array().iter().sum()
    }
}

/// A sampled link whose liveness probe failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub url: String,
    /// HTTP status of the probe, or 0 when no connection could be made
    pub status_code: u16,
    pub text: String,
}

/// Everything the pipeline learns about a page
///
/// Attached to a job exactly once, when the job completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    /// Document order, duplicates kept
    pub internal_links: Vec<String>,
    /// Document order, duplicates kept
    pub external_links: Vec<String>,
    pub broken_links: Vec<BrokenLink>,
    pub has_login_form: bool,
}
