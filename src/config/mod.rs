//! Post-processor properties
//!
//! Properties are fixed for the duration of a run: built from defaults or a
//! JSON file once at startup, then handed to the post by value.

use serde::{Deserialize, Serialize};

/// Machine/output properties for the Fanuc laser post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProperties {
    /// Emit ( ... ) comments for operations and notes
    pub write_comments: bool,

    /// Prefix every block with an N word
    pub show_sequence_numbers: bool,
    pub sequence_number_start: u32,
    pub sequence_number_increment: u32,

    /// Separate words with spaces; off packs the block tight
    pub separate_words: bool,

    /// Emit F words on cutting moves
    pub use_feed: bool,

    /// Pierce macro M-code for through cutting
    pub through_mode_code: u32,

    /// Pierce macro M-code for etching; 0 = not configured
    pub etch_mode_code: u32,

    /// Pierce macro M-code for vaporizing; 0 = not configured
    pub vaporize_mode_code: u32,

    /// Maximum chord deviation when an arc has to be replaced by line
    /// segments
    pub linearize_tolerance: f64,
}

impl Default for PostProperties {
    fn default() -> Self {
        Self {
            write_comments: true,
            show_sequence_numbers: true,
            sequence_number_start: 10,
            sequence_number_increment: 5,
            separate_words: true,
            use_feed: true,
            through_mode_code: 60,
            etch_mode_code: 0,
            vaporize_mode_code: 0,
            linearize_tolerance: 0.01,
        }
    }
}

impl PostProperties {
    /// Load properties from a JSON file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let properties: PostProperties = serde_json::from_str(&content)?;
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let props = PostProperties::default();

        assert!(props.show_sequence_numbers);
        assert_eq!(props.sequence_number_start, 10);
        assert_eq!(props.sequence_number_increment, 5);
        assert_eq!(props.through_mode_code, 60);
        assert_eq!(props.etch_mode_code, 0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "show_sequence_numbers": false,
            "separate_words": false,
            "etch_mode_code": 61
        }"#;

        let props: PostProperties = serde_json::from_str(json).unwrap();

        assert!(!props.show_sequence_numbers);
        assert!(!props.separate_words);
        assert_eq!(props.etch_mode_code, 61);
        // Untouched fields keep their defaults
        assert!(props.use_feed);
        assert_eq!(props.through_mode_code, 60);
    }
}
