//! Statistics from the story store
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::storage::Storage;
use crate::PipelineError;

/// Store statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Total number of stored stories
    pub total_stories: u64,

    /// Story count per genre, largest first
    pub stories_by_genre: Vec<(String, u64)>,
}

impl StoreStatistics {
    /// Number of distinct non-empty genres
    pub fn genre_count(&self) -> usize {
        self.stories_by_genre.len()
    }

    /// Stories without a genre
    pub fn ungenred(&self) -> u64 {
        let with_genre: u64 = self.stories_by_genre.iter().map(|(_, n)| n).sum();
        self.total_stories.saturating_sub(with_genre)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(PipelineError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, PipelineError> {
    Ok(StoreStatistics {
        total_stories: storage.count_stories()?,
        stories_by_genre: storage.genre_counts()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total stories: {}", stats.total_stories);
    println!("  Genres: {}", stats.genre_count());
    if stats.ungenred() > 0 {
        println!("  Without genre: {}", stats.ungenred());
    }
    println!();

    if !stats.stories_by_genre.is_empty() {
        println!("Stories by Genre:");
        for (genre, count) in &stats.stories_by_genre {
            let percentage = if stats.total_stories > 0 {
                (*count as f64 / stats.total_stories as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", genre, count, percentage);
        }
    }
}
