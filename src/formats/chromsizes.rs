//! Chromosome sizes table
//!
//! Tab-separated `name<TAB>length` rows; row order defines the order of the
//! absolute coordinate space. Blank lines and `#` comments are skipped, and
//! extra columns are ignored.

use crate::core::io::{fetch_text, Resource};
use crate::core::{ChromSizesError, GenomeIndex};
use memchr::memchr;

/// Parse a chromosome sizes table into `(name, length)` pairs
pub fn parse_chrom_sizes(text: &str) -> Result<Vec<(String, u64)>, ChromSizesError> {
    let mut entries = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = i + 1;

        let (name, rest) = match memchr(b'\t', line.as_bytes()) {
            Some(tab) => (&line[..tab], &line[tab + 1..]),
            None => {
                // Some tables are space separated
                let mut fields = line.splitn(2, char::is_whitespace);
                match (fields.next(), fields.next()) {
                    (Some(name), Some(rest)) => (name, rest),
                    _ => {
                        return Err(ChromSizesError::InvalidLine {
                            line: line_no,
                            message: "expected name and length".to_string(),
                        })
                    }
                }
            }
        };

        let length_field = rest.split('\t').next().unwrap_or("").trim();
        let length = length_field
            .parse::<u64>()
            .map_err(|_| ChromSizesError::InvalidLine {
                line: line_no,
                message: format!("invalid length '{}'", length_field),
            })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ChromSizesError::InvalidLine {
                line: line_no,
                message: "empty chromosome name".to_string(),
            });
        }
        entries.push((name.to_string(), length));
    }

    Ok(entries)
}

/// Parse a table and build the coordinate index
pub fn parse_genome_index(text: &str) -> Result<GenomeIndex, ChromSizesError> {
    GenomeIndex::new(parse_chrom_sizes(text)?)
}

/// Fetch, parse and index a chromosome sizes resource
pub async fn load_genome_index(
    client: &reqwest::Client,
    resource: &Resource,
) -> Result<GenomeIndex, ChromSizesError> {
    let text = fetch_text(client, resource).await?;
    let index = parse_genome_index(&text)?;
    log::info!(
        "Loaded {} chromosomes ({} bp) from {}",
        index.len(),
        index.total_length(),
        resource
    );
    Ok(index)
}
