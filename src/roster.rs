//! Member roster: `name,url` pairs scraped from a member directory site.
//!
//! Only the output file is consumed here. Later rows overwrite earlier
//! ones for the same name.

use crate::error::{Error, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Roster {
    urls: HashMap<String, String>,
}

impl Roster {
    pub fn url_of(&self, name: &str) -> Option<&str> {
        self.urls.get(name.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Load a roster CSV with `name` and `url` headers
pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Roster> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let roster = read_roster(file)?;
    info!(path = %path.display(), members = roster.len(), "Loaded member roster");
    Ok(roster)
}

pub fn read_roster<R: Read>(reader: R) -> Result<Roster> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let find = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::MissingColumn(wanted.to_string()))
    };
    let name_idx = find("name")?;
    let url_idx = find("url")?;

    let mut urls = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or("").trim();
        let url = record.get(url_idx).unwrap_or("").trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        urls.insert(name.to_string(), url.to_string());
    }

    Ok(Roster { urls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_roster_with_bom() {
        let csv = "\u{feff}name,url\n김철수,https://assembly101.kr/member/1\n이영희,\n";
        let roster = read_roster(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(
            roster.url_of(" 김철수 "),
            Some("https://assembly101.kr/member/1")
        );
        assert_eq!(roster.url_of("이영희"), None);
    }

    #[test]
    fn test_missing_url_column() {
        let err = read_roster("name,link\na,b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "url"));
    }
}
