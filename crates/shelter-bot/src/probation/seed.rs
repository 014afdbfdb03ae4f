use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::domain::{Owner, OwnerId, Report, ReportId, Species};

/// Owners and reports loaded into an in-memory store at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelterSeed {
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl ShelterSeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<Rd: Read>(reader: Rd) -> Result<Self, SeedError> {
        let seed: ShelterSeed = serde_json::from_reader(reader)?;
        seed.validate()?;
        Ok(seed)
    }

    fn validate(&self) -> Result<(), SeedError> {
        let mut owners: HashSet<(Species, OwnerId)> = HashSet::new();
        for owner in &self.owners {
            if !owners.insert((owner.species, owner.id)) {
                return Err(SeedError::DuplicateOwner {
                    species: owner.species,
                    id: owner.id,
                });
            }
        }

        let mut reported: HashSet<(Species, OwnerId)> = HashSet::new();
        for report in &self.reports {
            let key = (report.species, report.owner_id);
            if !owners.contains(&key) {
                return Err(SeedError::UnknownOwner {
                    report_id: report.id,
                    species: report.species,
                    owner_id: report.owner_id,
                });
            }
            if !reported.insert(key) {
                return Err(SeedError::DuplicateReport {
                    species: report.species,
                    owner_id: report.owner_id,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("seed file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{species} owner {id} appears more than once")]
    DuplicateOwner { species: Species, id: OwnerId },
    #[error("report {} references unknown {species} owner {owner_id}", .report_id.0)]
    UnknownOwner {
        report_id: ReportId,
        species: Species,
        owner_id: OwnerId,
    },
    #[error("{species} owner {owner_id} has more than one report row")]
    DuplicateReport { species: Species, owner_id: OwnerId },
}
