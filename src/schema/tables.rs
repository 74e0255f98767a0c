//! The six healthcare input tables and their declared columns

use std::fmt;

use super::{ColumnKind, ColumnSpec, TableSchema};

/// Identifies one of the input tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableId {
    DataDictionary,
    Encounters,
    Organizations,
    Patients,
    Payers,
    Procedures,
}

impl TableId {
    /// All tables in load order
    pub const ALL: [Self; 6] = [
        Self::DataDictionary,
        Self::Encounters,
        Self::Organizations,
        Self::Patients,
        Self::Payers,
        Self::Procedures,
    ];

    /// CSV file name inside the data directory
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::DataDictionary => "data_dictionary.csv",
            Self::Encounters => "encounters.csv",
            Self::Organizations => "organizations.csv",
            Self::Patients => "patients.csv",
            Self::Payers => "payers.csv",
            Self::Procedures => "procedures.csv",
        }
    }

    /// Human readable name used in summaries
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::DataDictionary => "Data Dictionary",
            Self::Encounters => "Encounters",
            Self::Organizations => "Organizations",
            Self::Patients => "Patients",
            Self::Payers => "Payers",
            Self::Procedures => "Procedures",
        }
    }

    /// Artifact name of the raw table inside the pipeline
    #[must_use]
    pub const fn artifact(self) -> &'static str {
        match self {
            Self::DataDictionary => "data_dictionary",
            Self::Encounters => "encounters",
            Self::Organizations => "organizations",
            Self::Patients => "patients",
            Self::Payers => "payers",
            Self::Procedures => "procedures",
        }
    }

    /// Declared schema of the table
    #[must_use]
    pub fn schema(self) -> TableSchema {
        use ColumnKind::{Date, Float, Text, Timestamp};

        let columns = match self {
            Self::DataDictionary => Vec::new(),
            Self::Encounters => vec![
                ColumnSpec::required("Id", Text),
                ColumnSpec::required("PATIENT", Text),
                ColumnSpec::required("START", Timestamp),
                ColumnSpec::required("STOP", Timestamp),
                ColumnSpec::required("ENCOUNTERCLASS", Text),
                ColumnSpec::required("REASONDESCRIPTION", Text),
                ColumnSpec::optional("ORGANIZATION", Text),
                ColumnSpec::optional("PAYER", Text),
                ColumnSpec::optional("PAYER_COVERAGE", Float),
            ],
            Self::Organizations | Self::Payers => vec![ColumnSpec::required("Id", Text)],
            Self::Patients => vec![
                ColumnSpec::required("Id", Text),
                ColumnSpec::required("BIRTHDATE", Date),
                ColumnSpec::optional("DEATHDATE", Date),
                ColumnSpec::required("GENDER", Text),
                ColumnSpec::required("RACE", Text),
                ColumnSpec::required("ETHNICITY", Text),
                ColumnSpec::required("CITY", Text),
                ColumnSpec::optional("MARITAL", Text),
            ],
            Self::Procedures => vec![
                ColumnSpec::required("ENCOUNTER", Text),
                ColumnSpec::optional("PATIENT", Text),
                ColumnSpec::optional("START", Timestamp),
                ColumnSpec::optional("STOP", Timestamp),
                ColumnSpec::optional("PAYER_COVERAGE", Float),
            ],
        };

        TableSchema {
            table: self,
            columns,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
