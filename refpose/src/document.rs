use std::fmt;

use crate::pose::landmark::Sequence;

/// Which kind of movement the reference footage shows. Carried through
/// verbatim so consumers can pick which joints to weigh.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Punching,
    Kicking,
    Full,
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Focus::Punching => write!(f, "punching"),
            Focus::Kicking => write!(f, "kicking"),
            Focus::Full => write!(f, "full"),
        }
    }
}

/// The file the whole tool exists to produce. One pose sequence when a single
/// video went in, a list of them when a directory did. The two shapes are
/// told apart by their one top level key.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ReferenceDoc {
    Single { sequence: Sequence, focus: Focus },
    Dataset { sequences: Vec<Sequence>, focus: Focus },
}

impl ReferenceDoc {
    pub fn single(sequence: Sequence, focus: Focus) -> Self {
        Self::Single { sequence, focus }
    }

    pub fn dataset(sequences: Vec<Sequence>, focus: Focus) -> Self {
        Self::Dataset { sequences, focus }
    }

    pub fn focus(&self) -> Focus {
        match self {
            Self::Single { focus, .. } | Self::Dataset { focus, .. } => *focus,
        }
    }
}

/// Compact on one line, these files easily reach a few megabytes.
pub fn save_to(writer: impl std::io::Write, doc: &ReferenceDoc) -> serde_json::Result<()> {
    serde_json::to_writer(writer, doc)
}

pub fn read_from(reader: impl std::io::Read) -> serde_json::Result<ReferenceDoc> {
    serde_json::from_reader(reader)
}
